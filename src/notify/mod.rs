// src/notify/mod.rs
//! Final-report notification: payload, notifier seam, and a bounded background
//! worker pool so delivery never sits on the request path.

pub mod callback;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::extract::{Category, Intelligence};
use crate::session::Session;

pub use callback::CallbackNotifier;

/// Body posted to the callback endpoint once a session is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub session_id: String,
    pub status: String,
    pub scam_detected: bool,
    pub scam_type: Option<String>,
    pub total_messages_exchanged: u32,
    pub extracted_intelligence: Intelligence,
    pub agent_notes: String,
}

impl FinalReport {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            status: if session.finalized { "finalized" } else { "in_progress" }.to_string(),
            scam_detected: session.is_scam,
            scam_type: session.scam_type.clone(),
            total_messages_exchanged: session.turns,
            extracted_intelligence: session.intelligence.clone(),
            agent_notes: summary_note(session),
        }
    }
}

fn summary_note(session: &Session) -> String {
    let evidence = Category::ALL
        .iter()
        .filter(|c| **c != Category::SuspiciousKeywords)
        .filter_map(|c| {
            let n = session.intelligence.get(*c).len();
            (n > 0).then(|| format!("{} {}", n, c.as_str()))
        })
        .collect::<Vec<_>>();
    let evidence = if evidence.is_empty() {
        "none".to_string()
    } else {
        evidence.join(", ")
    };
    format!(
        "Scam classified as {}. Score: {}. Turns: {}. Evidence: {}.",
        session.scam_type.as_deref().unwrap_or("unknown"),
        session.scam_score,
        session.turns,
        evidence
    )
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, report: &FinalReport) -> anyhow::Result<()>;
    fn name(&self) -> &'static str;
}

/// Handle to the notification workers. Cloning shares the same queue.
#[derive(Clone, Debug)]
pub struct NotifyQueue {
    tx: mpsc::Sender<FinalReport>,
}

impl NotifyQueue {
    /// Start `workers` tasks draining a queue of `capacity` reports. Must be
    /// called inside a Tokio runtime.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        workers: usize,
        capacity: usize,
        timeout: Duration,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel::<FinalReport>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let notifier = notifier.clone();
                tokio::spawn(async move {
                    loop {
                        let next = { rx.lock().await.recv().await };
                        let Some(report) = next else {
                            break;
                        };
                        deliver(notifier.as_ref(), &report, timeout, worker).await;
                    }
                })
            })
            .collect();

        (Self { tx }, handles)
    }

    /// Enqueue without waiting. A full or closed queue drops the report.
    pub fn submit(&self, report: FinalReport) -> bool {
        match self.tx.try_send(report) {
            Ok(()) => {
                counter!("honeypot_notify_submitted_total").increment(1);
                true
            }
            Err(mpsc::error::TrySendError::Full(r)) => {
                counter!("honeypot_notify_dropped_total").increment(1);
                tracing::warn!(target: "notify", session = %crate::anon_hash(&r.session_id), "notify queue full, report dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(r)) => {
                counter!("honeypot_notify_dropped_total").increment(1);
                tracing::warn!(target: "notify", session = %crate::anon_hash(&r.session_id), "notify queue closed, report dropped");
                false
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, report: &FinalReport, timeout: Duration, worker: usize) {
    let session = crate::anon_hash(&report.session_id);
    match tokio::time::timeout(timeout, notifier.send(report)).await {
        Ok(Ok(())) => {
            counter!("honeypot_notify_sent_total").increment(1);
            tracing::info!(target: "notify", %session, worker, notifier = notifier.name(), "final report delivered");
        }
        Ok(Err(e)) => {
            counter!("honeypot_notify_failures_total").increment(1);
            tracing::warn!(target: "notify", %session, worker, "final report failed: {e:#}");
        }
        Err(_) => {
            counter!("honeypot_notify_failures_total").increment(1);
            tracing::warn!(target: "notify", %session, worker, timeout_ms = timeout.as_millis() as u64, "final report timed out");
        }
    }
}
