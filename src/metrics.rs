// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

use crate::session::SessionStore;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Only one recorder may exist per
    /// process, so this belongs in `main` (or a single dedicated test).
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("honeypot_messages_total", "Valid inbound messages processed");
        describe_counter!("honeypot_rejected_total", "Inbound messages rejected by validation");
        describe_counter!("honeypot_scam_messages_total", "Inbound messages classified as scam");
        describe_counter!("honeypot_sessions_finalized_total", "Sessions that reached finalization");
        describe_counter!("honeypot_reply_fallbacks_total", "Replies served from the script");
        describe_counter!("honeypot_notify_submitted_total", "Final reports queued");
        describe_counter!("honeypot_notify_dropped_total", "Final reports dropped on a full queue");
        describe_counter!("honeypot_notify_sent_total", "Final reports delivered");
        describe_counter!("honeypot_notify_failures_total", "Final report deliveries that failed");
        describe_gauge!("honeypot_sessions_active", "Sessions currently held in memory");

        Ok(Self { handle })
    }

    /// `/metrics` in Prometheus exposition format. The live session gauge is
    /// refreshed on every scrape.
    pub fn router(&self, store: Arc<dyn SessionStore>) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                let store = store.clone();
                async move {
                    gauge!("honeypot_sessions_active").set(store.len() as f64);
                    h.render()
                }
            }),
        )
    }
}
