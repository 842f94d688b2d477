// src/engine.rs
//! # Honeypot Engine
//! One inbound turn end to end: validate, classify, extract over the whole
//! conversation, fold into the session, decide finalization, enqueue the final
//! report, then produce a decoy reply.
//!
//! The session lock covers only the synchronous part (extraction, merge,
//! finalize flag). Notification and reply generation happen after it is
//! released, so a slow model or callback never blocks other turns.

use anyhow::Context;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{Classification, Classifier};
use crate::config::{HoneypotConfig, PatternTables};
use crate::error::HoneypotError;
use crate::extract::{Extractor, Intelligence};
use crate::logging::anon_hash;
use crate::notify::{CallbackNotifier, FinalReport, NotifyQueue};
use crate::policy::EngagementPolicy;
use crate::reply::{build_replier, ReplyContext, ReplyGenerator, ScriptedReplies};
use crate::session::store::{self, SessionSlot};
use crate::session::{InMemorySessionStore, Session, SessionStore, TranscriptEntry};

pub const MAX_SESSION_ID_CHARS: usize = 256;

/// Request body of `POST /honeypot/message`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default, alias = "session_id")]
    pub session_id: String,
    #[serde(default)]
    pub message: TranscriptEntry,
    #[serde(default, alias = "conversation_history")]
    pub conversation_history: Vec<TranscriptEntry>,
    /// Channel/language/locale hints. Accepted, not interpreted.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl InboundMessage {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: TranscriptEntry::inbound(text),
            ..Self::default()
        }
    }

    pub fn with_history<I, S>(mut self, history: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conversation_history = history.into_iter().map(TranscriptEntry::inbound).collect();
        self
    }

    pub fn validate(&self, max_chars: usize) -> Result<(), HoneypotError> {
        let id = self.session_id.trim();
        if id.is_empty() {
            return Err(HoneypotError::MissingSessionId);
        }
        if id.chars().count() > MAX_SESSION_ID_CHARS {
            return Err(HoneypotError::SessionIdTooLong {
                max: MAX_SESSION_ID_CHARS,
            });
        }
        if self.message.text.trim().is_empty() {
            return Err(HoneypotError::EmptyMessage);
        }
        let len = self.message.text.chars().count();
        if len > max_chars {
            return Err(HoneypotError::MessageTooLong { len, max: max_chars });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub total_messages_exchanged: u32,
    pub finalized: bool,
}

/// Response body of `POST /honeypot/message`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementOutcome {
    pub status: &'static str,
    pub reply: String,
    pub scam_detected: bool,
    pub scam_score: u8,
    pub scam_type: Option<String>,
    pub extracted_intelligence: Intelligence,
    pub engagement_metrics: EngagementMetrics,
}

impl EngagementOutcome {
    /// Something went wrong internally; stay in character anyway.
    pub fn decoy() -> Self {
        Self {
            status: "success",
            reply: ScriptedReplies::line(1).to_string(),
            scam_detected: false,
            scam_score: 0,
            scam_type: None,
            extracted_intelligence: Intelligence::default(),
            engagement_metrics: EngagementMetrics {
                total_messages_exchanged: 0,
                finalized: false,
            },
        }
    }
}

/// Aggregate view for `/analytics`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_sessions: usize,
    pub scam_sessions: usize,
    pub finalized_sessions: usize,
    pub total_messages: u64,
    pub scam_types: std::collections::BTreeMap<String, usize>,
    pub intelligence_counts: std::collections::BTreeMap<&'static str, usize>,
}

/// Result of the locked part of a turn.
struct TurnStep {
    verdict: Classification,
    intelligence: Intelligence,
    turns: u32,
    finalized: bool,
    report: Option<FinalReport>,
}

pub struct HoneypotEngine {
    extractor: Arc<Extractor>,
    classifier: Arc<Classifier>,
    policy: EngagementPolicy,
    store: Arc<dyn SessionStore>,
    notify: Option<NotifyQueue>,
    replier: Arc<dyn ReplyGenerator>,
    max_message_chars: usize,
    reply_timeout: Duration,
}

impl HoneypotEngine {
    pub fn new(
        tables: &PatternTables,
        policy: EngagementPolicy,
        store: Arc<dyn SessionStore>,
        replier: Arc<dyn ReplyGenerator>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            extractor: Arc::new(Extractor::new(tables)?),
            classifier: Arc::new(Classifier::new(tables)),
            policy,
            store,
            notify: None,
            replier,
            max_message_chars: crate::config::MAX_MESSAGE_CHARS,
            reply_timeout: Duration::from_secs(8),
        })
    }

    /// Wire everything from configuration. Spawns notify workers, so call it
    /// inside a Tokio runtime.
    pub fn from_config(cfg: &HoneypotConfig, tables: &PatternTables) -> anyhow::Result<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let replier = build_replier(cfg)?;
        let mut engine = Self::new(tables, EngagementPolicy::new(cfg.min_turns), store, replier)?
            .with_limits(cfg.max_message_chars, cfg.reply_timeout);

        let callback = CallbackNotifier::new(&cfg.callback_url, cfg.callback_timeout)?;
        if callback.is_enabled() {
            let (queue, _workers) = NotifyQueue::spawn(
                Arc::new(callback),
                cfg.notify_workers,
                cfg.notify_queue,
                cfg.callback_timeout,
            );
            engine = engine.with_notifier(queue);
        } else {
            tracing::warn!(target: "honeypot", "CALLBACK_URL empty, final reports disabled");
        }
        Ok(engine)
    }

    pub fn with_notifier(mut self, queue: NotifyQueue) -> Self {
        self.notify = Some(queue);
        self
    }

    pub fn with_limits(mut self, max_message_chars: usize, reply_timeout: Duration) -> Self {
        self.max_message_chars = max_message_chars;
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn replier_name(&self) -> &'static str {
        self.replier.name()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub async fn process(&self, inbound: InboundMessage) -> Result<EngagementOutcome, HoneypotError> {
        if let Err(e) = inbound.validate(self.max_message_chars) {
            counter!("honeypot_rejected_total").increment(1);
            return Err(e);
        }
        counter!("honeypot_messages_total").increment(1);

        let session_id = inbound.session_id.trim().to_string();
        let text = inbound.message.text.clone();
        let sid = anon_hash(&session_id);

        // Held for the whole turn: the TTL sweeper skips slots in use, and the
        // reply lands in the same session the message did.
        let slot = self.store.get_or_create(&session_id);

        let step = {
            let extractor = self.extractor.clone();
            let classifier = self.classifier.clone();
            let policy = self.policy;
            let slot = slot.clone();
            tokio::task::spawn_blocking(move || {
                absorb_turn(&extractor, &classifier, policy, &slot, inbound)
            })
            .await
            .context("turn processing task")?
        };

        tracing::info!(
            target: "honeypot",
            session = %sid,
            text = %anon_hash(&text),
            turn = step.turns,
            scam = step.verdict.is_scam,
            score = step.verdict.scam_score,
            scam_type = step.verdict.scam_type.as_deref().unwrap_or("-"),
            items = step.intelligence.total_items(),
            "turn absorbed"
        );

        if let Some(report) = step.report {
            counter!("honeypot_sessions_finalized_total").increment(1);
            match &self.notify {
                Some(queue) => {
                    queue.submit(report);
                }
                None => {
                    tracing::info!(target: "honeypot", session = %sid, "session finalized (notifier disabled)");
                }
            }
        }

        let ctx = ReplyContext {
            message: text,
            turn: step.turns,
            scam_type: step.verdict.scam_type.clone(),
            intelligence: step.intelligence.clone(),
        };
        let reply = self.reply(&ctx, &sid).await;
        store::lock(&slot).record_reply(reply.clone());

        Ok(EngagementOutcome {
            status: "success",
            reply,
            scam_detected: step.verdict.is_scam,
            scam_score: step.verdict.scam_score,
            scam_type: step.verdict.scam_type,
            extracted_intelligence: step.intelligence,
            engagement_metrics: EngagementMetrics {
                total_messages_exchanged: step.turns,
                finalized: step.finalized,
            },
        })
    }

    /// Generator output, or the scripted line for this turn on error or timeout.
    async fn reply(&self, ctx: &ReplyContext, sid: &str) -> String {
        match tokio::time::timeout(self.reply_timeout, self.replier.generate(ctx)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                counter!("honeypot_reply_fallbacks_total").increment(1);
                tracing::warn!(target: "reply", session = %sid, generator = self.replier.name(), "reply failed, using script: {e:#}");
                ScriptedReplies::line(ctx.turn).to_string()
            }
            Err(_) => {
                counter!("honeypot_reply_fallbacks_total").increment(1);
                tracing::warn!(target: "reply", session = %sid, generator = self.replier.name(), "reply timed out, using script");
                ScriptedReplies::line(ctx.turn).to_string()
            }
        }
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.store.get(id.trim())
    }

    pub fn analytics(&self) -> Analytics {
        let mut out = Analytics::default();
        let mut intel = Intelligence::default();
        for s in self.store.snapshots() {
            out.total_sessions += 1;
            out.total_messages += u64::from(s.turns);
            if s.is_scam {
                out.scam_sessions += 1;
            }
            if s.finalized {
                out.finalized_sessions += 1;
            }
            if let Some(t) = &s.scam_type {
                *out.scam_types.entry(t.clone()).or_default() += 1;
            }
            intel.merge(&s.intelligence);
        }
        out.intelligence_counts = intel.counts();
        out
    }
}

fn absorb_turn(
    extractor: &Extractor,
    classifier: &Classifier,
    policy: EngagementPolicy,
    slot: &SessionSlot,
    inbound: InboundMessage,
) -> TurnStep {
    let fresh = classifier.classify(&inbound.message.text);
    if fresh.is_scam {
        counter!("honeypot_scam_messages_total").increment(1);
    }
    let history: Vec<&str> = inbound
        .conversation_history
        .iter()
        .filter(|e| !e.is_decoy())
        .map(|e| e.text.as_str())
        .collect();

    let mut session = store::lock(slot);
    {
        let prior: Vec<&str> = history
            .iter()
            .copied()
            .chain(session.inbound_texts())
            .collect();
        let extracted = extractor.extract_conversation(&inbound.message.text, prior);

        session.absorb(inbound.message.clone(), &fresh, &extracted);
    }
    let newly = policy.try_finalize(&mut session);

    TurnStep {
        verdict: session.classification(),
        intelligence: session.intelligence.clone(),
        turns: session.turns,
        finalized: session.finalized,
        report: newly.then(|| FinalReport::from_session(&session)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> HoneypotEngine {
        HoneypotEngine::new(
            &PatternTables::embedded(),
            EngagementPolicy::default(),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ScriptedReplies),
        )
        .unwrap()
    }

    #[test]
    fn validation_order_and_limits() {
        assert!(matches!(
            InboundMessage::new("  ", "hi").validate(10),
            Err(HoneypotError::MissingSessionId)
        ));
        assert!(matches!(
            InboundMessage::new("x".repeat(257), "hi").validate(10),
            Err(HoneypotError::SessionIdTooLong { .. })
        ));
        assert!(matches!(
            InboundMessage::new("s", " \n ").validate(10),
            Err(HoneypotError::EmptyMessage)
        ));
        assert!(matches!(
            InboundMessage::new("s", "x".repeat(11)).validate(10),
            Err(HoneypotError::MessageTooLong { len: 11, max: 10 })
        ));
        assert!(InboundMessage::new("s", "x".repeat(10)).validate(10).is_ok());
    }

    #[test]
    fn accepts_both_session_id_spellings() {
        let a: InboundMessage =
            serde_json::from_str(r#"{"sessionId":"a","message":{"text":"hi"}}"#).unwrap();
        let b: InboundMessage =
            serde_json::from_str(r#"{"session_id":"b","message":{"text":"hi"}}"#).unwrap();
        assert_eq!(a.session_id, "a");
        assert_eq!(b.session_id, "b");
    }

    #[tokio::test]
    async fn invalid_input_touches_no_state() {
        let e = engine();
        assert!(e.process(InboundMessage::new("s", "")).await.is_err());
        assert!(e.store().is_empty());
    }

    #[tokio::test]
    async fn reply_is_recorded_but_not_counted() {
        let e = engine();
        let out = e.process(InboundMessage::new("s1", "hello there")).await.unwrap();
        assert_eq!(out.engagement_metrics.total_messages_exchanged, 1);
        assert_eq!(out.reply, ScriptedReplies::line(1));
        let s = e.session("s1").unwrap();
        assert_eq!(s.transcript.len(), 2);
        assert!(s.transcript[1].is_decoy());
    }

    #[tokio::test]
    async fn decoy_lines_are_not_mined() {
        let e = engine();
        let msg = InboundMessage {
            conversation_history: vec![TranscriptEntry {
                sender: "user".into(),
                text: "my number is 9123456780".into(),
                timestamp: None,
            }],
            ..InboundMessage::new("s2", "ok")
        };
        let out = e.process(msg).await.unwrap();
        assert!(out.extracted_intelligence.phone_numbers.is_empty());
    }

    struct Stuck;

    #[async_trait::async_trait]
    impl ReplyGenerator for Stuck {
        async fn generate(&self, _ctx: &ReplyContext) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("never".into())
        }
        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    #[tokio::test]
    async fn slow_generator_falls_back_to_script() {
        let e = HoneypotEngine::new(
            &PatternTables::embedded(),
            EngagementPolicy::default(),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(Stuck),
        )
        .unwrap()
        .with_limits(5000, Duration::from_millis(50));
        let out = e.process(InboundMessage::new("s3", "hello")).await.unwrap();
        assert_eq!(out.reply, ScriptedReplies::line(1));
    }

    #[tokio::test]
    async fn analytics_totals() {
        let e = engine();
        e.process(InboundMessage::new("a", "Send money to fraud@ybl now, your account will be blocked"))
            .await
            .unwrap();
        e.process(InboundMessage::new("b", "hello")).await.unwrap();
        let a = e.analytics();
        assert_eq!(a.total_sessions, 2);
        assert_eq!(a.scam_sessions, 1);
        assert_eq!(a.total_messages, 2);
        assert_eq!(a.intelligence_counts["upiIds"], 1);
    }
}
