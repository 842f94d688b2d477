// src/session/mod.rs
//! Per-conversation state and its merge rules.
//!
//! Merge semantics on every inbound turn:
//! - `turns` += 1
//! - `is_scam` = OR across turns
//! - `scam_score` = running max
//! - `scam_type` = first non-null wins, never overwritten
//! - `intelligence` = per-category union (never shrinks)
//! - `transcript` = append-only
//!
//! Only `turns`, `scam_type` and the transcript are order-sensitive.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::extract::Intelligence;

pub use store::{InMemorySessionStore, SessionSlot, SessionStore};

pub const SENDER_SCAMMER: &str = "scammer";
pub const SENDER_AGENT: &str = "agent";

/// Client timestamps arrive either as epoch millis or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientTimestamp {
    Millis(i64),
    Text(String),
}

/// Sender labels the other side uses for our own replies in `conversationHistory`.
const DECOY_SENDERS: &[&str] = &[SENDER_AGENT, "user", "honeypot"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<ClientTimestamp>,
}

fn default_sender() -> String {
    SENDER_SCAMMER.to_string()
}

impl Default for TranscriptEntry {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            text: String::new(),
            timestamp: None,
        }
    }
}

impl TranscriptEntry {
    pub fn inbound(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_decoy(&self) -> bool {
        DECOY_SENDERS
            .iter()
            .any(|s| self.sender.eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub turns: u32,
    pub is_scam: bool,
    pub scam_score: u8,
    pub scam_type: Option<String>,
    pub intelligence: Intelligence,
    pub transcript: Vec<TranscriptEntry>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub finalized: bool,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: 0,
            is_scam: false,
            scam_score: 0,
            scam_type: None,
            intelligence: Intelligence::default(),
            transcript: Vec::new(),
            created_at: now,
            last_activity: now,
            finalized: false,
        }
    }

    /// Apply one inbound turn.
    pub fn absorb(
        &mut self,
        message: TranscriptEntry,
        fresh: &Classification,
        extracted: &Intelligence,
    ) {
        self.turns = self.turns.saturating_add(1);
        self.is_scam |= fresh.is_scam;
        self.scam_score = self.scam_score.max(fresh.scam_score);
        if self.scam_type.is_none() {
            self.scam_type = fresh.scam_type.clone();
        }
        self.intelligence.merge(extracted);
        self.transcript.push(message);
        self.last_activity = Utc::now();
    }

    /// Append a decoy reply. Does not count as a turn and is never scored.
    pub fn record_reply(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            sender: SENDER_AGENT.to_string(),
            text: text.into(),
            timestamp: None,
        });
        self.last_activity = Utc::now();
    }

    /// Texts of inbound messages so far (decoy replies excluded).
    pub fn inbound_texts(&self) -> impl Iterator<Item = &str> {
        self.transcript
            .iter()
            .filter(|e| !e.is_decoy())
            .map(|e| e.text.as_str())
    }

    /// Cumulative verdict as seen by callers.
    pub fn classification(&self) -> Classification {
        Classification {
            is_scam: self.is_scam,
            scam_score: self.scam_score,
            scam_type: self.scam_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(text: &str) -> TranscriptEntry {
        TranscriptEntry::inbound(text)
    }

    fn verdict(score: u8, ty: Option<&str>) -> Classification {
        Classification {
            is_scam: score >= 40,
            scam_score: score,
            scam_type: ty.map(str::to_string),
        }
    }

    #[test]
    fn score_is_running_max_and_flag_is_sticky() {
        let mut s = Session::new("s1");
        s.absorb(inbound("a"), &verdict(80, Some("otp_scam")), &Intelligence::default());
        s.absorb(inbound("b"), &verdict(10, None), &Intelligence::default());
        assert_eq!(s.turns, 2);
        assert!(s.is_scam);
        assert_eq!(s.scam_score, 80);
    }

    #[test]
    fn first_scam_type_wins() {
        let mut s = Session::new("s1");
        s.absorb(inbound("a"), &verdict(0, None), &Intelligence::default());
        s.absorb(inbound("b"), &verdict(90, Some("payment_scam")), &Intelligence::default());
        s.absorb(inbound("c"), &verdict(95, Some("phishing_scam")), &Intelligence::default());
        assert_eq!(s.scam_type.as_deref(), Some("payment_scam"));
    }

    #[test]
    fn replies_are_transcript_only() {
        let mut s = Session::new("s1");
        s.absorb(inbound("hi"), &verdict(0, None), &Intelligence::default());
        s.record_reply("who is this?");
        assert_eq!(s.turns, 1);
        assert_eq!(s.transcript.len(), 2);
        assert_eq!(s.inbound_texts().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn client_timestamp_forms() {
        let e: TranscriptEntry =
            serde_json::from_str(r#"{"sender":"scammer","text":"x","timestamp":1770005528731}"#)
                .unwrap();
        assert_eq!(e.timestamp, Some(ClientTimestamp::Millis(1770005528731)));
        let e: TranscriptEntry =
            serde_json::from_str(r#"{"sender":"scammer","text":"x","timestamp":"2026-01-21T10:15:30Z"}"#)
                .unwrap();
        assert!(matches!(e.timestamp, Some(ClientTimestamp::Text(_))));
    }

    #[test]
    fn sender_defaults_and_decoy_labels() {
        let e: TranscriptEntry = serde_json::from_str(r#"{"text":"x"}"#).unwrap();
        assert_eq!(e.sender, SENDER_SCAMMER);
        assert!(!e.is_decoy());
        let e: TranscriptEntry = serde_json::from_str(r#"{"sender":"User","text":"ok"}"#).unwrap();
        assert!(e.is_decoy());
    }
}
