// src/policy.rs
//! Engagement policy: when has a session produced enough evidence to report?
//!
//! Ready iff the session is flagged as a scam, has at least `min_turns`
//! inbound turns, has not been finalized yet, and holds at least one bank
//! account, UPI handle or phishing link.

use crate::session::Session;

pub const DEFAULT_MIN_TURNS: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct EngagementPolicy {
    pub min_turns: u32,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self {
            min_turns: DEFAULT_MIN_TURNS,
        }
    }
}

impl EngagementPolicy {
    pub fn new(min_turns: u32) -> Self {
        Self {
            min_turns: min_turns.max(1),
        }
    }

    pub fn ready_to_finalize(&self, session: &Session) -> bool {
        session.is_scam
            && session.turns >= self.min_turns
            && !session.finalized
            && session.intelligence.has_high_value()
    }

    /// Set the one-shot flag if ready. Returns true only for the call that flipped it.
    pub fn try_finalize(&self, session: &mut Session) -> bool {
        if !self.ready_to_finalize(session) {
            return false;
        }
        session.finalized = true;
        true
    }
}
