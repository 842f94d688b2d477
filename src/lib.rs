// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod policy;
pub mod reply;
pub mod session;

use std::sync::Arc;

pub use crate::api::{router, AppState};
pub use crate::classify::{Classification, Classifier};
pub use crate::config::{HoneypotConfig, PatternTables};
pub use crate::engine::{EngagementOutcome, HoneypotEngine, InboundMessage};
pub use crate::error::HoneypotError;
pub use crate::extract::{Category, Extractor, Intelligence};
pub use crate::logging::anon_hash;
pub use crate::policy::EngagementPolicy;
pub use crate::session::{InMemorySessionStore, Session, SessionStore};

/// Engine + state wired from configuration, with pattern tables from
/// `HONEYPOT_PATTERNS_PATH` or the embedded defaults.
pub fn build_state(cfg: &HoneypotConfig) -> anyhow::Result<AppState> {
    let tables = PatternTables::from_env()?;
    let engine = HoneypotEngine::from_config(cfg, &tables)?;
    tracing::info!(
        target: "honeypot",
        patterns_version = tables.version,
        min_turns = cfg.min_turns,
        replies = engine.replier_name(),
        "honeypot engine ready"
    );
    Ok(AppState::new(Arc::new(engine), cfg.api_key.as_str()))
}
