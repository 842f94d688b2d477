// src/config/mod.rs
//! Runtime configuration from environment variables (a `.env` file is loaded
//! by `main` via dotenvy in local/dev).

pub mod patterns;

use std::time::Duration;

pub use patterns::PatternTables;

pub const DEFAULT_API_KEY: &str = "TEST_API_KEY";
pub const DEFAULT_CALLBACK_URL: &str = "https://hackathon.guvi.in/api/updateHoneyPotFinalResult";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";
pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone)]
pub struct HoneypotConfig {
    /// Expected `x-api-key` header value.
    pub api_key: String,
    /// Final-report endpoint. Empty disables notification.
    pub callback_url: String,
    pub callback_timeout: Duration,
    pub notify_workers: usize,
    pub notify_queue: usize,
    /// Minimum inbound turns before a session may be finalized.
    pub min_turns: u32,
    pub max_message_chars: usize,
    /// Idle sessions older than this are evicted. `None` keeps them forever.
    pub session_ttl: Option<Duration>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub reply_timeout: Duration,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            callback_timeout: Duration::from_secs(2),
            notify_workers: 3,
            notify_queue: 64,
            min_turns: 3,
            max_message_chars: MAX_MESSAGE_CHARS,
            session_ttl: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            reply_timeout: Duration::from_secs(8),
        }
    }
}

impl HoneypotConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_key: env_string("API_KEY").unwrap_or(d.api_key),
            callback_url: std::env::var("CALLBACK_URL")
                .map(|s| s.trim().to_string())
                .unwrap_or(d.callback_url),
            // Clamp to the 1..3s band; the callback must never hold a worker for long.
            callback_timeout: env_parse::<u64>("CALLBACK_TIMEOUT_MS")
                .map(|ms| Duration::from_millis(ms.clamp(1_000, 3_000)))
                .unwrap_or(d.callback_timeout),
            notify_workers: env_parse::<usize>("NOTIFY_WORKERS")
                .map(|n| n.clamp(1, 16))
                .unwrap_or(d.notify_workers),
            notify_queue: env_parse::<usize>("NOTIFY_QUEUE")
                .map(|n| n.max(1))
                .unwrap_or(d.notify_queue),
            min_turns: env_parse::<u32>("MIN_TURNS_TO_FINALIZE")
                .map(|n| n.max(1))
                .unwrap_or(d.min_turns),
            max_message_chars: env_parse::<usize>("MAX_MESSAGE_CHARS")
                .map(|n| n.clamp(1, MAX_MESSAGE_CHARS))
                .unwrap_or(d.max_message_chars),
            session_ttl: env_parse::<u64>("SESSION_TTL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            llm_api_key: env_string("GROQ_API_KEY").or_else(|| env_string("LLM_API_KEY")),
            llm_base_url: env_string("LLM_BASE_URL").unwrap_or(d.llm_base_url),
            llm_model: env_string("LLM_MODEL").unwrap_or(d.llm_model),
            reply_timeout: env_parse::<u64>("REPLY_TIMEOUT_SECS")
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or(d.reply_timeout),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_and_clamps() {
        std::env::set_var("CALLBACK_TIMEOUT_MS", "60000");
        std::env::set_var("NOTIFY_WORKERS", "0");
        std::env::set_var("SESSION_TTL_SECS", "0");
        std::env::set_var("API_KEY", "  secret  ");

        let cfg = HoneypotConfig::from_env();
        assert_eq!(cfg.callback_timeout, Duration::from_secs(3));
        assert_eq!(cfg.notify_workers, 1);
        assert!(cfg.session_ttl.is_none());
        assert_eq!(cfg.api_key, "secret");

        for k in ["CALLBACK_TIMEOUT_MS", "NOTIFY_WORKERS", "SESSION_TTL_SECS", "API_KEY"] {
            std::env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        std::env::remove_var("MIN_TURNS_TO_FINALIZE");
        let cfg = HoneypotConfig::from_env();
        assert_eq!(cfg.min_turns, 3);
        assert_eq!(cfg.max_message_chars, MAX_MESSAGE_CHARS);
    }
}
