// src/reply.rs
//! Decoy reply generation.
//!
//! The engine only sees `ReplyGenerator`. The LLM-backed generator talks to any
//! OpenAI-compatible chat-completions endpoint and rejects output that breaks
//! character; `ScriptedReplies` is the turn-indexed fallback used whenever the
//! model is unavailable, slow, or off-script.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HoneypotConfig;
use crate::extract::Intelligence;

pub const MIN_REPLY_WORDS: usize = 10;
pub const MAX_REPLY_WORDS: usize = 40;

const FORBIDDEN_PHRASES: &[&str] = &[
    "as an ai",
    "i'm an ai",
    "language model",
    "artificial intelligence",
    "i cannot",
    "i'm not able to",
    "i apologize for",
    "scammer",
    "honeypot",
    "intelligence gathering",
    "extracting information",
    "collecting data",
];

const ROBOTIC_PHRASES: &[&str] = &[
    "furthermore",
    "moreover",
    "in addition",
    "consequently",
    "nevertheless",
    "notwithstanding",
    "it is important to note",
];

const QUESTION_CUES: &[&str] = &[
    "?", "what", "how", "why", "when", "where", "who", "can", "could", "should", "would",
];

const SYSTEM_PROMPT: &str = "You are a regular person who just received a message from a stranger. \
You are not tech-savvy, cautious but persuadable, and you show real emotion (worry, excitement, confusion). \
Keep the other person talking. Ask exactly ONE natural follow-up question per reply that would make them \
reveal details such as a phone number, payment handle, account number, website, or email. \
Never say or hint that you are an AI or that you suspect anything. Use simple everyday English with \
contractions. Reply in 15 to 30 words and output only the reply.";

/// What the generator may look at when composing a reply.
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub message: String,
    /// 1-based inbound turn number within the session.
    pub turn: u32,
    pub scam_type: Option<String>,
    pub intelligence: Intelligence,
}

#[async_trait::async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, ctx: &ReplyContext) -> Result<String>;
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Scripted fallback
// ------------------------------------------------------------

const SCRIPTED_LINES: &[&str] = &[
    "I'm confused. Can you explain what's happening here?",
    "Wait, how can I verify this is real? Do you have proof?",
    "I'm not sure about this. What exactly do you need from me?",
    "Can you give me a number to call back? I want to confirm this first.",
    "Let me think about this. I'll need to check with someone first.",
];

/// Turn-indexed fallback lines. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedReplies;

impl ScriptedReplies {
    pub fn line(turn: u32) -> &'static str {
        let idx = (turn.max(1) as usize - 1).min(SCRIPTED_LINES.len() - 1);
        SCRIPTED_LINES[idx]
    }
}

#[async_trait::async_trait]
impl ReplyGenerator for ScriptedReplies {
    async fn generate(&self, ctx: &ReplyContext) -> Result<String> {
        Ok(Self::line(ctx.turn).to_string())
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ------------------------------------------------------------
// Chat-completions client
// ------------------------------------------------------------

pub struct ChatCompletionsReplier {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl ChatCompletionsReplier {
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("honeypot-intel/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("build chat-completions http client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait::async_trait]
impl ReplyGenerator for ChatCompletionsReplier {
    async fn generate(&self, ctx: &ReplyContext) -> Result<String> {
        let user = user_prompt(ctx);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: temperature_for(ctx.turn),
            max_tokens: 100,
            top_p: 0.9,
        };

        let resp: Resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("chat-completions post")?
            .error_for_status()
            .context("chat-completions non-2xx")?
            .json()
            .await
            .context("chat-completions body")?;

        let raw = resp
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        let reply = sanitize_reply(raw);
        if !is_acceptable(&reply) {
            bail!("model reply rejected ({} words)", word_count(&reply));
        }
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

/// More variety in later turns.
fn temperature_for(turn: u32) -> f32 {
    (0.75 + turn as f32 * 0.04).min(0.95)
}

fn turn_behaviour(turn: u32) -> &'static str {
    match turn {
        0 | 1 => "Show surprise or worry and ask what this is about.",
        2 => "Ask how you can verify this is real.",
        3 => "Sound willing but ask what exactly you need to do.",
        4 => "Ask for a number, email or office address to confirm.",
        _ => "Say you need to check with family or your bank, and ask how to reach them later.",
    }
}

fn user_prompt(ctx: &ReplyContext) -> String {
    let mut parts = vec![
        format!("TURN {}", ctx.turn.max(1)),
        turn_behaviour(ctx.turn).to_string(),
    ];
    if let Some(ty) = &ctx.scam_type {
        parts.push(format!("THEIR ANGLE: {}", ty.replace('_', " ")));
    }

    let intel = &ctx.intelligence;
    let known = [
        ("Phone", &intel.phone_numbers),
        ("UPI", &intel.upi_ids),
        ("Account", &intel.bank_accounts),
        ("Link", &intel.phishing_links),
        ("Email", &intel.email_addresses),
    ];
    let known: Vec<String> = known
        .iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(label, set)| {
            let sample: Vec<&str> = set.iter().take(2).map(String::as_str).collect();
            format!("{label}: {}", sample.join(", "))
        })
        .collect();
    if !known.is_empty() {
        parts.push("ALREADY SHARED BY THEM (ask for something else):".to_string());
        parts.extend(known);
    }

    parts.push(format!("\nTHEIR MESSAGE:\n\"{}\"", ctx.message));
    parts.push("\nYour reply:".to_string());
    parts.join("\n")
}

/// Strip wrapping quotes and collapse whitespace to single spaces.
pub fn sanitize_reply(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim()
        .to_string()
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// 10 to 40 words, in character, not stilted, and asks something unless long.
pub fn is_acceptable(reply: &str) -> bool {
    let words = word_count(reply);
    if !(MIN_REPLY_WORDS..=MAX_REPLY_WORDS).contains(&words) {
        return false;
    }
    let lower = reply.to_lowercase();
    if FORBIDDEN_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    if ROBOTIC_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    let asks = QUESTION_CUES.iter().any(|q| lower.contains(q));
    asks || words >= 20
}

/// LLM-backed generator when a key is configured, scripted lines otherwise.
pub fn build_replier(cfg: &HoneypotConfig) -> Result<Arc<dyn ReplyGenerator>> {
    match &cfg.llm_api_key {
        Some(key) => {
            let client =
                ChatCompletionsReplier::new(key, &cfg.llm_base_url, &cfg.llm_model, cfg.reply_timeout)?;
            tracing::info!(target: "reply", model = %cfg.llm_model, "LLM replies enabled");
            Ok(Arc::new(client))
        }
        None => {
            tracing::info!(target: "reply", "no LLM key, using scripted replies");
            Ok(Arc::new(ScriptedReplies))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_lines_follow_turns_and_saturate() {
        assert_eq!(ScriptedReplies::line(0), SCRIPTED_LINES[0]);
        assert_eq!(ScriptedReplies::line(1), SCRIPTED_LINES[0]);
        assert_eq!(ScriptedReplies::line(3), SCRIPTED_LINES[2]);
        assert_eq!(ScriptedReplies::line(99), SCRIPTED_LINES[4]);
    }

    #[test]
    fn sanitize_strips_quotes_and_newlines() {
        assert_eq!(
            sanitize_reply("  \"Wait,\n which   account?\"  "),
            "Wait, which account?"
        );
    }

    #[test]
    fn acceptance_rules() {
        assert!(is_acceptable(
            "Wait, which account is this about? I have two with SBI, can you tell me which one?"
        ));
        // too short
        assert!(!is_acceptable("Which account?"));
        // breaks character
        assert!(!is_acceptable(
            "As an AI I cannot help with this request but what do you need from me today?"
        ));
        assert!(!is_acceptable(
            "Furthermore, what is the process for verifying this account you mentioned earlier please?"
        ));
        let long = "word ".repeat(41);
        assert!(!is_acceptable(&long));
    }

    #[test]
    fn prompt_mentions_known_intel_and_turn() {
        let mut intel = Intelligence::default();
        intel.upi_ids.insert("fraud@ybl".into());
        let ctx = ReplyContext {
            message: "pay now".into(),
            turn: 4,
            scam_type: Some("payment_scam".into()),
            intelligence: intel,
        };
        let p = user_prompt(&ctx);
        assert!(p.contains("TURN 4"));
        assert!(p.contains("UPI: fraud@ybl"));
        assert!(p.contains("payment scam"));
        assert!(p.contains("\"pay now\""));
    }

    #[test]
    fn temperature_is_capped() {
        assert!((temperature_for(1) - 0.79).abs() < 1e-6);
        assert!((temperature_for(50) - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn scripted_generator_never_fails() {
        let ctx = ReplyContext {
            turn: 2,
            ..Default::default()
        };
        assert_eq!(ScriptedReplies.generate(&ctx).await.unwrap(), SCRIPTED_LINES[1]);
    }

    #[tokio::test]
    async fn unreachable_model_is_an_error() {
        let r = ChatCompletionsReplier::new(
            "k",
            "http://127.0.0.1:9/v1",
            "m",
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(r.generate(&ReplyContext::default()).await.is_err());
    }
}
