// src/classify.rs
//! Single-message scam scoring.
//!
//! Score = max(0, dominant floor) + 25 per intent pair + 15 urgency (once)
//! + 20 URL indicator (once), clamped to 0..=100. A message is a scam iff the
//! score reaches 40. The scam type is the *first* configured category with any
//! keyword hit; table order is the tie-break, not hit counts.

use serde::{Deserialize, Serialize};

use crate::config::PatternTables;

pub const SCAM_THRESHOLD: u8 = 40;
pub const DOMINANT_FLOOR: u32 = 80;
pub const PAIR_WEIGHT: u32 = 25;
pub const URGENCY_WEIGHT: u32 = 15;
pub const URL_WEIGHT: u32 = 20;
pub const UNKNOWN_SCAM: &str = "unknown_scam";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_scam: bool,
    pub scam_score: u8,
    pub scam_type: Option<String>,
}

impl Classification {
    pub fn benign() -> Self {
        Self {
            is_scam: false,
            scam_score: 0,
            scam_type: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    dominant_triggers: Vec<String>,
    intent_pairs: Vec<(String, String)>,
    urgency: Vec<String>,
    url_indicators: Vec<String>,
    // ordered: first match wins
    scam_types: Vec<(String, Vec<String>)>,
}

impl Classifier {
    pub fn new(tables: &PatternTables) -> Self {
        let c = &tables.classifier;
        Self {
            dominant_triggers: c.dominant_triggers.clone(),
            intent_pairs: c.intent_pairs.clone(),
            urgency: c.urgency.clone(),
            url_indicators: c.url_indicators.clone(),
            scam_types: tables
                .scam_types
                .iter()
                .map(|s| (s.label.clone(), s.keywords.clone()))
                .collect(),
        }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return Classification::benign();
        }

        let score = self.raw_score(&lower).min(100) as u8;
        let is_scam = score >= SCAM_THRESHOLD;
        let scam_type = is_scam.then(|| self.scam_type(&lower));

        Classification {
            is_scam,
            scam_score: score,
            scam_type,
        }
    }

    /// Unclamped score for already lower-cased text.
    fn raw_score(&self, lower: &str) -> u32 {
        let mut score = 0u32;

        if any_present(lower, &self.dominant_triggers) {
            score = score.max(DOMINANT_FLOOR);
        }

        let pairs = self
            .intent_pairs
            .iter()
            .filter(|(a, b)| lower.contains(a.as_str()) && lower.contains(b.as_str()))
            .count() as u32;
        score += pairs * PAIR_WEIGHT;

        if any_present(lower, &self.urgency) {
            score += URGENCY_WEIGHT;
        }
        if any_present(lower, &self.url_indicators) {
            score += URL_WEIGHT;
        }
        score
    }

    fn scam_type(&self, lower: &str) -> String {
        self.scam_types
            .iter()
            .find(|(_, kws)| any_present(lower, kws))
            .map(|(label, _)| label.clone())
            .unwrap_or_else(|| UNKNOWN_SCAM.to_string())
    }
}

fn any_present(lower: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| lower.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clf() -> Classifier {
        Classifier::new(&PatternTables::embedded())
    }

    #[test]
    fn bank_block_threat_scores_high() {
        let r = clf().classify(
            "URGENT: Your SBI account 1234567890 will be blocked. Call 9876543210 immediately.",
        );
        assert!(r.is_scam);
        assert!(r.scam_score >= 80, "score {}", r.scam_score);
        assert!(r.scam_type.is_some());
    }

    #[test]
    fn payment_handle_is_payment_scam() {
        let r = clf().classify("Send payment to scammer@paytm to claim cashback!");
        assert!(r.is_scam);
        assert_eq!(r.scam_type.as_deref(), Some("payment_scam"));
    }

    #[test]
    fn pin_request_hits_dominant_floor() {
        for text in [
            "Tell me the PIN to unlock your card",
            "Enter pin now",
            "What is your 4 digit pin",
        ] {
            let r = clf().classify(text);
            assert!(r.is_scam, "{text}");
            assert!(r.scam_score >= 80, "{text}: score {}", r.scam_score);
        }
        // words that merely contain the letters stay quiet
        assert!(!clf().classify("Happy spinning class, see you tonight").is_scam);
    }

    #[test]
    fn greeting_is_benign() {
        let r = clf().classify("Hello, how are you doing today?");
        assert_eq!(r, Classification::benign());
    }

    #[test]
    fn first_category_wins_over_hit_count() {
        // three otp-ish hits, one payment hit: payment is checked first
        let r = clf().classify("Share the OTP, PIN and CVV to unlock your UPI");
        assert_eq!(r.scam_type.as_deref(), Some("payment_scam"));
    }

    #[test]
    fn pairs_stack_and_clamp() {
        let r = clf().classify(
            "Click here, click now: guaranteed returns and guaranteed profit, crypto investment, https://x.com/",
        );
        assert_eq!(r.scam_score, 100);
    }

    #[test]
    fn urgency_and_url_counted_once() {
        let tables = PatternTables::from_toml_str(
            r#"
[extract]
[classifier]
urgency = ["urgent", "hurry"]
url_indicators = ["http://", "www."]
"#,
        )
        .unwrap();
        let r = Classifier::new(&tables).classify("urgent hurry http://a www.b");
        assert_eq!(r.scam_score, 35);
        assert!(!r.is_scam);
        assert!(r.scam_type.is_none());
    }

    #[test]
    fn unknown_type_when_no_category_matches() {
        let tables = PatternTables::from_toml_str(
            r#"
[extract]
[classifier]
dominant_triggers = ["kyc"]
"#,
        )
        .unwrap();
        let r = Classifier::new(&tables).classify("complete kyc");
        assert_eq!(r.scam_score, 80);
        assert_eq!(r.scam_type.as_deref(), Some(UNKNOWN_SCAM));
    }

    #[test]
    fn threshold_consistency_over_samples() {
        let c = clf();
        let samples = [
            "",
            "hi",
            "bank verify",
            "click the link",
            "limited time offer expires",
            "my dear I love you so much, lonely soulmate",
            "your computer is infected with a virus, install anydesk",
            "https://www.example.com/",
        ];
        for s in samples {
            let r = c.classify(s);
            assert!(r.scam_score <= 100);
            assert_eq!(r.is_scam, r.scam_score >= SCAM_THRESHOLD, "{s}");
            assert_eq!(r.scam_type.is_some(), r.is_scam, "{s}");
        }
    }
}
