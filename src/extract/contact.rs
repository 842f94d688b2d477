// src/extract/contact.rs
//! Contact identifiers: phone numbers, e-mail addresses, social handles.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;

// Explicit ASCII classes: `\d` in the regex crate also matches non-ASCII digits.
static PHONE_PLUS91: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+91[\s-]?[6-9][0-9]{9}\b").expect("phone +91 regex"));
static PHONE_91: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b91[6-9][0-9]{9}\b").expect("phone 91 regex"));
static PHONE_LOCAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[6-9][0-9]{9}\b").expect("phone local regex"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});

// `@handle` not glued to a preceding token (that would be an e-mail or UPI id).
static AT_HANDLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_.@-])(@[A-Za-z0-9_]{1,30})\b").expect("at-handle regex")
});
static TELEGRAM_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bt\.me/([A-Za-z0-9_]+)").expect("t.me regex"));

/// Indian mobile numbers, digits only. Ten digits starting 6-9, or an
/// 11/12 digit form carrying the country code.
/// A local match inside an accepted country-code match is the same number and
/// is not reported again.
pub fn phone_numbers(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut taken: Vec<Range<usize>> = Vec::new();
    for re in [&*PHONE_PLUS91, &*PHONE_91, &*PHONE_LOCAL] {
        for m in re.find_iter(text) {
            if taken.iter().any(|r| r.contains(&m.start())) {
                continue;
            }
            let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            if is_valid_phone(&digits) {
                taken.push(m.range());
                out.insert(digits);
            }
        }
    }
    out
}

pub fn is_valid_phone(digits: &str) -> bool {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match digits.len() {
        10 => is_mobile_shaped(digits),
        11 | 12 => true,
        _ => false,
    }
}

/// Ten digits starting 6-9. Used by the bank-account exclusion rule too.
pub fn is_mobile_shaped(digits: &str) -> bool {
    digits.len() == 10
        && digits.bytes().all(|b| b.is_ascii_digit())
        && matches!(digits.as_bytes()[0], b'6'..=b'9')
}

/// Lower-cased e-mail addresses minus anything already claimed as a payment handle.
pub fn email_addresses(text: &str, payment_handles: &BTreeSet<String>) -> BTreeSet<String> {
    EMAIL
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|e| !payment_handles.contains(e))
        .collect()
}

/// Compiled social-domain pattern (`instagram.com/<name>` and friends).
#[derive(Debug)]
pub struct SocialPatterns {
    profile_link: Option<Regex>,
}

impl SocialPatterns {
    pub fn new(domains: &[String]) -> anyhow::Result<Self> {
        if domains.is_empty() {
            return Ok(Self { profile_link: None });
        }
        let alt = domains
            .iter()
            .map(|d| regex::escape(d))
            .collect::<Vec<_>>()
            .join("|");
        let re = Regex::new(&format!(r"(?i)\b(?:{alt})\.com/([A-Za-z0-9._]+)"))
            .map_err(|e| anyhow::anyhow!("social domain regex error: {e}"))?;
        Ok(Self {
            profile_link: Some(re),
        })
    }

    pub fn handles(&self, text: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();

        for caps in AT_HANDLE.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                out.insert(m.as_str().to_string());
            }
        }

        let path_res = self.profile_link.iter().chain(std::iter::once(&*TELEGRAM_SHORT));
        for re in path_res {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    let name = m.as_str().trim_end_matches('.');
                    if !name.is_empty() {
                        out.insert(name.to_string());
                    }
                }
            }
        }
        out
    }
}
