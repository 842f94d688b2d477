// src/extract/financial.rs
//! Financial identifiers: bank accounts / IFSC codes, UPI handles, crypto wallets.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use super::contact::is_mobile_shaped;

static UPI_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._-]+@[A-Za-z0-9._-]+\b").expect("upi regex"));

static ACCOUNT_LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:account|acct|acc|a/?c|no\.?)\s*(?:number|no\.?)?\s*[:#-]?\s*([0-9]{9,18})\b")
        .expect("labelled account regex")
});
static IFSC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z]{4}0[A-Z0-9]{6}\b").expect("ifsc regex"));
static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{9,18}\b").expect("digit run regex"));

static BTC_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b").expect("btc legacy regex")
});
static BTC_BECH32: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbc1[a-z0-9]{39,59}\b").expect("btc bech32 regex"));
static ETH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[a-fA-F0-9]{40}\b").expect("eth regex"));

/// `name@provider` handles whose provider is on the allow-list, lower-cased.
pub fn upi_ids(text: &str, providers: &HashSet<String>) -> BTreeSet<String> {
    UPI_SHAPE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|handle| {
            handle
                .rsplit_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && providers.contains(domain))
        })
        .collect()
}

/// Labelled account numbers, IFSC codes, and standalone 9-18 digit runs that
/// are not mobile-shaped. Deliberately permissive.
pub fn bank_accounts(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    for caps in ACCOUNT_LABELLED.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            out.insert(m.as_str().to_string());
        }
    }

    for m in IFSC.find_iter(text) {
        out.insert(m.as_str().to_ascii_uppercase());
    }

    for m in DIGIT_RUN.find_iter(text) {
        if !is_mobile_shaped(m.as_str()) {
            out.insert(m.as_str().to_string());
        }
    }

    out
}

pub fn crypto_wallets(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    // A run of digits alone is more likely a reference number than an address.
    for m in BTC_LEGACY.find_iter(text) {
        if m.as_str().bytes().any(|b| b.is_ascii_alphabetic()) {
            out.insert(m.as_str().to_string());
        }
    }
    for m in BTC_BECH32.find_iter(text) {
        out.insert(m.as_str().to_ascii_lowercase());
    }
    for m in ETH.find_iter(text) {
        out.insert(m.as_str().to_ascii_lowercase());
    }
    out
}
