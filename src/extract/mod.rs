// src/extract/mod.rs
//! Entity extraction: one pure matcher per intelligence category.
//!
//! Every matcher is total over `&str` (empty or garbage input yields empty
//! sets) and deterministic, so re-extracting the same text always produces the
//! same `Intelligence`.
//!
//! Cross-category rules applied here:
//! - e-mails never repeat a value accepted as a UPI handle;
//! - bank accounts never repeat a value accepted as a phone number.

pub mod contact;
pub mod financial;
pub mod keywords;
pub mod network;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::PatternTables;
use contact::SocialPatterns;
use network::LinkPatterns;

/// The fixed set of intelligence categories. `as_str` gives the wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    BankAccounts,
    UpiIds,
    PhishingLinks,
    PhoneNumbers,
    SuspiciousKeywords,
    EmailAddresses,
    CryptoWallets,
    SocialHandles,
    IpAddresses,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::BankAccounts,
        Category::UpiIds,
        Category::PhishingLinks,
        Category::PhoneNumbers,
        Category::SuspiciousKeywords,
        Category::EmailAddresses,
        Category::CryptoWallets,
        Category::SocialHandles,
        Category::IpAddresses,
    ];

    /// Evidence that justifies finalizing a session.
    pub const HIGH_VALUE: [Category; 3] = [
        Category::BankAccounts,
        Category::UpiIds,
        Category::PhishingLinks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BankAccounts => "bankAccounts",
            Category::UpiIds => "upiIds",
            Category::PhishingLinks => "phishingLinks",
            Category::PhoneNumbers => "phoneNumbers",
            Category::SuspiciousKeywords => "suspiciousKeywords",
            Category::EmailAddresses => "emailAddresses",
            Category::CryptoWallets => "cryptoWallets",
            Category::SocialHandles => "socialHandles",
            Category::IpAddresses => "ipAddresses",
        }
    }
}

/// Extraction result / accumulated session intelligence: one ordered set per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intelligence {
    #[serde(default)]
    pub bank_accounts: BTreeSet<String>,
    #[serde(default)]
    pub upi_ids: BTreeSet<String>,
    #[serde(default)]
    pub phishing_links: BTreeSet<String>,
    #[serde(default)]
    pub phone_numbers: BTreeSet<String>,
    #[serde(default)]
    pub suspicious_keywords: BTreeSet<String>,
    #[serde(default)]
    pub email_addresses: BTreeSet<String>,
    #[serde(default)]
    pub crypto_wallets: BTreeSet<String>,
    #[serde(default)]
    pub social_handles: BTreeSet<String>,
    #[serde(default)]
    pub ip_addresses: BTreeSet<String>,
}

impl Intelligence {
    pub fn get(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::BankAccounts => &self.bank_accounts,
            Category::UpiIds => &self.upi_ids,
            Category::PhishingLinks => &self.phishing_links,
            Category::PhoneNumbers => &self.phone_numbers,
            Category::SuspiciousKeywords => &self.suspicious_keywords,
            Category::EmailAddresses => &self.email_addresses,
            Category::CryptoWallets => &self.crypto_wallets,
            Category::SocialHandles => &self.social_handles,
            Category::IpAddresses => &self.ip_addresses,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut BTreeSet<String> {
        match category {
            Category::BankAccounts => &mut self.bank_accounts,
            Category::UpiIds => &mut self.upi_ids,
            Category::PhishingLinks => &mut self.phishing_links,
            Category::PhoneNumbers => &mut self.phone_numbers,
            Category::SuspiciousKeywords => &mut self.suspicious_keywords,
            Category::EmailAddresses => &mut self.email_addresses,
            Category::CryptoWallets => &mut self.crypto_wallets,
            Category::SocialHandles => &mut self.social_handles,
            Category::IpAddresses => &mut self.ip_addresses,
        }
    }

    /// Set union per category. Never removes anything.
    pub fn merge(&mut self, other: &Intelligence) {
        for cat in Category::ALL {
            let dst = self.get_mut(cat);
            for v in other.get(cat) {
                if !dst.contains(v) {
                    dst.insert(v.clone());
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c).is_empty())
    }

    pub fn has_high_value(&self) -> bool {
        Category::HIGH_VALUE.iter().any(|c| !self.get(*c).is_empty())
    }

    /// True when every category of `self` contains the matching category of `other`.
    pub fn is_superset_of(&self, other: &Intelligence) -> bool {
        Category::ALL
            .iter()
            .all(|c| self.get(*c).is_superset(other.get(*c)))
    }

    pub fn total_items(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    /// Per-category item counts keyed by wire name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        Category::ALL
            .iter()
            .map(|c| (c.as_str(), self.get(*c).len()))
            .collect()
    }
}

/// Runs every category matcher. Immutable after construction; share it freely.
#[derive(Debug)]
pub struct Extractor {
    upi_providers: HashSet<String>,
    links: LinkPatterns,
    social: SocialPatterns,
    vocabulary: Vec<String>,
}

impl Extractor {
    pub fn new(tables: &PatternTables) -> anyhow::Result<Self> {
        Ok(Self {
            upi_providers: tables.extract.upi_providers.iter().cloned().collect(),
            links: LinkPatterns::new(&tables.extract.url_tlds)?,
            social: SocialPatterns::new(&tables.extract.social_domains)?,
            vocabulary: tables.keyword_vocabulary(),
        })
    }

    pub fn extract(&self, text: &str) -> Intelligence {
        let phone_numbers = contact::phone_numbers(text);
        let upi_ids = financial::upi_ids(text, &self.upi_providers);
        let email_addresses = contact::email_addresses(text, &upi_ids);

        let mut bank_accounts = financial::bank_accounts(text);
        bank_accounts.retain(|v| !phone_numbers.contains(v));

        Intelligence {
            bank_accounts,
            upi_ids,
            phishing_links: self.links.phishing_links(text),
            phone_numbers,
            suspicious_keywords: keywords::suspicious_keywords(text, &self.vocabulary),
            email_addresses,
            crypto_wallets: financial::crypto_wallets(text),
            social_handles: self.social.handles(text),
            ip_addresses: network::ip_addresses(text),
        }
    }

    /// Extract over the current message followed by prior conversation texts.
    /// Result sets do not depend on the order of `prior`.
    pub fn extract_conversation<'a, I>(&self, current: &str, prior: I) -> Intelligence
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut full = String::from(current);
        for t in prior {
            if t.is_empty() {
                continue;
            }
            // Newline keeps word boundaries between messages.
            full.push('\n');
            full.push_str(t);
        }
        self.extract(&full)
    }
}
