// src/config/patterns.rs
//! Versioned keyword/pattern tables (TOML).
//!
//! The default tables are embedded from `config/patterns.toml`. Set
//! `HONEYPOT_PATTERNS_PATH` to load a tuned copy instead. Only the table
//! *contents* live here; matching and merging logic stays in `extract` and
//! `classify`.

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATTERNS_PATH: &str = "HONEYPOT_PATTERNS_PATH";

const EMBEDDED_PATTERNS: &str = include_str!("../../config/patterns.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct PatternTables {
    #[serde(default)]
    pub version: u32,
    pub extract: ExtractTables,
    /// Theme → keywords. Themes are informational; extraction returns keywords.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    pub classifier: ClassifierTables,
    #[serde(default)]
    pub scam_types: Vec<ScamTypeCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractTables {
    #[serde(default)]
    pub upi_providers: Vec<String>,
    #[serde(default)]
    pub url_tlds: Vec<String>,
    #[serde(default)]
    pub social_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierTables {
    #[serde(default)]
    pub dominant_triggers: Vec<String>,
    #[serde(default)]
    pub intent_pairs: Vec<(String, String)>,
    #[serde(default)]
    pub urgency: Vec<String>,
    #[serde(default)]
    pub url_indicators: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScamTypeCfg {
    pub label: String,
    pub keywords: Vec<String>,
}

impl PatternTables {
    /// Tables compiled into the binary.
    pub fn embedded() -> Self {
        // The embedded file is covered by tests; a parse failure here is a build defect.
        Self::from_toml_str(EMBEDDED_PATTERNS).unwrap_or_else(|e| {
            panic!("embedded config/patterns.toml is invalid: {e:#}");
        })
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut tables: PatternTables = toml::from_str(s).context("parse pattern tables")?;
        tables.normalize();
        Ok(tables)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("read pattern tables at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// `HONEYPOT_PATTERNS_PATH` if set, embedded tables otherwise.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(ENV_PATTERNS_PATH) {
            Ok(p) if !p.trim().is_empty() => Self::load_from_file(PathBuf::from(p.trim())),
            _ => Ok(Self::embedded()),
        }
    }

    /// All keywords across themes, deduplicated.
    pub fn keyword_vocabulary(&self) -> Vec<String> {
        let mut all: Vec<String> = self.keywords.values().flatten().cloned().collect();
        all.sort();
        all.dedup();
        all
    }

    // Lower-case every entry so matchers can compare against lower-cased text.
    fn normalize(&mut self) {
        fn lower_all(v: &mut Vec<String>) {
            for s in v.iter_mut() {
                *s = s.trim().to_lowercase();
            }
            v.retain(|s| !s.is_empty());
        }

        lower_all(&mut self.extract.upi_providers);
        lower_all(&mut self.extract.url_tlds);
        lower_all(&mut self.extract.social_domains);
        for words in self.keywords.values_mut() {
            lower_all(words);
        }
        lower_all(&mut self.classifier.dominant_triggers);
        lower_all(&mut self.classifier.urgency);
        lower_all(&mut self.classifier.url_indicators);
        for (a, b) in self.classifier.intent_pairs.iter_mut() {
            *a = a.trim().to_lowercase();
            *b = b.trim().to_lowercase();
        }
        self.classifier
            .intent_pairs
            .retain(|(a, b)| !a.is_empty() && !b.is_empty());
        for st in self.scam_types.iter_mut() {
            st.label = st.label.trim().to_string();
            lower_all(&mut st.keywords);
        }
    }
}
