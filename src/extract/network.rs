// src/extract/network.rs
//! Links and IPv4 addresses.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;

// `hxxp` is the usual defanged spelling; it is normalised back to `http`.
static SCHEME_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bh(?:tt|xx)ps?://[^\s<>"']+"#).expect("scheme url regex")
});
static WWW_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bwww\.[^\s<>"']+"#).expect("www url regex"));

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ipv4 regex")
});

const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Compiled link patterns. The bare `domain.tld/path` form depends on the TLD table.
#[derive(Debug)]
pub struct LinkPatterns {
    bare: Option<Regex>,
}

impl LinkPatterns {
    pub fn new(tlds: &[String]) -> anyhow::Result<Self> {
        if tlds.is_empty() {
            return Ok(Self { bare: None });
        }
        let alt = tlds
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let bare = Regex::new(&format!(
            r#"(?i)\b[a-z0-9][a-z0-9.-]*\.(?:{alt})/[^\s<>"']*"#
        ))
        .map_err(|e| anyhow::anyhow!("bare link regex error: {e}"))?;
        Ok(Self { bare: Some(bare) })
    }

    /// Scheme links first, then `www.` and bare-domain links that are not part
    /// of an already accepted match.
    pub fn phishing_links(&self, text: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut taken: Vec<Range<usize>> = Vec::new();

        let passes = [Some(&*SCHEME_URL), Some(&*WWW_URL), self.bare.as_ref()];
        for re in passes.into_iter().flatten() {
            for m in re.find_iter(text) {
                if taken.iter().any(|r| r.contains(&m.start())) {
                    continue;
                }
                taken.push(m.range());
                if let Some(link) = normalize_link(m.as_str()) {
                    out.insert(link);
                }
            }
        }
        out
    }
}

/// Lower-case scheme and host, keep the path verbatim, drop trailing sentence punctuation.
fn normalize_link(raw: &str) -> Option<String> {
    let trimmed = raw.trim_end_matches(TRAILING_PUNCT);
    if trimmed.is_empty() {
        return None;
    }

    let (scheme, rest) = match trimmed.find("://") {
        Some(idx) => {
            let scheme = trimmed[..idx].to_ascii_lowercase().replace("hxxp", "http");
            (Some(scheme), &trimmed[idx + 3..])
        }
        None => (None, trimmed),
    };
    if rest.is_empty() {
        return None;
    }

    let host_end = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (host, path) = rest.split_at(host_end);
    if host.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    if let Some(s) = scheme {
        out.push_str(&s);
        out.push_str("://");
    }
    out.push_str(&host.to_ascii_lowercase());
    out.push_str(path);
    Some(out)
}

/// Dotted quads whose octets all fall in 0..=255.
pub fn ip_addresses(text: &str) -> BTreeSet<String> {
    IPV4.find_iter(text)
        .map(|m| m.as_str())
        .filter(|ip| ip.split('.').all(|o| o.parse::<u16>().is_ok_and(|n| n <= 255)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> LinkPatterns {
        LinkPatterns::new(&["com".into(), "in".into(), "xyz".into()]).unwrap()
    }

    #[test]
    fn scheme_www_and_bare_forms() {
        let got = links().phishing_links(
            "Click HTTP://Fake-Amazon.com/Verify?id=1. Or www.SBI-kyc.in/update, also refund-now.xyz/claim",
        );
        let want: BTreeSet<String> = [
            "http://fake-amazon.com/Verify?id=1",
            "refund-now.xyz/claim",
            "www.sbi-kyc.in/update",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn no_duplicate_for_www_inside_scheme_link() {
        let got = links().phishing_links("go to https://www.evil.com/login now");
        assert_eq!(got.len(), 1);
        assert!(got.contains("https://www.evil.com/login"));
    }

    #[test]
    fn defanged_scheme_is_normalized() {
        let got = links().phishing_links("hxxps://bad.xyz/a");
        assert!(got.contains("https://bad.xyz/a"));
    }

    #[test]
    fn email_domains_are_not_links() {
        assert!(links().phishing_links("mail support@scam.com today").is_empty());
    }

    #[test]
    fn ipv4_octets_validated() {
        let got = ip_addresses("hosts 192.168.1.10, 10.0.0.256 and 8.8.8.8");
        let want: BTreeSet<String> = ["192.168.1.10", "8.8.8.8"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
    }
}
