//! Hostname-based site detection.

use url::Url;

use crate::types::SiteType;

/// Ordered hostname patterns; first match wins. Subdomain patterns and
/// shortlink domains sit before their bare-domain counterparts so a
/// lookup never double-matches ambiguously.
const PATTERNS: &[(&str, SiteType)] = &[
    ("youtu.be", SiteType::Youtube),
    ("youtube.com", SiteType::Youtube),
    ("redd.it", SiteType::Reddit),
    ("reddit.com", SiteType::Reddit),
    ("vm.tiktok.com", SiteType::Tiktok),
    ("tiktok.com", SiteType::Tiktok),
    ("a.co", SiteType::Ecommerce),
    ("amzn.to", SiteType::Ecommerce),
    ("amazon.", SiteType::Ecommerce),
    ("x.com", SiteType::Twitter),
    ("twitter.com", SiteType::Twitter),
    ("t.co", SiteType::Twitter),
    ("pin.it", SiteType::Pinterest),
    ("pinterest.", SiteType::Pinterest),
    ("fb.me", SiteType::Facebook),
    ("fb.watch", SiteType::Facebook),
    ("facebook.com", SiteType::Facebook),
];

/// Map a URL's hostname to a [`SiteType`]; unrecognized hosts are
/// `Generic`.
pub fn detect(url: &Url) -> SiteType {
    let Some(host) = url.host_str() else {
        return SiteType::Generic;
    };
    let host = host.to_ascii_lowercase();

    for (pattern, site) in PATTERNS {
        if host_matches(&host, pattern) {
            return *site;
        }
    }
    SiteType::Generic
}

/// A pattern matches the host exactly or as a dot-separated suffix.
/// Patterns written with a trailing dot like `amazon.` match the brand
/// as a whole label followed by a TLD tail, covering every country
/// variant (amazon.com, amazon.co.uk) without catching lookalikes such
/// as amazon.evil.org.
fn host_matches(host: &str, pattern: &str) -> bool {
    if let Some(brand) = pattern.strip_suffix('.') {
        let labels: Vec<&str> = host.split('.').collect();
        return labels
            .iter()
            .enumerate()
            .any(|(i, label)| *label == brand && is_tld_tail(&labels[i + 1..]));
    }
    host == pattern || host.ends_with(&format!(".{pattern}"))
}

/// Whether the labels after a brand label look like a public suffix:
/// one or two short labels (`com`, `co.uk`, `com.br`).
fn is_tld_tail(labels: &[&str]) -> bool {
    matches!(labels.len(), 1 | 2) && labels.iter().all(|l| !l.is_empty() && l.len() <= 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect_str(url: &str) -> SiteType {
        detect(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_detects_video_platform() {
        assert_eq!(detect_str("https://www.youtube.com/watch?v=abc"), SiteType::Youtube);
        assert_eq!(detect_str("https://youtu.be/abc"), SiteType::Youtube);
        assert_eq!(detect_str("https://m.youtube.com/watch?v=abc"), SiteType::Youtube);
    }

    #[test]
    fn test_detects_forum_platform() {
        assert_eq!(detect_str("https://www.reddit.com/r/rust/comments/x"), SiteType::Reddit);
        assert_eq!(detect_str("https://old.reddit.com/r/rust"), SiteType::Reddit);
        assert_eq!(detect_str("https://redd.it/abc123"), SiteType::Reddit);
    }

    #[test]
    fn test_detects_short_video() {
        assert_eq!(detect_str("https://www.tiktok.com/@user/video/1"), SiteType::Tiktok);
        assert_eq!(detect_str("https://vm.tiktok.com/ZMabc/"), SiteType::Tiktok);
    }

    #[test]
    fn test_detects_ecommerce_tld_variants() {
        assert_eq!(detect_str("https://www.amazon.com/dp/B01"), SiteType::Ecommerce);
        assert_eq!(detect_str("https://www.amazon.co.uk/dp/B01"), SiteType::Ecommerce);
        assert_eq!(detect_str("https://a.co/d/abc"), SiteType::Ecommerce);
    }

    #[test]
    fn test_detects_social_platforms() {
        assert_eq!(detect_str("https://x.com/user/status/1"), SiteType::Twitter);
        assert_eq!(detect_str("https://pin.it/abc"), SiteType::Pinterest);
        assert_eq!(detect_str("https://www.pinterest.co.uk/pin/1/"), SiteType::Pinterest);
        assert_eq!(detect_str("https://fb.watch/xyz/"), SiteType::Facebook);
    }

    #[test]
    fn test_unknown_host_is_generic() {
        assert_eq!(detect_str("https://example.com/page"), SiteType::Generic);
        assert_eq!(detect_str("https://notyoutube.com.evil.org/"), SiteType::Generic);
    }

    #[test]
    fn test_lookalike_does_not_match() {
        // suffix matching requires a dot boundary
        assert_eq!(detect_str("https://myyoutube.com/"), SiteType::Generic);
        assert_eq!(detect_str("https://fakereddit.com/"), SiteType::Generic);
    }

    #[test]
    fn test_brand_label_under_foreign_domain_is_generic() {
        assert_eq!(detect_str("https://amazon.evil.org/"), SiteType::Generic);
        assert_eq!(detect_str("https://pinterest.attacker.example/"), SiteType::Generic);
        // real country variants keep matching
        assert_eq!(detect_str("https://www.amazon.com.br/dp/B01"), SiteType::Ecommerce);
        assert_eq!(detect_str("https://music.amazon.de/"), SiteType::Ecommerce);
    }
}
