//! Security utilities for input validation.
//!
//! This module provides URL validation with a domain whitelist (SSRF
//! protection) for the `/youtube` ingest endpoint.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::warn;
use url::Url;

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

/// Allowed video URL domains (whitelist for SSRF protection).
static ALLOWED_DOMAINS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "youtube.com",
        "www.youtube.com",
        "youtu.be",
        "m.youtube.com",
        "vimeo.com",
        "www.vimeo.com",
        "player.vimeo.com",
        "tiktok.com",
        "www.tiktok.com",
        "vm.tiktok.com",
        "twitter.com",
        "www.twitter.com",
        "x.com",
        "www.x.com",
        "twitch.tv",
        "www.twitch.tv",
        "clips.twitch.tv",
        "streamable.com",
        "www.streamable.com",
    ])
});

/// Hostname prefixes that are always rejected regardless of scheme: loopback,
/// private ranges, link-local, and cloud metadata endpoints.
const BLOCKED_HOST_PREFIXES: &[&str] = &[
    "127.", "10.", "192.168.", "169.254.", "localhost", "metadata.", "metadata.google.internal",
];

fn is_blocked_host(host: &str) -> bool {
    if host == "::1" || host.starts_with("fd") || host.starts_with("fe80") {
        return true;
    }
    if let Some(rest) = host.strip_prefix("172.") {
        if let Some(second) = rest.split('.').next().and_then(|s| s.parse::<u8>().ok()) {
            if (16..=31).contains(&second) {
                return true;
            }
        }
    }
    BLOCKED_HOST_PREFIXES.iter().any(|prefix| host.starts_with(prefix))
}

/// Result of URL validation.
#[derive(Debug)]
pub enum UrlValidationResult {
    Valid(String),
    Invalid(String),
    DomainNotAllowed(String),
    Blocked(String),
    TooLong,
}

impl UrlValidationResult {
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) => Err(msg),
            Self::DomainNotAllowed(domain) => {
                Err(format!("Domain '{}' is not allowed. Please use a supported video platform (YouTube, Vimeo, TikTok, etc.)", domain))
            }
            Self::Blocked(reason) => Err(reason),
            Self::TooLong => Err(format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)),
        }
    }
}

/// Validate a video URL for security and domain whitelist: length,
/// protocol, blocked hosts (internal IPs, metadata endpoints), then the
/// domain whitelist.
pub fn validate_video_url(url: &str) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    let domain = match parsed.host_str() {
        Some(d) => d.to_lowercase(),
        None => return UrlValidationResult::Invalid("URL must have a valid domain".to_string()),
    };

    if is_blocked_host(&domain) {
        warn!(url = %url, "Blocked URL pattern detected");
        return UrlValidationResult::Blocked("URL appears to target an internal or restricted endpoint".to_string());
    }

    if !is_domain_allowed(&domain) {
        return UrlValidationResult::DomainNotAllowed(domain);
    }

    UrlValidationResult::Valid(url.to_string())
}

/// Check if a domain or its parent domain is in the whitelist.
fn is_domain_allowed(domain: &str) -> bool {
    if ALLOWED_DOMAINS.contains(domain) {
        return true;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        let parent = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if ALLOWED_DOMAINS.contains(parent.as_str()) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_youtube_urls() {
        assert!(matches!(
            validate_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            UrlValidationResult::Valid(_)
        ));
        assert!(matches!(validate_video_url("https://youtu.be/dQw4w9WgXcQ"), UrlValidationResult::Valid(_)));
    }

    #[test]
    fn valid_vimeo_urls() {
        assert!(matches!(validate_video_url("https://vimeo.com/123456789"), UrlValidationResult::Valid(_)));
    }

    #[test]
    fn blocked_internal_hosts() {
        assert!(matches!(validate_video_url("http://127.0.0.1/video.mp4"), UrlValidationResult::Blocked(_)));
        assert!(matches!(validate_video_url("http://localhost/video.mp4"), UrlValidationResult::Blocked(_)));
        assert!(matches!(validate_video_url("http://192.168.1.1/video.mp4"), UrlValidationResult::Blocked(_)));
        assert!(matches!(
            validate_video_url("http://169.254.169.254/latest/meta-data/"),
            UrlValidationResult::Blocked(_)
        ));
        assert!(matches!(validate_video_url("http://172.16.0.1/video.mp4"), UrlValidationResult::Blocked(_)));
    }

    #[test]
    fn invalid_domains() {
        assert!(matches!(
            validate_video_url("https://malicious-site.com/video.mp4"),
            UrlValidationResult::DomainNotAllowed(_)
        ));
    }

    #[test]
    fn invalid_protocols() {
        assert!(matches!(validate_video_url("ftp://youtube.com/video"), UrlValidationResult::Invalid(_)));
        assert!(matches!(validate_video_url("javascript:alert(1)"), UrlValidationResult::Invalid(_)));
    }
}
