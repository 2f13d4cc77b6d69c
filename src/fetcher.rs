//! Home-page fetching.
//!
//! [`DocumentFetcher`] is the seam between the pipeline and the network.
//! [`HttpFetcher`] is the real implementation; tests substitute an
//! in-memory one.
//!
//! # Decoding
//!
//! Chinese news sites still serve GBK pages, often without a `charset`.
//! The body is decoded by the first step that applies:
//!
//! 1. a recognized charset in the `Content-Type` header, lossily
//! 2. UTF-8, lossily, when at most one in ten non-ASCII bytes is invalid
//! 3. each configured non-UTF-8 encoding in order, strictly
//! 4. whatever `chardetng` guesses, lossily
//!
//! Decoding never fails; only connection, timeout and HTTP status errors do.

use crate::error::{DigestError, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Source of raw home-page text.
pub trait DocumentFetcher {
    /// Fetch `url` and return its decoded body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    encodings: Vec<&'static Encoding>,
}

impl HttpFetcher {
    /// Build a fetcher. Unknown encoding labels are skipped.
    pub fn new(timeout: Duration, user_agent: &str, encodings: &[String]) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let encodings = encodings
            .iter()
            .filter_map(|label| {
                let resolved = Encoding::for_label(label.as_bytes());
                if resolved.is_none() {
                    debug!(%label, "Unknown encoding label; skipping");
                }
                resolved
            })
            .collect();
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            encodings,
        })
    }
}

impl DocumentFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::fetch(url, format!("HTTP status {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        let text = decode_body(&body, content_type.as_deref(), &self.encodings);
        info!(bytes = body.len(), chars = text.chars().count(), "Fetched page");
        Ok(text)
    }
}

/// Decode a response body following the order described in the module docs.
pub fn decode_body(body: &[u8], content_type: Option<&str>, fallbacks: &[&'static Encoding]) -> String {
    let declared = content_type
        .and_then(extract_charset)
        .and_then(|charset| Encoding::for_label(charset.as_bytes()));
    if let Some(encoding) = declared {
        let (text, used, had_errors) = encoding.decode(body);
        debug!(encoding = used.name(), had_errors, "Decoded body with declared charset");
        return text.into_owned();
    }

    if mostly_utf8(body) {
        return String::from_utf8_lossy(body).into_owned();
    }

    for encoding in fallbacks.iter().filter(|e| **e != UTF_8) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) {
            debug!(encoding = encoding.name(), "Decoded body with fallback encoding");
            return text.into_owned();
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    let guess = detector.guess(None, true);
    let (text, used, _) = guess.decode(body);
    debug!(encoding = used.name(), "Decoded body with detected encoding");
    text.into_owned()
}

/// True when the body is UTF-8 apart from a few stray bytes. Text in a
/// legacy CJK encoding fails on most of its non-ASCII bytes.
fn mostly_utf8(body: &[u8]) -> bool {
    let non_ascii = body.iter().filter(|b| !b.is_ascii()).count();
    let mut invalid = 0;
    let mut rest = body;
    while let Err(e) = std::str::from_utf8(rest) {
        let skip = e.error_len().unwrap_or(rest.len() - e.valid_up_to());
        invalid += skip;
        rest = &rest[e.valid_up_to() + skip..];
    }
    invalid * 10 <= non_ascii
}

/// Extract the charset value from a `Content-Type` header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GB18030, GBK};

    fn gbk_bytes(s: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = GBK.encode(s);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_utf8_body_decodes_first() {
        let body = "华为发布会".as_bytes();
        assert_eq!(decode_body(body, None, &[UTF_8, GBK]), "华为发布会");
    }

    #[test]
    fn test_gbk_body_falls_back_past_utf8() {
        let body = gbk_bytes("小米新机发布");
        assert_eq!(decode_body(&body, None, &[UTF_8, GBK]), "小米新机发布");
    }

    #[test]
    fn test_declared_charset_wins() {
        let body = gbk_bytes("新浪科技");
        let decoded = decode_body(&body, Some("text/html; charset=GB2312"), &[UTF_8]);
        assert_eq!(decoded, "新浪科技");
    }

    #[test]
    fn test_unknown_declared_charset_is_ignored() {
        let body = "IT之家".as_bytes();
        assert_eq!(decode_body(body, Some("text/html; charset=bogus"), &[UTF_8]), "IT之家");
    }

    #[test]
    fn test_undecodable_body_is_decoded_not_an_error() {
        let body = [b'o', b'k', b' ', 0xff, 0xfe, 0xfd, b' ', b'e', b'n', b'd'];
        let decoded = decode_body(&body, None, &[UTF_8]);
        assert!(decoded.starts_with("ok "));
        assert!(decoded.ends_with(" end"));
    }

    fn utf8_title_with_stray_byte() -> Vec<u8> {
        let mut body = r#"<a href="/doc-1">华为发布新一代折叠屏手机</a>"#.as_bytes().to_vec();
        body.push(0x80);
        body
    }

    #[test]
    fn test_declared_utf8_with_stray_byte_stays_utf8() {
        let body = utf8_title_with_stray_byte();
        let decoded = decode_body(&body, Some("text/html; charset=utf-8"), &[UTF_8, GBK, GB18030]);
        assert!(decoded.starts_with(r#"<a href="/doc-1">华为发布新一代折叠屏手机</a>"#));
        assert!(decoded.ends_with('\u{fffd}'));
    }

    #[test]
    fn test_undeclared_utf8_with_stray_byte_is_not_read_as_gbk() {
        let body = utf8_title_with_stray_byte();
        let decoded = decode_body(&body, None, &[UTF_8, GBK, GB18030]);
        assert!(decoded.contains("华为发布新一代折叠屏手机"));
    }

    #[test]
    fn test_mostly_utf8_threshold() {
        assert!(mostly_utf8(b"plain ascii"));
        assert!(mostly_utf8(&utf8_title_with_stray_byte()));
        assert!(!mostly_utf8(&gbk_bytes("小米新机发布会今日举行")));
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(extract_charset("text/html; charset=utf-8").as_deref(), Some("utf-8"));
        assert_eq!(extract_charset("text/html;Charset=\"GBK\"").as_deref(), Some("GBK"));
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn test_unknown_fallback_labels_are_skipped() {
        let labels = vec!["utf-8".to_string(), "no-such-encoding".to_string(), "gbk".to_string()];
        let fetcher = HttpFetcher::new(Duration::from_secs(1), "test-agent", &labels).unwrap();
        assert_eq!(fetcher.encodings, vec![UTF_8, GBK]);
    }
}
