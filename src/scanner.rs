//! Streaming anchor extraction from raw home-page markup.
//!
//! [`AnchorScanner`] walks the markup once, left to right, as a two-state
//! machine (`Outside` / `InsideAnchor`). It knows nothing about any
//! particular site; everything source-specific lives in
//! [`ExtractionRule`](crate::rules::ExtractionRule).
//!
//! # Fail-soft
//!
//! The iterator yields `Result`s and stops after the first error. Callers
//! that want whole-document semantics use [`scan_document`], which returns
//! either every anchor or none at all.

use crate::error::{DigestError, Result};
use crate::models::AnchorRecord;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use tracing::{debug, instrument, warn};
use url::Url;

static HREF_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#).unwrap()
});

static CHAR_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([A-Za-z][A-Za-z0-9]*));").unwrap()
});

/// Elements whose content is raw text and never contains markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

enum ScanState {
    Outside,
    InsideAnchor { href: String, text: String },
}

enum Event {
    Record(AnchorRecord),
    Nothing,
    End,
}

/// Lazy iterator over the anchors of one document.
///
/// Not `Clone`: once consumed it is gone, and a fresh scanner is needed to
/// read the document again.
pub struct AnchorScanner<'a> {
    markup: &'a str,
    pos: usize,
    base: Option<Url>,
    state: ScanState,
    done: bool,
}

impl<'a> AnchorScanner<'a> {
    /// Create a scanner over `markup`, resolving relative links against
    /// `base_url`. If the base does not parse, relative links resolve to
    /// nothing and their anchors are dropped.
    pub fn new(markup: &'a str, base_url: &str) -> Self {
        let base = match Url::parse(base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(%base_url, error = %e, "Base URL does not parse; relative links will be dropped");
                None
            }
        };
        Self {
            markup,
            pos: 0,
            base,
            state: ScanState::Outside,
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Event> {
        let markup = self.markup;
        let rest = &markup[self.pos..];
        if rest.is_empty() {
            return Ok(Event::End);
        }
        match rest.find('<') {
            Some(0) => self.markup_token(),
            Some(n) => {
                self.push_text(&rest[..n]);
                self.pos += n;
                Ok(Event::Nothing)
            }
            None => {
                self.push_text(rest);
                self.pos = markup.len();
                Ok(Event::Nothing)
            }
        }
    }

    /// Handle whatever starts with the `<` at the current position.
    fn markup_token(&mut self) -> Result<Event> {
        let markup = self.markup;
        let start = self.pos;
        let rest = &markup[start..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body
                .find("-->")
                .ok_or_else(|| parse_failure(start, "unterminated comment"))?;
            self.pos = start + 4 + end + 3;
            return Ok(Event::Nothing);
        }

        let after = &rest[1..];
        match after.chars().next() {
            Some('!') | Some('?') => {
                let end = after
                    .find('>')
                    .ok_or_else(|| parse_failure(start, "unterminated declaration"))?;
                self.pos = start + 1 + end + 1;
                Ok(Event::Nothing)
            }
            Some('/') if after[1..].starts_with(|c: char| c.is_ascii_alphabetic()) => {
                let end = after
                    .find('>')
                    .ok_or_else(|| parse_failure(start, "unterminated end tag"))?;
                let name = tag_name(&after[1..end]);
                self.pos = start + 1 + end + 1;
                if name.eq_ignore_ascii_case("a") {
                    Ok(self.close_anchor())
                } else {
                    Ok(Event::Nothing)
                }
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let end = find_tag_end(markup, start + 1)
                    .ok_or_else(|| parse_failure(start, "unterminated tag"))?;
                let inner = &markup[start + 1..end];
                let name = tag_name(inner);
                let attrs = &inner[name.len()..];
                self.pos = end + 1;

                if name.eq_ignore_ascii_case("a") {
                    self.open_anchor(attrs);
                } else if !attrs.trim_end().ends_with('/')
                    && RAW_TEXT_ELEMENTS.iter().any(|raw| name.eq_ignore_ascii_case(raw))
                {
                    self.skip_raw_text(name, start)?;
                }
                Ok(Event::Nothing)
            }
            _ => {
                // A lone `<` is ordinary text.
                self.push_text("<");
                self.pos = start + 1;
                Ok(Event::Nothing)
            }
        }
    }

    fn open_anchor(&mut self, attrs: &str) {
        let href = HREF_ATTR
            .captures_iter(attrs)
            .find_map(|caps| {
                let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
                let value = value.as_str().trim();
                (!value.is_empty()).then_some(value)
            })
            .map(|raw| self.resolve(&decode_char_refs(raw)))
            .unwrap_or_default();

        // A new anchor before the previous one closed replaces it.
        self.state = ScanState::InsideAnchor {
            href,
            text: String::new(),
        };
    }

    fn close_anchor(&mut self) -> Event {
        match std::mem::replace(&mut self.state, ScanState::Outside) {
            ScanState::InsideAnchor { href, text } => {
                let text = text.trim();
                if text.is_empty() || href.is_empty() {
                    Event::Nothing
                } else {
                    Event::Record(AnchorRecord::new(text, href))
                }
            }
            ScanState::Outside => Event::Nothing,
        }
    }

    fn push_text(&mut self, raw: &str) {
        if let ScanState::InsideAnchor { text, .. } = &mut self.state {
            text.push_str(&decode_char_refs(raw));
        }
    }

    /// Jump past the closing tag of a `<script>` or `<style>` element.
    fn skip_raw_text(&mut self, name: &str, tag_start: usize) -> Result<()> {
        let markup = self.markup;
        let closing = format!("</{name}");
        let offset = find_ignore_ascii_case(&markup[self.pos..], &closing)
            .ok_or_else(|| parse_failure(tag_start, "unterminated raw text element"))?;
        let close_start = self.pos + offset;
        let end = markup[close_start..]
            .find('>')
            .ok_or_else(|| parse_failure(close_start, "unterminated end tag"))?;
        self.pos = close_start + end + 1;
        Ok(())
    }

    fn resolve(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        if has_web_scheme(raw) {
            return raw.to_string();
        }
        match &self.base {
            Some(base) => base.join(raw).map(|u| u.to_string()).unwrap_or_default(),
            None => String::new(),
        }
    }
}

impl Iterator for AnchorScanner<'_> {
    type Item = Result<AnchorRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.advance() {
                Ok(Event::Record(record)) => return Some(Ok(record)),
                Ok(Event::Nothing) => continue,
                Ok(Event::End) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Scan a whole document. Malformed markup yields no anchors at all.
///
/// A document cut off inside a tag, comment or `<script>` element counts as
/// malformed, so a truncated download contributes nothing rather than the
/// anchors that happened to arrive.
#[instrument(level = "debug", skip(markup), fields(bytes = markup.len()))]
pub fn scan_document(markup: &str, base_url: &str) -> Vec<AnchorRecord> {
    match AnchorScanner::new(markup, base_url).collect::<Result<Vec<_>>>() {
        Ok(records) => {
            debug!(count = records.len(), "Scanned anchors");
            records
        }
        Err(e) => {
            warn!(error = %e, "Markup could not be scanned; discarding document");
            Vec::new()
        }
    }
}

/// Decode HTML character references. Unknown named references are kept
/// verbatim.
pub fn decode_char_refs(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    CHAR_REF.replace_all(s, |caps: &Captures| {
        if let Some(dec) = caps.get(1) {
            return numeric_char(dec.as_str().parse().ok());
        }
        if let Some(hex) = caps.get(2) {
            return numeric_char(u32::from_str_radix(hex.as_str(), 16).ok());
        }
        match named_char(&caps[3]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

fn numeric_char(code: Option<u32>) -> String {
    code.and_then(char::from_u32)
        .filter(|c| *c != '\0')
        .unwrap_or('\u{fffd}')
        .to_string()
}

fn named_char(name: &str) -> Option<char> {
    let c = match name {
        "amp" | "AMP" => '&',
        "lt" | "LT" => '<',
        "gt" | "GT" => '>',
        "quot" | "QUOT" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "middot" => '·',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "laquo" => '«',
        "raquo" => '»',
        "bull" => '•',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "times" => '×',
        "yen" => '¥',
        "pound" => '£',
        "cent" => '¢',
        "euro" => '€',
        "deg" => '°',
        "plusmn" => '±',
        "divide" => '÷',
        "frac12" => '½',
        "frac14" => '¼',
        "frac34" => '¾',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        _ => return None,
    };
    Some(c)
}

fn parse_failure(offset: usize, kind: &'static str) -> DigestError {
    DigestError::Parse { offset, kind }
}

fn tag_name(inner: &str) -> &str {
    let end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Byte index of the `>` closing the tag that starts at `from`, skipping
/// over quoted attribute values.
///
/// A quote only opens a value right after `=`, so an apostrophe inside an
/// unquoted value (`alt=Don't`) is plain text.
fn find_tag_end(markup: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    // Last non-whitespace byte outside a quoted value.
    let mut prev = 0u8;
    for (i, &b) in markup.as_bytes()[from..].iter().enumerate() {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                    prev = b;
                }
            }
            None => match b {
                b'>' => return Some(from + i),
                b'"' | b'\'' if prev == b'=' => quote = Some(b),
                _ if b.is_ascii_whitespace() => {}
                _ => prev = b,
            },
        }
    }
    None
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn has_web_scheme(href: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        href.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINA: &str = "https://tech.sina.com.cn/";

    fn texts(records: &[AnchorRecord]) -> Vec<&str> {
        records.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_nested_text_is_concatenated_in_order() {
        let html = r#"<div><a href="/doc-1.shtml"><span>华为</span> <b>发布</b>会</a></div>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "华为 发布会");
        assert_eq!(records[0].href, "https://tech.sina.com.cn/doc-1.shtml");
    }

    #[test]
    fn test_absolute_href_passes_through_unchanged() {
        let html = r#"<a href="https://www.ithome.com/0/812/345.htm">小米新机</a>
                      <a href="https://tech.sina.com.cn">新浪科技</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].href, "https://www.ithome.com/0/812/345.htm");
        assert_eq!(records[1].href, "https://tech.sina.com.cn");
    }

    #[test]
    fn test_relative_and_protocol_relative_hrefs_resolve() {
        let html = r#"<a href='mobile/n.shtml'>手机</a><a href=//finance.sina.com.cn/tech/x.shtml>财经科技</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].href, "https://tech.sina.com.cn/mobile/n.shtml");
        assert_eq!(records[1].href, "https://finance.sina.com.cn/tech/x.shtml");
    }

    #[test]
    fn test_empty_text_or_missing_href_is_discarded() {
        let html = r#"<a href="/a.html">   </a><a name="top">锚点</a><a href="">空链接</a><a href="/ok">保留</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(texts(&records), vec!["保留"]);
    }

    #[test]
    fn test_character_references_are_decoded() {
        let html = r#"<a href="/s?a=1&amp;b=2">AT&amp;T &#x4E2D;&#22269; &copy;</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].text, "AT&T 中国 ©");
        assert_eq!(records[0].href, "https://tech.sina.com.cn/s?a=1&b=2");
    }

    #[test]
    fn test_script_and_comments_are_skipped() {
        let html = r#"
            <script>var s = "<a href='/fake'>假链接</a>";</script>
            <!-- <a href="/commented">注释里的链接</a> -->
            <!DOCTYPE html>
            <a href="/real">真的链接</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(texts(&records), vec!["真的链接"]);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let html = r#"<a href="/cmp">1 < 2 的比较</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].text, "1 < 2 的比较");
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        let html = r#"<A HREF="/upper">大写标签</A>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].href, "https://tech.sina.com.cn/upper");
    }

    #[test]
    fn test_data_href_is_not_mistaken_for_href() {
        let html = r#"<a data-href="/bad" href="/good">正确链接</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].href, "https://tech.sina.com.cn/good");
    }

    #[test]
    fn test_reopened_anchor_restarts_record() {
        let html = r#"<a href="/1">甲<a href="/2">乙</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records, vec![AnchorRecord::new("乙", "https://tech.sina.com.cn/2")]);
    }

    #[test]
    fn test_scanner_is_lazy() {
        let html = r#"<a href="/1">第一条</a><a href="/2""#;
        let mut scanner = AnchorScanner::new(html, SINA);
        let first = scanner.next().unwrap().unwrap();
        assert_eq!(first.text, "第一条");
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_malformed_markup_yields_nothing_not_partial() {
        let unterminated_tag = r#"<a href="/1">第一条</a><a href="/2""#;
        assert!(scan_document(unterminated_tag, SINA).is_empty());

        let unterminated_comment = r#"<a href="/1">第一条</a><!-- never closed"#;
        assert!(scan_document(unterminated_comment, SINA).is_empty());

        let unterminated_script = r#"<a href="/1">第一条</a><script>var x = 1;"#;
        assert!(scan_document(unterminated_script, SINA).is_empty());

        let cut_mid_tag = r#"<a href="/1">第一条</a><a href="/2">第二条</a><di"#;
        assert!(scan_document(cut_mid_tag, SINA).is_empty());

        let cut_mid_value = r#"<a href="/1">第一条</a><a href="/doc-2"#;
        assert!(scan_document(cut_mid_value, SINA).is_empty());
    }

    #[test]
    fn test_apostrophe_in_unquoted_value_does_not_swallow_document() {
        let html = r#"<a href="/doc-1">华为发布新一代折叠屏手机</a><img alt=Don't src=x.png><a href="/doc-2">小米新机发布会今日举行</a><p>end</p>"#;
        let records = scan_document(html, SINA);
        assert_eq!(
            texts(&records),
            vec!["华为发布新一代折叠屏手机", "小米新机发布会今日举行"]
        );
    }

    #[test]
    fn test_quotes_inside_quoted_values_and_spaced_equals() {
        let html = r#"<a title="it's > here" href = '/doc-1'>引号内的尖括号</a>"#;
        let records = scan_document(html, SINA);
        assert_eq!(records[0].href, "https://tech.sina.com.cn/doc-1");
        assert_eq!(records[0].text, "引号内的尖括号");
    }

    #[test]
    fn test_unparseable_base_drops_relative_links_only() {
        let html = r#"<a href="/rel">相对</a><a href="https://www.ithome.com/">绝对</a>"#;
        let records = scan_document(html, "not a url");
        assert_eq!(texts(&records), vec!["绝对"]);
    }

    #[test]
    fn test_decode_char_refs_keeps_unknown_names() {
        assert_eq!(decode_char_refs("a &bogus; b"), "a &bogus; b");
        assert_eq!(decode_char_refs("no refs"), "no refs");
        assert_eq!(decode_char_refs("&#0;"), "\u{fffd}");
    }

    #[test]
    fn test_common_typographic_entities() {
        assert_eq!(decode_char_refs("&euro;5&ensp;&frac12;"), "€5\u{2002}½");
        assert_eq!(decode_char_refs("25&deg;C &plusmn;1"), "25°C ±1");
        assert_eq!(decode_char_refs("&pound;&cent;&divide;&emsp;&thinsp;"), "£¢÷\u{2003}\u{2009}");
    }
}
