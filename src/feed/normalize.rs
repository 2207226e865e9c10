//! Turns one raw feedly item into a [`NewsRecord`].
//!
//! The item shape is specific to the Yahoo Finance headline feed as proxied by
//! feedly. Every quirk of that feed is handled by its own small extraction
//! step below so it can be exercised in isolation.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::MalformedItem;
use crate::types::NewsRecord;

pub const ORIGIN_ID_PREFIX: &str = "yahoo_finance/";

/// Leading title token marking paywalled content.
pub const PREMIUM_MARKER: &str = "[$$]";

/// Alternate links containing this have no recoverable target.
const BROKEN_LINK_MARKER: &str = "finance/news/rss/story/*&";

/// The alternate link is a redirect wrapper; the embedded target is searched
/// for after this many leading characters.
const EMBEDDED_URL_OFFSET: usize = 7;

static TAG_WITH_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.+?\]\s*-\s*").expect("valid tag regex"));

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.+?\]").expect("valid tag regex"));

static LINK_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"finance/(news|external/(.+?))/").expect("valid source regex"));

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?(:|%3A)//.+?)(\?|#|$)").expect("valid url regex"));

/// Outcome of looking for an article URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRecovery {
    /// Explicit `canonicalUrl` field.
    Canonical(String),
    /// Target pulled out of the alternate link.
    Embedded(String),
    /// Known dead redirect; no URL exists.
    Broken,
    /// Expected a URL but could not find one.
    Unrecoverable,
}

impl UrlRecovery {
    pub fn into_url(self) -> Option<String> {
        match self {
            UrlRecovery::Canonical(url) | UrlRecovery::Embedded(url) => Some(url),
            UrlRecovery::Broken | UrlRecovery::Unrecoverable => None,
        }
    }
}

/// Normalize a raw feed item for `ticker`.
///
/// Fails only when the item lacks structure every item is expected to have:
/// an alternate link, an origin id, a title and a publish time. A missing
/// article URL is logged and stored as absent.
pub fn normalize(ticker: &str, item: &Value) -> Result<NewsRecord, MalformedItem> {
    let alt_href = item
        .get("alternate")
        .and_then(Value::as_array)
        .and_then(|links| links.first())
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
        .ok_or(MalformedItem::MissingField("alternate"))?;

    let origin_id = item
        .get("originId")
        .and_then(Value::as_str)
        .ok_or(MalformedItem::MissingField("originId"))?;
    let id = parse_origin_id(origin_id)?;

    let raw_title = item
        .get("title")
        .and_then(Value::as_str)
        .ok_or(MalformedItem::MissingField("title"))?;
    let (title, premium) = strip_premium_marker(raw_title);

    let published_at = item
        .get("published")
        .and_then(published_secs)
        .ok_or(MalformedItem::MissingField("published"))?;

    let summary = summary_text(item);
    let description = summary.map(clean_description);
    let source = source_from_link(alt_href).or_else(|| summary.and_then(source_from_summary));

    let canonical = item.get("canonicalUrl").and_then(Value::as_str);
    let recovery = recover_url(canonical, alt_href);
    if recovery == UrlRecovery::Unrecoverable {
        warn!(ticker, id, alt_href, "no article URL recoverable from alternate link");
    }

    Ok(NewsRecord {
        ticker: ticker.to_string(),
        id,
        published_at,
        source,
        title,
        description,
        url: recovery.into_url(),
        engagement: item.get("engagement").and_then(Value::as_i64),
        premium,
    })
}

/// `yahoo_finance/12345` → `12345`.
pub fn parse_origin_id(origin_id: &str) -> Result<i64, MalformedItem> {
    let digits = origin_id
        .strip_prefix(ORIGIN_ID_PREFIX)
        .ok_or_else(|| MalformedItem::MissingIdPrefix(origin_id.to_string()))?;
    digits
        .parse::<i64>()
        .map_err(|_| MalformedItem::InvalidId(origin_id.to_string()))
}

/// Epoch milliseconds to whole seconds, rounding toward negative infinity.
pub fn millis_to_secs(ms: i64) -> i64 {
    ms.div_euclid(1000)
}

fn published_secs(v: &Value) -> Option<i64> {
    match v.as_i64() {
        Some(ms) => Some(millis_to_secs(ms)),
        None => v.as_f64().map(|ms| (ms / 1000.0).floor() as i64),
    }
}

/// Returns the display title and whether the premium marker was present.
pub fn strip_premium_marker(raw_title: &str) -> (String, bool) {
    match raw_title.strip_prefix(PREMIUM_MARKER) {
        Some(rest) => (rest.trim().to_string(), true),
        None => (raw_title.trim().to_string(), false),
    }
}

/// Trimmed `summary.content`; empty counts as absent.
fn summary_text(item: &Value) -> Option<&str> {
    item.get("summary")
        .and_then(|s| s.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `[Reuters] - Shares rose 3%` → `Shares rose 3%`. A summary that is only
/// a tag cleans to an empty string, not to an absent description.
pub fn clean_description(summary: &str) -> String {
    TAG_WITH_DASH.replacen(summary.trim(), 1, "").into_owned()
}

/// Outlet label from `.../finance/external/<label>/...`. Plain
/// `finance/news/` links carry no label.
pub fn source_from_link(alt_href: &str) -> Option<String> {
    LINK_SOURCE
        .captures(alt_href)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Leading bracketed tag of the summary, brackets kept: `[Reuters] - ...` → `[Reuters]`.
pub fn source_from_summary(summary: &str) -> Option<String> {
    LEADING_TAG
        .find(summary.trim())
        .map(|m| m.as_str().to_string())
}

pub fn recover_url(canonical: Option<&str>, alt_href: &str) -> UrlRecovery {
    if let Some(url) = canonical.filter(|u| !u.is_empty()) {
        return UrlRecovery::Canonical(url.to_string());
    }
    match embedded_url(alt_href) {
        Some(url) => UrlRecovery::Embedded(url),
        None if alt_href.contains(BROKEN_LINK_MARKER) => UrlRecovery::Broken,
        None => UrlRecovery::Unrecoverable,
    }
}

/// Target URL wrapped inside a redirect link, ending at `?`, `#` or the end
/// of the link. A `%3A` scheme separator means the target is percent-encoded.
pub fn embedded_url(alt_href: &str) -> Option<String> {
    let tail = skip_chars(alt_href, EMBEDDED_URL_OFFSET);
    let caps = EMBEDDED_URL.captures(tail)?;
    let url = caps.get(1)?.as_str();
    if caps.get(2).map(|m| m.as_str()) == Some(":") {
        Some(url.to_string())
    } else {
        let decoded = urlencoding::decode_binary(url.as_bytes());
        Some(String::from_utf8_lossy(&decoded).into_owned())
    }
}

fn skip_chars(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or("", |(idx, _)| &s[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EXTERNAL_LINK: &str = "http://us.rd.yahoo.com/finance/external/reuters/SIG=12abc/*http://www.reuters.com/article/acme-results?feedType=RSS";
    const BROKEN_LINK: &str = "http://us.rd.yahoo.com/finance/news/rss/story/*&";

    fn item(title: &str, alt_href: &str) -> Value {
        json!({
            "originId": "yahoo_finance/12345",
            "published": 1_500_000_123_456_i64,
            "title": title,
            "alternate": [{ "href": alt_href, "type": "text/html" }],
        })
    }

    #[test]
    fn strips_premium_marker() {
        assert_eq!(
            strip_premium_marker("[$$] Acme beats estimates"),
            ("Acme beats estimates".to_string(), true)
        );
        assert_eq!(
            strip_premium_marker("Acme beats estimates"),
            ("Acme beats estimates".to_string(), false)
        );
        assert_eq!(
            strip_premium_marker("  Acme [$$] later  "),
            ("Acme [$$] later".to_string(), false)
        );
    }

    #[test]
    fn cleans_tagged_description() {
        assert_eq!(clean_description("[Reuters] - Shares rose 3%"), "Shares rose 3%");
        assert_eq!(clean_description("  [AP]-Plain  "), "Plain");
        assert_eq!(clean_description("No tag here - ok"), "No tag here - ok");
        // Only the leading tag goes.
        assert_eq!(clean_description("[A] - b [C] - d"), "b [C] - d");
        assert_eq!(clean_description("[Reuters] - "), "");
    }

    #[test]
    fn tag_only_summary_stores_empty_description() {
        let mut raw = item("Acme", BROKEN_LINK);
        raw["summary"] = json!({ "content": "[Reuters] - " });

        let record = normalize("ACME", &raw).unwrap();
        assert_eq!(record.description.as_deref(), Some(""));
        assert_eq!(record.source.as_deref(), Some("[Reuters]"));
    }

    #[test]
    fn parses_origin_id() {
        assert_eq!(parse_origin_id("yahoo_finance/12345"), Ok(12345));
        assert_eq!(
            parse_origin_id("other_feed/12345"),
            Err(MalformedItem::MissingIdPrefix("other_feed/12345".to_string()))
        );
        assert_eq!(
            parse_origin_id("yahoo_finance/12a"),
            Err(MalformedItem::InvalidId("yahoo_finance/12a".to_string()))
        );
    }

    #[test]
    fn converts_millis_with_floor() {
        assert_eq!(millis_to_secs(1_500_000_123_456), 1_500_000_123);
        assert_eq!(millis_to_secs(999), 0);
        assert_eq!(millis_to_secs(-1), -1);
    }

    #[test]
    fn float_publish_time_is_floored() {
        assert_eq!(published_secs(&json!(1_500_000_123_456.0)), Some(1_500_000_123));
        assert_eq!(published_secs(&json!(1_500_000_123_999.5)), Some(1_500_000_123));
        assert_eq!(published_secs(&json!("1500000123456")), None);

        let mut raw = item("Acme", BROKEN_LINK);
        raw["published"] = json!(1_500_000_123_456.0);
        assert_eq!(normalize("ACME", &raw).unwrap().published_at, 1_500_000_123);
    }

    #[test]
    fn source_from_external_link() {
        assert_eq!(source_from_link(EXTERNAL_LINK).as_deref(), Some("reuters"));
        assert_eq!(source_from_link(BROKEN_LINK), None);
        assert_eq!(source_from_link("http://example.com/nothing"), None);
    }

    #[test]
    fn source_from_summary_keeps_brackets() {
        assert_eq!(
            source_from_summary("[Motley Fool] - Buy now").as_deref(),
            Some("[Motley Fool]")
        );
        assert_eq!(source_from_summary("No tag"), None);
    }

    #[test]
    fn recovers_plain_embedded_url() {
        assert_eq!(
            recover_url(None, EXTERNAL_LINK),
            UrlRecovery::Embedded("http://www.reuters.com/article/acme-results".to_string())
        );
    }

    #[test]
    fn recovers_percent_encoded_url() {
        let link = "http://us.rd.yahoo.com/finance/external/xyz/*https%3A//www.example.com/a%20b#frag";
        assert_eq!(
            embedded_url(link).as_deref(),
            Some("https://www.example.com/a b")
        );
    }

    #[test]
    fn skips_wrapper_scheme_before_searching() {
        // Without the offset the wrapper's own scheme would match.
        assert_eq!(embedded_url("http://finance.yahoo.com/news/acme.html"), None);
    }

    #[test]
    fn canonical_url_wins() {
        assert_eq!(
            recover_url(Some("https://canonical.example/x"), EXTERNAL_LINK),
            UrlRecovery::Canonical("https://canonical.example/x".to_string())
        );
        // Empty canonical falls through to the alternate link.
        assert!(matches!(
            recover_url(Some(""), EXTERNAL_LINK),
            UrlRecovery::Embedded(_)
        ));
    }

    #[test]
    fn broken_and_unrecoverable_links() {
        assert_eq!(recover_url(None, BROKEN_LINK), UrlRecovery::Broken);
        assert_eq!(
            recover_url(None, "http://finance.yahoo.com/news/acme.html"),
            UrlRecovery::Unrecoverable
        );
    }

    #[test]
    fn normalizes_full_item() {
        let mut raw = item("[$$] Acme beats estimates ", EXTERNAL_LINK);
        raw["summary"] = json!({ "content": "  [Reuters] - Shares rose 3%  " });
        raw["engagement"] = json!(42);

        let record = normalize("ACME", &raw).unwrap();
        assert_eq!(
            record,
            NewsRecord {
                ticker: "ACME".to_string(),
                id: 12345,
                published_at: 1_500_000_123,
                source: Some("reuters".to_string()),
                title: "Acme beats estimates".to_string(),
                description: Some("Shares rose 3%".to_string()),
                url: Some("http://www.reuters.com/article/acme-results".to_string()),
                engagement: Some(42),
                premium: true,
            }
        );
    }

    #[test]
    fn broken_link_falls_back_to_summary_source() {
        let mut raw = item("Acme news", BROKEN_LINK);
        raw["summary"] = json!({ "content": "[Zacks] - Earnings preview" });

        let record = normalize("ACME", &raw).unwrap();
        assert_eq!(record.url, None);
        assert_eq!(record.source.as_deref(), Some("[Zacks]"));
        assert_eq!(record.description.as_deref(), Some("Earnings preview"));
        assert!(!record.premium);
        assert_eq!(record.engagement, None);
    }

    #[test]
    fn unrecoverable_url_degrades_to_absent() {
        let record = normalize("ACME", &item("Acme", "http://finance.yahoo.com/news/acme.html")).unwrap();
        assert_eq!(record.url, None);
    }

    #[test]
    fn empty_summary_is_absent() {
        let mut raw = item("Acme", BROKEN_LINK);
        raw["summary"] = json!({ "content": "   " });

        let record = normalize("ACME", &raw).unwrap();
        assert_eq!(record.description, None);
        assert_eq!(record.source, None);
    }

    #[test]
    fn missing_structure_is_malformed() {
        let mut raw = item("Acme", EXTERNAL_LINK);
        raw["alternate"] = json!([]);
        assert_eq!(
            normalize("ACME", &raw),
            Err(MalformedItem::MissingField("alternate"))
        );

        let mut raw = item("Acme", EXTERNAL_LINK);
        raw.as_object_mut().unwrap().remove("title");
        assert_eq!(normalize("ACME", &raw), Err(MalformedItem::MissingField("title")));

        let mut raw = item("Acme", EXTERNAL_LINK);
        raw.as_object_mut().unwrap().remove("originId");
        assert_eq!(
            normalize("ACME", &raw),
            Err(MalformedItem::MissingField("originId"))
        );

        let mut raw = item("Acme", EXTERNAL_LINK);
        raw["originId"] = json!("12345");
        assert!(matches!(
            normalize("ACME", &raw),
            Err(MalformedItem::MissingIdPrefix(_))
        ));
    }
}
