//! Published-date recovery: meta tags on the page, or the search backend's
//! unparsed age hint, per §4.4.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use scraper::{Html, Selector};

const META_SELECTORS: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[property="og:published_time"]"#,
    r#"meta[name="article:published_time"]"#,
    r#"meta[name="publish-date"]"#,
    r#"meta[name="date"]"#,
];

/// Look for a published-date meta tag or a `<time datetime>` element.
pub fn extract_meta_date(document: &Html) -> Option<DateTime<Utc>> {
    for selector_str in META_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(value) = document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("content"))
            {
                if let Some(date) = parse_iso(value) {
                    return Some(date);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("time[datetime]") {
        if let Some(value) = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("datetime"))
        {
            if let Some(date) = parse_iso(value) {
                return Some(date);
            }
        }
    }

    None
}

/// Parse a search backend's unparsed age hint: ISO-8601, `"Month D, YYYY"`,
/// or `"N {hour|day|week|month|year}(s) ago"`.
pub fn parse_hint(hint: &str) -> Option<DateTime<Utc>> {
    let hint = hint.trim();
    if let Some(date) = parse_iso(hint) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(hint, "%B %d, %Y") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    parse_relative(hint)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `"3 days ago"`, `"1 hour ago"`, `"2 weeks ago"`, `"4 months ago"`,
/// `"1 year ago"`.
fn parse_relative(text: &str) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();
    let lower = lower.strip_suffix(" ago")?.trim();
    let mut parts = lower.splitn(2, char::is_whitespace);
    let count: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.trim_end_matches('s');

    let delta = match unit {
        "hour" => Duration::hours(count),
        "day" => Duration::days(count),
        "week" => Duration::weeks(count),
        "month" => Duration::days(count * 30),
        "year" => Duration::days(count * 365),
        _ => return None,
    };
    Some(Utc::now() - delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_hint() {
        assert!(parse_hint("2024-03-15T10:00:00Z").is_some());
    }

    #[test]
    fn parses_month_day_year_hint() {
        let date = parse_hint("March 15, 2024").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-03-15");
    }

    #[test]
    fn parses_relative_hint() {
        assert!(parse_hint("3 days ago").is_some());
        assert!(parse_hint("1 week ago").is_some());
        assert!(parse_hint("2 years ago").is_some());
    }

    #[test]
    fn rejects_unparseable_hint() {
        assert!(parse_hint("not a date").is_none());
    }

    #[test]
    fn extracts_published_time_meta_tag() {
        let html = r#"<html><head><meta property="article:published_time" content="2023-01-01T00:00:00Z"></head></html>"#;
        let document = Html::parse_document(html);
        assert!(extract_meta_date(&document).is_some());
    }
}
