// 📏 Metric Library - compare a variant against its reference value
// Every function here is total: empty strings, short strings and
// unparsable dates all produce a result, never a panic.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::fields::MetricKind;

/// Number of leading characters checked by `prefix_mismatch`
pub const PREFIX_WINDOW: usize = 4;

// ============================================================================
// STRING METRICS
// ============================================================================

/// Levenshtein distance on (already normalized) strings, counted in chars
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Jaro-Winkler similarity in [0, 1], higher = more similar
pub fn similarity_score(a: &str, b: &str) -> f64 {
    // Fixed argument order keeps the score symmetric
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    strsim::jaro_winkler(first, second)
}

/// True when any of the first `PREFIX_WINDOW` characters differ.
///
/// Only positions present in both strings are compared, so
/// "jo" vs "john" is not a mismatch but "jon" vs "john" is.
pub fn prefix_mismatch(a: &str, b: &str) -> bool {
    a.chars()
        .take(PREFIX_WINDOW)
        .zip(b.chars().take(PREFIX_WINDOW))
        .any(|(x, y)| x != y)
}

// ============================================================================
// DATE METRICS
// ============================================================================

/// Date-only formats, tried in order. Day-first readings come before the
/// month-first fallback so "05/06/1985" is 5 June.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Two-digit-year forms, tried only after every four-digit reading failed.
/// `%y` maps 70-99 to the 1900s and 00-69 to the 2000s.
const SHORT_YEAR_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%m/%d/%y",
    "%m-%d-%y",
    "%y-%m-%d",
    "%y/%m/%d",
];

/// `%Y` also accepts one- to three-digit years; such readings are discarded
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

fn has_four_digit_year(date: &NaiveDate) -> bool {
    date.year() >= MIN_FOUR_DIGIT_YEAR
}

/// Tolerant multi-format date parser.
///
/// Accepts year-first and day-first separated forms, month-first when the
/// day-first reading is impossible, compact `YYYYMMDD`, named months, and
/// datetimes (time part dropped). Two-digit years are read day-first
/// (`15/06/85` is 15 June 1985); anything else returns None.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Compact YYYYMMDD
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[..4].parse().ok()?;
        let month: u32 = s[4..6].parse().ok()?;
        let day: u32 = s[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).filter(has_four_digit_year);
    }

    let dated = DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(has_four_digit_year);
    if dated.is_some() {
        return dated;
    }

    let timed = DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|datetime| datetime.date())
        .find(has_four_digit_year);
    if timed.is_some() {
        return timed;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    SHORT_YEAR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Absolute difference in days, or None if either side fails to parse
pub fn date_gap_days(a: &str, b: &str) -> Option<i64> {
    let d1 = parse_date(a)?;
    let d2 = parse_date(b)?;
    Some((d1 - d2).num_days().abs())
}

// ============================================================================
// COMPARISON
// ============================================================================

/// Raw outcome of comparing one variant with its reference.
/// Which arm is produced depends on the field's metric family, never on the
/// shape of the values themselves (except the date -> text fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    Text {
        edit_distance: usize,
        similarity_score: f64,
        prefix_mismatch: bool,
    },
    Date {
        gap_days: i64,
    },
    Categorical {
        matches: bool,
    },
    /// One side is null; no metric is defined
    Missing,
}

impl Comparison {
    pub fn edit_distance(&self) -> Option<usize> {
        match self {
            Comparison::Text { edit_distance, .. } => Some(*edit_distance),
            _ => None,
        }
    }

    pub fn similarity_score(&self) -> Option<f64> {
        match self {
            Comparison::Text { similarity_score, .. } => Some(*similarity_score),
            _ => None,
        }
    }

    pub fn prefix_mismatch(&self) -> bool {
        matches!(self, Comparison::Text { prefix_mismatch: true, .. })
    }

    pub fn date_gap_days(&self) -> Option<i64> {
        match self {
            Comparison::Date { gap_days } => Some(*gap_days),
            _ => None,
        }
    }
}

fn text_comparison(reference: &str, variant: &str) -> Comparison {
    Comparison::Text {
        edit_distance: edit_distance(reference, variant),
        similarity_score: similarity_score(reference, variant),
        prefix_mismatch: prefix_mismatch(reference, variant),
    }
}

/// Compare a variant with its reference using the given metric family
pub fn compare(kind: MetricKind, reference: Option<&str>, variant: Option<&str>) -> Comparison {
    let (reference, variant) = match (reference, variant) {
        (Some(r), Some(v)) => (r, v),
        _ => return Comparison::Missing,
    };

    match kind {
        MetricKind::String => text_comparison(reference, variant),
        MetricKind::Date => match date_gap_days(reference, variant) {
            Some(gap_days) => Comparison::Date { gap_days },
            None => text_comparison(reference, variant),
        },
        MetricKind::Categorical => Comparison::Categorical {
            matches: reference == variant,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "ab"), 1);
        assert_eq!(edit_distance("abc", "abcd"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("john", "jon"), 1);
        assert_eq!(edit_distance("", "smith"), 5);
    }

    #[test]
    fn test_edit_distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance("zoë", "zoe"), 1);
    }

    #[test]
    fn test_similarity_score_bounds() {
        assert_eq!(similarity_score("john", "john"), 1.0);
        assert_eq!(similarity_score("", ""), 1.0);
        assert_eq!(similarity_score("abc", "xyz"), 0.0);

        let s = similarity_score("john", "jon");
        assert!(s > 0.85 && s < 1.0, "got {}", s);
    }

    #[test]
    fn test_similarity_score_symmetric() {
        assert_eq!(
            similarity_score("martha", "marhta"),
            similarity_score("marhta", "martha")
        );
        assert_eq!(
            similarity_score("123 main st", "123 main street"),
            similarity_score("123 main street", "123 main st")
        );
    }

    #[test]
    fn test_prefix_mismatch() {
        assert!(!prefix_mismatch("john", "johnny"));
        assert!(prefix_mismatch("john", "jahn"));
        assert!(prefix_mismatch("john", "jon"));
        // Differences after the window are ignored
        assert!(!prefix_mismatch("smith", "smitt"));
    }

    #[test]
    fn test_prefix_mismatch_short_strings() {
        assert!(!prefix_mismatch("", ""));
        assert!(!prefix_mismatch("", "john"));
        assert!(!prefix_mismatch("jo", "john"));
        assert!(prefix_mismatch("f", "m"));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1985, 6, 15).unwrap();

        assert_eq!(parse_date("1985-06-15"), Some(expected));
        assert_eq!(parse_date("1985/06/15"), Some(expected));
        assert_eq!(parse_date("15-06-1985"), Some(expected));
        assert_eq!(parse_date("15/06/1985"), Some(expected));
        assert_eq!(parse_date("1985-6-15"), Some(expected));
        assert_eq!(parse_date("19850615"), Some(expected));
        assert_eq!(parse_date("06/15/1985"), Some(expected));
        assert_eq!(parse_date("15 jun 1985"), Some(expected));
        assert_eq!(parse_date("1985-06-15T10:30:00"), Some(expected));
        assert_eq!(parse_date("  1985-06-15  "), Some(expected));
    }

    #[test]
    fn test_parse_date_two_digit_year() {
        assert_eq!(parse_date("15/06/85"), NaiveDate::from_ymd_opt(1985, 6, 15));
        assert_eq!(parse_date("01-02-03"), NaiveDate::from_ymd_opt(2003, 2, 1));
        assert_eq!(date_gap_days("15/06/85", "1985-06-15"), Some(0));
        // Year-first only when no day-first reading exists
        assert_eq!(parse_date("85-06-15"), NaiveDate::from_ymd_opt(1985, 6, 15));

        // Never a first-century date
        assert_eq!(parse_date("15/06/0085"), None);
        assert_eq!(parse_date("00850615"), None);
    }

    #[test]
    fn test_parse_date_day_first() {
        // Both readings valid: day-first wins
        assert_eq!(
            parse_date("05/06/1985"),
            NaiveDate::from_ymd_opt(1985, 6, 5)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("19851315"), None);
        assert_eq!(parse_date("1985-02-30"), None);
    }

    #[test]
    fn test_date_gap_days() {
        assert_eq!(date_gap_days("1985-06-15", "1985-06-16"), Some(1));
        assert_eq!(date_gap_days("1985-06-16", "1985-06-15"), Some(1));
        assert_eq!(date_gap_days("1985-06-15", "1985-07-15"), Some(30));
        assert_eq!(date_gap_days("1985-06-15", "15/06/1985"), Some(0));
        assert_eq!(date_gap_days("1985-06-15", "unknown"), None);
    }

    #[test]
    fn test_compare_string_field() {
        let c = compare(MetricKind::String, Some("john"), Some("jon"));

        assert_eq!(c.edit_distance(), Some(1));
        assert!(c.similarity_score().is_some());
        assert!(c.prefix_mismatch());
        assert_eq!(c.date_gap_days(), None);
    }

    #[test]
    fn test_compare_date_field() {
        let c = compare(MetricKind::Date, Some("1985-06-15"), Some("1985-07-15"));

        assert_eq!(c, Comparison::Date { gap_days: 30 });
        assert_eq!(c.edit_distance(), None);
        assert!(!c.prefix_mismatch());
    }

    #[test]
    fn test_compare_date_falls_back_to_text() {
        let c = compare(MetricKind::Date, Some("1985-06-15"), Some("unknown"));

        assert!(matches!(c, Comparison::Text { .. }));
        assert_eq!(c.date_gap_days(), None);
    }

    #[test]
    fn test_compare_categorical() {
        assert_eq!(
            compare(MetricKind::Categorical, Some("f"), Some("m")),
            Comparison::Categorical { matches: false }
        );
        assert_eq!(
            compare(MetricKind::Categorical, Some("f"), Some("f")),
            Comparison::Categorical { matches: true }
        );
    }

    #[test]
    fn test_compare_null_is_missing() {
        assert_eq!(compare(MetricKind::String, None, Some("john")), Comparison::Missing);
        assert_eq!(compare(MetricKind::Date, Some("1985-06-15"), None), Comparison::Missing);
        assert_eq!(compare(MetricKind::Categorical, None, None), Comparison::Missing);
    }
}
