//! Date format buckets
//!
//! Each bucket is a regex gate plus a calendar check, so `2024-02-30`
//! classifies as `Unparseable` rather than `IsoDate`.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Textual date encodings recognised by the detector and the cleaner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `2024-03-15` (canonical)
    IsoDate,
    /// `2024-03-15T09:30:00`
    IsoTimestamp,
    /// `2024/03/15`
    SlashDelimited,
    /// `15-03-2024`
    DashReordered,
    /// `2024.03.15`
    DotDelimited,
    /// `20240315`
    Compact,
    Unparseable,
}

static PATTERNS: OnceLock<Vec<(DateFormat, Regex)>> = OnceLock::new();

fn patterns() -> &'static [(DateFormat, Regex)] {
    PATTERNS.get_or_init(|| {
        [
            (DateFormat::IsoDate, r"^(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})$"),
            (
                DateFormat::IsoTimestamp,
                r"^(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})[T ](?P<H>\d{2}):(?P<M>\d{2}):(?P<S>\d{2})(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?$",
            ),
            (DateFormat::SlashDelimited, r"^(?P<y>\d{4})/(?P<m>\d{2})/(?P<d>\d{2})$"),
            (DateFormat::DashReordered, r"^(?P<d>\d{2})-(?P<m>\d{2})-(?P<y>\d{4})$"),
            (DateFormat::DotDelimited, r"^(?P<y>\d{4})\.(?P<m>\d{2})\.(?P<d>\d{2})$"),
            (DateFormat::Compact, r"^(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})$"),
        ]
        .into_iter()
        .map(|(fmt, re)| (fmt, Regex::new(re).expect("valid regex")))
        .collect()
    })
}

impl DateFormat {
    /// Parse precedence used by the cleaner
    pub fn precedence() -> &'static [DateFormat] {
        &[
            DateFormat::IsoDate,
            DateFormat::IsoTimestamp,
            DateFormat::SlashDelimited,
            DateFormat::DashReordered,
            DateFormat::DotDelimited,
            DateFormat::Compact,
        ]
    }

    /// Alternate encodings the injector may render
    pub fn variants() -> &'static [DateFormat] {
        &[
            DateFormat::IsoTimestamp,
            DateFormat::SlashDelimited,
            DateFormat::DashReordered,
            DateFormat::DotDelimited,
            DateFormat::Compact,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DateFormat::IsoDate => "iso_date",
            DateFormat::IsoTimestamp => "iso_timestamp",
            DateFormat::SlashDelimited => "slash_delimited",
            DateFormat::DashReordered => "dash_reordered",
            DateFormat::DotDelimited => "dot_delimited",
            DateFormat::Compact => "compact",
            DateFormat::Unparseable => "unparseable",
        }
    }

    /// Parse `value` under this bucket only
    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        let re = patterns()
            .iter()
            .find(|(fmt, _)| fmt == self)
            .map(|(_, re)| re)?;
        let caps = re.captures(value.trim())?;
        let y: i32 = caps.name("y")?.as_str().parse().ok()?;
        let m: u32 = caps.name("m")?.as_str().parse().ok()?;
        let d: u32 = caps.name("d")?.as_str().parse().ok()?;
        if let (Some(h), Some(mi), Some(s)) = (caps.name("H"), caps.name("M"), caps.name("S")) {
            let h: u32 = h.as_str().parse().ok()?;
            let mi: u32 = mi.as_str().parse().ok()?;
            let s: u32 = s.as_str().parse().ok()?;
            if h > 23 || mi > 59 || s > 60 {
                return None;
            }
        }
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Render a date in this bucket. `hour`/`minute` only apply to timestamps.
    pub fn render(&self, date: NaiveDate, hour: u32, minute: u32) -> String {
        let (y, m, d) = (date.year(), date.month(), date.day());
        match self {
            DateFormat::IsoDate | DateFormat::Unparseable => format!("{y:04}-{m:02}-{d:02}"),
            DateFormat::IsoTimestamp => {
                format!("{y:04}-{m:02}-{d:02}T{:02}:{:02}:00", hour % 24, minute % 60)
            }
            DateFormat::SlashDelimited => format!("{y:04}/{m:02}/{d:02}"),
            DateFormat::DashReordered => format!("{d:02}-{m:02}-{y:04}"),
            DateFormat::DotDelimited => format!("{y:04}.{m:02}.{d:02}"),
            DateFormat::Compact => format!("{y:04}{m:02}{d:02}"),
        }
    }
}

/// Classify a non-empty value into its bucket
pub fn classify(value: &str) -> DateFormat {
    DateFormat::precedence()
        .iter()
        .copied()
        .find(|fmt| fmt.parse(value).is_some())
        .unwrap_or(DateFormat::Unparseable)
}

/// Parse under every bucket in precedence order
pub fn parse_any(value: &str) -> Option<(DateFormat, NaiveDate)> {
    DateFormat::precedence()
        .iter()
        .find_map(|fmt| fmt.parse(value).map(|d| (*fmt, d)))
}

/// Canonical rendering (`YYYY-MM-DD`)
pub fn canonical(date: NaiveDate) -> String {
    DateFormat::IsoDate.render(date, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date")
    }

    #[test]
    fn test_classify_each_bucket() {
        assert_eq!(classify("2024-03-05"), DateFormat::IsoDate);
        assert_eq!(classify("2024-03-05T14:20:00"), DateFormat::IsoTimestamp);
        assert_eq!(classify("2024-03-05 14:20:00"), DateFormat::IsoTimestamp);
        assert_eq!(classify("2024/03/05"), DateFormat::SlashDelimited);
        assert_eq!(classify("05-03-2024"), DateFormat::DashReordered);
        assert_eq!(classify("2024.03.05"), DateFormat::DotDelimited);
        assert_eq!(classify("20240305"), DateFormat::Compact);
        assert_eq!(classify("March 5th"), DateFormat::Unparseable);
        assert_eq!(classify("2024-02-30"), DateFormat::Unparseable);
    }

    #[test]
    fn test_render_then_parse_recovers_date() {
        for fmt in DateFormat::variants() {
            let text = fmt.render(day(), 9, 45);
            assert_eq!(parse_any(&text), Some((*fmt, day())), "bucket {}", fmt.name());
        }
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(canonical(day()), "2024-03-05");
    }

    #[test]
    fn test_timestamp_rejects_bad_clock() {
        assert_eq!(classify("2024-03-05T25:00:00"), DateFormat::Unparseable);
    }
}
