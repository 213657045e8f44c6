// Shared types for ntp-time-server
use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TimeError;

pub const FALLBACK_MARKER: &str = " (local fallback)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Remote,
    LocalFallback,
}

/// An instant together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTime {
    pub instant: DateTime<Utc>,
    pub source: TimeSource,
}

/// The zone an instant should be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetZone {
    Named(Tz),
    Local,
}

impl TargetZone {
    /// Validate an optional IANA zone name. Lookup ignores case; the
    /// canonical spelling is kept for display.
    pub fn parse(zone: Option<&str>) -> Result<Self, TimeError> {
        match zone {
            None => Ok(TargetZone::Local),
            Some(name) => Tz::from_str_insensitive(name)
                .map(TargetZone::Named)
                .map_err(|_| TimeError::UnknownZone(name.to_string())),
        }
    }
}

/// The externally visible form of a resolved time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTime {
    pub date: String,
    pub time: String,
    pub zone_label: String,
}

impl RenderedTime {
    /// Render `resolved` in `zone`. Sub-second precision is truncated.
    pub fn render(resolved: &ResolvedTime, zone: Tz) -> Self {
        let local = resolved.instant.with_timezone(&zone);
        let zone_label = match resolved.source {
            TimeSource::Remote => zone.name().to_string(),
            TimeSource::LocalFallback => format!("{}{FALLBACK_MARKER}", zone.name()),
        };
        Self {
            date: local.format("%Y-%m-%d").to_string(),
            time: local.format("%H:%M:%S").to_string(),
            zone_label,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.zone_label.ends_with(FALLBACK_MARKER)
    }
}

impl fmt::Display for RenderedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Date:{}\nTime:{}\nTimezone:{}",
            self.date, self.time, self.zone_label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(rfc3339: &str, source: TimeSource) -> ResolvedTime {
        ResolvedTime {
            instant: DateTime::parse_from_rfc3339(rfc3339)
                .expect("valid timestamp")
                .with_timezone(&Utc),
            source,
        }
    }

    #[test]
    fn renders_exact_contract() {
        let resolved = at("2025-07-25T14:30:25Z", TimeSource::Remote);
        let rendered = RenderedTime::render(&resolved, Tz::UTC);
        assert_eq!(
            rendered.to_string(),
            "Date:2025-07-25\nTime:14:30:25\nTimezone:UTC"
        );
        assert!(!rendered.is_fallback());
    }

    #[test]
    fn fallback_label_carries_marker() {
        let resolved = at("2025-07-25T14:30:25Z", TimeSource::LocalFallback);
        let rendered = RenderedTime::render(&resolved, chrono_tz::Europe::Berlin);
        assert_eq!(
            rendered.to_string(),
            "Date:2025-07-25\nTime:16:30:25\nTimezone:Europe/Berlin (local fallback)"
        );
        assert!(rendered.is_fallback());
    }

    #[test]
    fn rendering_is_repeatable() {
        let resolved = at("2024-02-29T08:05:09.123Z", TimeSource::Remote);
        let first = RenderedTime::render(&resolved, chrono_tz::Asia::Tokyo).to_string();
        let second = RenderedTime::render(&resolved, chrono_tz::Asia::Tokyo).to_string();
        assert_eq!(first, second);
        assert_eq!(first, "Date:2024-02-29\nTime:17:05:09\nTimezone:Asia/Tokyo");
    }

    #[test]
    fn midnight_rollover_uses_converted_date() {
        let instant = Utc
            .with_ymd_and_hms(2025, 12, 31, 23, 59, 59)
            .single()
            .expect("valid date")
            + chrono::TimeDelta::milliseconds(900);
        let resolved = ResolvedTime {
            instant,
            source: TimeSource::Remote,
        };

        let ahead = RenderedTime::render(&resolved, chrono_tz::Pacific::Auckland);
        assert_eq!(ahead.date, "2026-01-01");
        assert_eq!(ahead.time, "12:59:59");

        let behind = RenderedTime::render(&resolved, chrono_tz::America::Los_Angeles);
        assert_eq!(behind.date, "2025-12-31");
        assert_eq!(behind.time, "15:59:59");

        let utc = RenderedTime::render(&resolved, Tz::UTC);
        assert_eq!(utc.date, "2025-12-31");
        assert_eq!(utc.time, "23:59:59");
    }

    #[test]
    fn zone_lookup_is_case_insensitive_but_label_canonical() {
        let zone = TargetZone::parse(Some("america/new_york")).expect("known zone");
        assert_eq!(zone, TargetZone::Named(chrono_tz::America::New_York));
        assert_eq!(TargetZone::parse(Some("utc")), Ok(TargetZone::Named(Tz::UTC)));
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert_eq!(
            TargetZone::parse(Some("NotAZone")),
            Err(TimeError::UnknownZone("NotAZone".to_string()))
        );
        assert_eq!(TargetZone::parse(None), Ok(TargetZone::Local));
    }
}
