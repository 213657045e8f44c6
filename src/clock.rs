// Local clock and zone, used when the time authority cannot be reached
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::TimeError;

/// Provides the local wall-clock time and the process's own zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<DateTime<Utc>, TimeError>;

    /// The zone output is rendered in when none was requested.
    fn local_zone(&self) -> Result<Tz, TimeError>;
}

/// The operating system clock and zone configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>, TimeError> {
        Ok(Utc::now())
    }

    fn local_zone(&self) -> Result<Tz, TimeError> {
        let host_zone = match iana_time_zone::get_timezone() {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(error = %e, "host has no configured time zone, assuming UTC");
                None
            }
        };
        zone_from_host_name(host_zone.as_deref())
    }
}

/// A host without a zone setting runs on UTC; a zone name the bundled
/// database cannot resolve is an environment failure.
pub fn zone_from_host_name(name: Option<&str>) -> Result<Tz, TimeError> {
    match name {
        None => Ok(Tz::UTC),
        Some(name) => name.parse::<Tz>().map_err(|_| {
            TimeError::TimeUnavailable(format!("unresolvable local time zone '{name}'"))
        }),
    }
}
