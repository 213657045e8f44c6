// Time resolution: remote authority first, local clock as fallback.
// resolve() never fails; every exit is one of the three Resolution states.
use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TimeSourceConfig;
use crate::error::TimeError;
use crate::ntp::{NtpClient, SntpClient};
use crate::retry::RetryPolicy;
use crate::types::{RenderedTime, ResolvedTime, TargetZone, TimeSource};

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Remote(RenderedTime),
    Fallback(RenderedTime),
    Failed(TimeError),
}

impl Resolution {
    pub fn source(&self) -> Option<TimeSource> {
        match self {
            Resolution::Remote(_) => Some(TimeSource::Remote),
            Resolution::Fallback(_) => Some(TimeSource::LocalFallback),
            Resolution::Failed(_) => None,
        }
    }

    pub fn into_text(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Remote(rendered) | Resolution::Fallback(rendered) => rendered.fmt(f),
            Resolution::Failed(e) => e.fmt(f),
        }
    }
}

pub struct TimeResolver {
    client: Arc<dyn NtpClient>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl Default for TimeResolver {
    fn default() -> Self {
        Self::new(
            Arc::new(SntpClient::default()),
            Arc::new(SystemClock),
            RetryPolicy::default(),
        )
    }
}

impl TimeResolver {
    pub fn new(client: Arc<dyn NtpClient>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            client,
            clock,
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn resolve(&self, config: &TimeSourceConfig) -> Resolution {
        let zone = match TargetZone::parse(config.zone.as_deref()) {
            Ok(zone) => zone,
            Err(e) => {
                warn!(zone = ?config.zone, "rejecting unknown time zone");
                return Resolution::Failed(e);
            }
        };

        let host = config.host.as_str();
        let remote = self
            .retry
            .run(
                |attempt| {
                    debug!(host, attempt, "querying NTP server");
                    self.client.query(host)
                },
                TimeError::is_transient,
            )
            .await;

        match remote {
            Ok(instant) => {
                info!(host, %instant, "NTP time retrieved");
                let resolved = ResolvedTime {
                    instant,
                    source: TimeSource::Remote,
                };
                match self.render(&resolved, zone) {
                    Ok(rendered) => Resolution::Remote(rendered),
                    Err(e) => self.fail(e),
                }
            }
            Err(e) => {
                warn!(
                    host,
                    attempts = self.retry.max_attempts,
                    error = %e,
                    "NTP failed, falling back to local time"
                );
                self.fallback(zone)
            }
        }
    }

    fn fallback(&self, zone: TargetZone) -> Resolution {
        let rendered = self.clock.now().and_then(|instant| {
            let resolved = ResolvedTime {
                instant,
                source: TimeSource::LocalFallback,
            };
            self.render(&resolved, zone)
        });
        match rendered {
            Ok(rendered) => Resolution::Fallback(rendered),
            Err(e) => self.fail(e),
        }
    }

    fn render(&self, resolved: &ResolvedTime, zone: TargetZone) -> Result<RenderedTime, TimeError> {
        let tz: Tz = match zone {
            TargetZone::Named(tz) => tz,
            TargetZone::Local => self.clock.local_zone()?,
        };
        Ok(RenderedTime::render(resolved, tz))
    }

    // Anything that reaches here is reported as the generic terminal error.
    fn fail(&self, e: TimeError) -> Resolution {
        let e = match e {
            TimeError::TimeUnavailable(_) => e,
            other => TimeError::TimeUnavailable(other.to_string()),
        };
        error!(error = %e, "failed to get time");
        Resolution::Failed(e)
    }
}
