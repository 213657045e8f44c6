// Per-invocation configuration read from the process environment

pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";
pub const NTP_SERVER_ENV: &str = "NTP_SERVER";
pub const TZ_ENV: &str = "TZ";

/// Where to ask for the time and which zone to render it in.
///
/// Built fresh for every tool call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSourceConfig {
    pub host: String,
    pub zone: Option<String>,
}

impl Default for TimeSourceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_NTP_SERVER.to_string(),
            zone: None,
        }
    }
}

impl TimeSourceConfig {
    pub fn new(host: impl Into<String>, zone: Option<String>) -> Self {
        Self {
            host: host.into(),
            zone,
        }
    }

    /// Capture `NTP_SERVER` and `TZ` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            host: non_empty(NTP_SERVER_ENV).unwrap_or_else(|| DEFAULT_NTP_SERVER.to_string()),
            zone: non_empty(TZ_ENV),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = TimeSourceConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, TimeSourceConfig::default());
        assert_eq!(config.host, "pool.ntp.org");
        assert_eq!(config.zone, None);
    }

    #[test]
    fn reads_both_variables() {
        let config = TimeSourceConfig::from_lookup(lookup_from(&[
            ("NTP_SERVER", "time.google.com"),
            ("TZ", "America/New_York"),
        ]));
        assert_eq!(config.host, "time.google.com");
        assert_eq!(config.zone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn empty_values_are_unset() {
        let config = TimeSourceConfig::from_lookup(lookup_from(&[
            ("NTP_SERVER", ""),
            ("TZ", "  "),
        ]));
        assert_eq!(config, TimeSourceConfig::default());
    }
}
