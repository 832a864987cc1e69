//! Collector configuration.
//!
//! Options arrive as host-style key/value pairs (`Fifo`, `Headings`,
//! `Interval`); keys are matched case-insensitively.

use std::path::PathBuf;

/// Default location of the data pipe.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/tridentfifo";

/// Default location of the headings side-file.
pub const DEFAULT_HEADINGS_PATH: &str = "/tmp/tridentheadings";

/// Default sampling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Error type for configuration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The option key is not recognized.
    UnknownKey(String),
    /// The option value is malformed.
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownKey(key) => write!(f, "unknown option '{}'", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for option '{}'", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Locations and default interval used by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TridentConfig {
    pub fifo_path: PathBuf,
    pub headings_path: PathBuf,
    /// Interval reported when none can be inferred. Always at least 1.
    pub interval_secs: u64,
}

impl Default for TridentConfig {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            headings_path: PathBuf::from(DEFAULT_HEADINGS_PATH),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl TridentConfig {
    /// Applies one option.
    pub fn apply_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "fifo" => self.fifo_path = PathBuf::from(value),
            "headings" => self.headings_path = PathBuf::from(value),
            "interval" => {
                self.interval_secs = parse_interval(value).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Applies every option in order. Nothing is changed if any option fails.
    pub fn apply_options<K, V>(&mut self, options: &[(K, V)]) -> Result<(), ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut next = self.clone();
        for (key, value) in options {
            next.apply_option(key.as_ref(), value.as_ref())?;
        }
        *self = next;
        Ok(())
    }
}

/// Parses `Key=Value` as accepted on the command line.
pub fn parse_option_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty option name in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_interval(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|&secs| secs >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TridentConfig::default();
        assert_eq!(config.fifo_path, PathBuf::from("/tmp/tridentfifo"));
        assert_eq!(config.headings_path, PathBuf::from("/tmp/tridentheadings"));
        assert_eq!(config.interval_secs, 10);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut config = TridentConfig::default();
        config.apply_option("FIFO", "/run/trident.fifo").unwrap();
        config.apply_option("Headings", "/run/trident.headings").unwrap();
        config.apply_option("interval", " 30 ").unwrap();
        assert_eq!(config.fifo_path, PathBuf::from("/run/trident.fifo"));
        assert_eq!(config.headings_path, PathBuf::from("/run/trident.headings"));
        assert_eq!(config.interval_secs, 30);
    }

    #[test]
    fn test_invalid_interval() {
        let mut config = TridentConfig::default();
        for bad in ["0", "-5", "ten", ""] {
            let err = config.apply_option("Interval", bad).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
        }
        assert_eq!(config.interval_secs, 10);
    }

    #[test]
    fn test_unknown_key() {
        let mut config = TridentConfig::default();
        assert_eq!(
            config.apply_option("Socket", "1"),
            Err(ConfigError::UnknownKey("Socket".to_string()))
        );
    }

    #[test]
    fn test_apply_options_is_atomic() {
        let mut config = TridentConfig::default();
        let err = config
            .apply_options(&[("Fifo", "/a"), ("Interval", "x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(config, TridentConfig::default());

        config
            .apply_options(&[("Fifo", "/a"), ("Interval", "5")])
            .unwrap();
        assert_eq!(config.fifo_path, PathBuf::from("/a"));
        assert_eq!(config.interval_secs, 5);
    }

    #[test]
    fn test_parse_option_pair() {
        assert_eq!(
            parse_option_pair("Fifo=/tmp/x").unwrap(),
            ("Fifo".to_string(), "/tmp/x".to_string())
        );
        assert!(parse_option_pair("Fifo").is_err());
        assert!(parse_option_pair("=x").is_err());
    }
}
