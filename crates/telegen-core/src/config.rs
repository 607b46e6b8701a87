//! Generator run configuration: raw (as loaded) and validated forms

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Generator settings as they appear in the config file.
///
/// Durations stay as strings until [`validate`](GeneratorConfig::validate) so a
/// malformed value is reported at start, with the field name attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Pause between generated records
    pub delay: String,
    /// Batching window; "0" disables time-based flushing
    pub batching: String,
    /// Flush once the open batch exceeds this many bytes (0 = unlimited)
    pub max_batch_bytes: u64,
    /// Flush once the open batch holds this many records (0 = unlimited)
    pub max_batch_records: u64,
    /// Complete the run after this many records (0 = unlimited)
    pub max_total_records: u64,
    /// Complete the run after this long; "0" = unlimited
    pub max_runtime: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            delay: "1s".to_string(),
            batching: "10s".to_string(),
            max_batch_bytes: 0,
            max_batch_records: 0,
            max_total_records: 0,
            max_runtime: "0".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Parse durations and check that batches are bounded
    pub fn validate(&self) -> Result<BatchLimits, ConfigError> {
        let limits = BatchLimits {
            delay: parse_duration_field("delay", &self.delay)?,
            batching: parse_duration_field("batching", &self.batching)?,
            max_batch_bytes: self.max_batch_bytes,
            max_batch_records: self.max_batch_records,
            max_total_records: self.max_total_records,
            max_runtime: parse_duration_field("max_runtime", &self.max_runtime)?,
        };

        // Without one of these, nothing would ever flush (or, with zero
        // delay, the loop would spin emitting empty-ish batches)
        if limits.batching.is_zero()
            && limits.max_batch_bytes == 0
            && limits.max_batch_records == 0
            && limits.max_total_records == 0
        {
            return Err(ConfigError::Unbounded);
        }
        Ok(limits)
    }
}

/// Validated, immutable limits for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchLimits {
    pub delay: Duration,
    pub batching: Duration,
    pub max_batch_bytes: u64,
    pub max_batch_records: u64,
    pub max_total_records: u64,
    pub max_runtime: Duration,
}

/// Parse a human duration like `250ms`, `5s` or `1m 30s`.
///
/// `"0"` and the empty string mean zero (disabled).
pub fn parse_duration(value: &str) -> Result<Duration, humantime::DurationError> {
    let value = value.trim();
    if value.is_empty() || value == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value)
}

fn parse_duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delay: &str, batching: &str) -> GeneratorConfig {
        GeneratorConfig {
            delay: delay.into(),
            batching: batching.into(),
            max_batch_bytes: 0,
            max_batch_records: 0,
            max_total_records: 0,
            max_runtime: "0".into(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let limits = GeneratorConfig::default().validate().unwrap();
        assert_eq!(limits.delay, Duration::from_secs(1));
        assert_eq!(limits.batching, Duration::from_secs(10));
        assert_eq!(limits.max_runtime, Duration::ZERO);
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration(" 5s ").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5").is_err());
    }

    #[test]
    fn invalid_duration_names_field() {
        let err = config("often", "1s").validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "delay", .. }
        ));

        let mut cfg = config("1s", "1s");
        cfg.max_runtime = "forever".into();
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidDuration {
                field: "max_runtime",
                ..
            }
        ));
    }

    #[test]
    fn zero_delay_without_bounds_rejected() {
        let err = config("0", "0").validate().unwrap_err();
        assert_eq!(err, ConfigError::Unbounded);
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn nonzero_delay_without_bounds_rejected() {
        assert_eq!(
            config("1s", "0").validate().unwrap_err(),
            ConfigError::Unbounded
        );
    }

    #[test]
    fn max_runtime_alone_is_not_a_bound() {
        let mut cfg = config("1s", "0");
        cfg.max_runtime = "1m".into();
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::Unbounded);
    }

    #[test]
    fn any_single_bound_is_enough() {
        assert!(config("0", "100ms").validate().is_ok());

        let mut cfg = config("0", "0");
        cfg.max_batch_bytes = 1024;
        assert!(cfg.validate().is_ok());

        let mut cfg = config("0", "0");
        cfg.max_batch_records = 5;
        assert!(cfg.validate().is_ok());

        let mut cfg = config("0", "0");
        cfg.max_total_records = 10;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_from_toml() {
        let toml = r#"
delay = "100ms"
batching = "5s"
max_batch_bytes = 4096
max_total_records = 1000
"#;
        let cfg: GeneratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.delay, "100ms");
        assert_eq!(cfg.max_batch_bytes, 4096);
        assert_eq!(cfg.max_batch_records, 0);
        // Unset fields fall back to defaults
        assert_eq!(cfg.max_runtime, "0");
        let limits = cfg.validate().unwrap();
        assert_eq!(limits.batching, Duration::from_secs(5));
    }
}
