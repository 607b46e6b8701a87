//! Error types for generation, export and configuration

/// Configuration rejected by [`Generator::start`](crate::Generator::start).
///
/// Raised before any task is spawned; never seen mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration field did not parse
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },
    /// No batching window, byte ceiling, record ceiling or total ceiling set
    Unbounded,
    /// `start` called on a generator that already handed off its producer
    AlreadyStarted,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDuration {
                field,
                value,
                reason,
            } => write!(
                f,
                "invalid configuration: {field} = {value:?} is not a duration ({reason})"
            ),
            Self::Unbounded => write!(
                f,
                "invalid configuration: one of batching, max_batch_bytes, \
                 max_batch_records or max_total_records must be set"
            ),
            Self::AlreadyStarted => write!(f, "generator already started"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure to produce a record. Fatal to the run.
#[derive(Debug)]
pub enum GenerateError {
    /// Record could not be serialized
    Encode(serde_json::Error),
    /// Producer-specific failure
    Producer(String),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "failed to encode record: {e}"),
            Self::Producer(msg) => write!(f, "producer error: {msg}"),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::Producer(_) => None,
        }
    }
}

impl From<serde_json::Error> for GenerateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

/// Failure to hand a batch to its destination
#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Destination is no longer accepting data
    Closed,
    /// Sink settings could not be turned into a working sink
    InvalidConfig(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Closed => write!(f, "sink closed"),
            Self::InvalidConfig(msg) => write!(f, "invalid sink configuration: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl SinkError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Nothing in this crate retries; sinks use this to word their logs.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            // 4xx other than 408/429 means the request itself is wrong
            Self::Http {
                status: Some(s), ..
            } => !(400..500).contains(s) || *s == 408 || *s == 429,
            Self::Http { status: None, .. } => true,
            Self::Closed | Self::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn http_err(status: u16) -> SinkError {
        SinkError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn config_error_mentions_invalid_configuration() {
        assert!(ConfigError::Unbounded
            .to_string()
            .starts_with("invalid configuration"));
        let err = ConfigError::InvalidDuration {
            field: "delay",
            value: "soon".into(),
            reason: "bad".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("invalid configuration"));
        assert!(msg.contains("delay"));
        assert!(msg.contains("\"soon\""));
    }

    #[test]
    fn generate_error_from_serde() {
        let e = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = GenerateError::from(e);
        assert!(err.to_string().starts_with("failed to encode record"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn sink_error_display() {
        assert_eq!(http_err(503).to_string(), "HTTP 503: test");
        let err = SinkError::Io(std::io::Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("IO:"));
        assert_eq!(SinkError::Closed.to_string(), "sink closed");
    }

    #[test]
    fn sink_error_server_errors_retryable() {
        assert!(http_err(500).is_retryable());
        assert!(http_err(503).is_retryable());
    }

    #[test]
    fn sink_error_client_errors_not_retryable() {
        assert!(!http_err(400).is_retryable());
        assert!(!http_err(403).is_retryable());
        assert!(http_err(408).is_retryable());
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn sink_error_io_storage_full_not_retryable() {
        let err = SinkError::Io(std::io::Error::new(ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
        let err = SinkError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "pipe"));
        assert!(err.is_retryable());
    }

    #[test]
    fn sink_error_closed_not_retryable() {
        assert!(!SinkError::Closed.is_retryable());
    }
}
