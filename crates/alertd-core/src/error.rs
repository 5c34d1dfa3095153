// ── Core error types ──
//
// User-facing errors from alertd-core. Consumers never see raw reqwest
// errors; the `From<alertd_api::Error>` impl translates transport
// failures into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach alert hub at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to the alert hub timed out")]
    Timeout,

    // ── Command errors ───────────────────────────────────────────────
    #[error("Hub rejected the command (HTTP {status}): {message}")]
    CommandRejected { status: u16, message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            Self::CommandRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<alertd_api::Error> for CoreError {
    fn from(err: alertd_api::Error) -> Self {
        match err {
            alertd_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            alertd_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            alertd_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            alertd_api::Error::Rejected { status, body } => CoreError::CommandRejected {
                status,
                message: if body.trim().is_empty() {
                    "no response body".into()
                } else {
                    body
                },
            },
            alertd_api::Error::StreamConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            alertd_api::Error::StreamClosed => {
                CoreError::Internal("event stream receiver closed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_maps_to_command_rejected() {
        let err = CoreError::from(alertd_api::Error::Rejected {
            status: 502,
            body: String::new(),
        });
        assert!(matches!(
            err,
            CoreError::CommandRejected { status: 502, ref message } if message == "no response body"
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn tls_errors_are_configuration_errors() {
        let err = CoreError::from(alertd_api::Error::Tls("bad pem".into()));
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn stream_connect_is_connection_failure() {
        let err = CoreError::from(alertd_api::Error::StreamConnect("HTTP 503".into()));
        assert!(matches!(err, CoreError::ConnectionFailed { ref reason, .. } if reason == "HTTP 503"));
    }
}
