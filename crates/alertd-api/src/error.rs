use thiserror::Error;

/// Top-level error type for the `alertd-api` crate.
///
/// Covers every failure mode of the two API surfaces: the long-lived
/// event stream and the one-shot acknowledgment/resume commands.
/// `alertd-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Commands ────────────────────────────────────────────────────
    /// The hub answered a command with a non-success status.
    #[error("Command rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    // ── Event stream ────────────────────────────────────────────────
    /// The event stream could not be opened.
    #[error("Event stream connection failed: {0}")]
    StreamConnect(String),

    /// The event stream consumer went away.
    #[error("Event stream receiver closed")]
    StreamClosed,
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::StreamConnect(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
