use thiserror::Error;

use crate::plug::SwitchState;

/// Top-level error type for the `w215-api` crate.
///
/// Most failures never reach library consumers: the plug is a best-effort
/// telemetry source, so the public accessors absorb handshake, transport,
/// and parse failures into absent results after tracing them. The variants
/// exist for the internal `Result` plumbing and for `set_state`'s one hard
/// contract violation.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Challenge response was incomplete or unreadable.
    #[error("HNAP handshake failed: {message}")]
    Handshake { message: String },

    /// Device answered the login step with something other than `success`.
    #[error("device rejected login (LoginResult = {result:?})")]
    LoginRejected { result: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Device address did not form a valid URL.
    #[error("invalid device URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not well-formed XML.
    #[error("unparseable device response: {message}")]
    Xml { message: String },

    /// A `my_cgi.cgi` checklist line had no `key: value` shape.
    #[error("malformed statistics line: {line:?}")]
    MalformedStats { line: String },

    // ── Caller contract ─────────────────────────────────────────────
    /// `set_state` was asked for a state the plug cannot be driven to.
    #[error("cannot set plug state to {0:?}")]
    InvalidState(SwitchState),
}

impl Error {
    /// Returns `true` if this error came out of the login handshake
    /// (incomplete challenge or rejected credentials).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Handshake { .. } | Self::LoginRejected { .. })
    }

    /// Returns `true` if this is a transient failure that a fresh
    /// handshake and retry might resolve.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Xml { .. } => true,
            _ => false,
        }
    }
}
