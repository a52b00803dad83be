use thiserror::Error;

/// Top-level error type for the `mobilelink-api` crate.
///
/// Covers every failure mode across the client: credential rejection,
/// session expiry, sign-in page scraping, and plain transport trouble.
/// Hosts map these into user-facing diagnostics; the only variant with
/// retry semantics is [`SessionExpired`](Error::SessionExpired).
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Wrong username/password, or a cookie/token session the API no
    /// longer accepts and no fallback account is configured.
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// A data endpoint rejected the session. The vendor signals this with
    /// any non-200/204 status, so the raw status is kept for diagnosis.
    /// Caught exactly once by the fetch retry wrapper; a second occurrence
    /// surfaces to the caller.
    #[error("session expired (HTTP {status}) -- re-authentication required")]
    SessionExpired { status: u16 },

    // ── Sign-in flow ────────────────────────────────────────────────
    /// A sign-in page is missing the settings blob, the `csrf`/`transId`
    /// fields, or the final submit form. Always fatal for the attempt.
    #[error("sign-in page parse error: {message}")]
    ConfigParse { message: String },

    /// A sign-in step that demands exactly HTTP 200 got something else.
    #[error("{step} returned HTTP {status}, expected 200")]
    UnexpectedStatus { step: &'static str, status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    /// Never triggers the expiry retry.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON payload didn't match the expected shape, with the raw body
    /// for debugging.
    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A timestamp string matched none of the accepted vendor formats.
    #[error("no known timestamp format for {value:?} (tried {tried:?})")]
    TimestampFormat {
        value: String,
        tried: [&'static str; 2],
    },
}

impl Error {
    /// Returns `true` if this is the expiry signal the one-shot retry
    /// wrapper reacts to. Everything else is surfaced as-is.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if the credentials themselves were rejected and a
    /// retry without user correction is pointless.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials { .. })
    }
}
