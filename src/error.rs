//! Error kinds for the OKX perpetual-futures client.
//!
//! One variant per severity kind in the spec's error-handling design; see
//! DESIGN.md for why this is a closed `thiserror` enum rather than an opaque
//! `anyhow::Error` — callers need to discriminate business failures
//! (`Envelope`) from infrastructure failures (`Transport`/`Http`) by code.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Client construction failed (missing/empty credentials).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The exchange envelope reported `code != "0"`.
    #[error("OKX API error [{code}]: {msg}")]
    Envelope { code: String, msg: String },

    /// HTTP status was not 200 and no envelope could be parsed from the body.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// A transport-layer fault, already exhausted its retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON, or did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A precondition the caller or the venue's contract rules require was not met.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl Error {
    /// True for transport faults whose text marks them as transient
    /// (timeout, connection reset, unexpected EOF) per the retry policy.
    pub(crate) fn is_retryable_text(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("timeout") || lower.contains("connection reset") || lower.contains("eof")
    }
}
