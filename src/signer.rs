//! HMAC-SHA256 request signer (spec.md §4.B).
//!
//! The path passed in must be byte-identical to the path on the request
//! line (including the query string) — any drift invalidates the signature.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs requests for a single credential set.
pub struct Signer {
    secret: String,
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Render the current time as `YYYY-MM-DDTHH:MM:SS.sssZ`, millisecond
    /// precision, UTC — the exact format OKX requires for `OK-ACCESS-TIMESTAMP`.
    /// Any drift from this format, including missing milliseconds, invalidates
    /// every request signed against it.
    pub fn timestamp_now() -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    /// `base64(HMAC-SHA256(secret, timestamp + method + path + body))`.
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let message = format!("{timestamp}{method}{path}{body}");
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts a key of any size");
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let signer = Signer::new("my-secret");
        let a = signer.sign("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/balance", "");
        let b = signer.sign("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/balance", "");
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_any_input() {
        let signer = Signer::new("my-secret");
        let base = signer.sign("2024-01-01T00:00:00.000Z", "GET", "/path", "");
        assert_ne!(base, signer.sign("2024-01-01T00:00:00.001Z", "GET", "/path", ""));
        assert_ne!(base, signer.sign("2024-01-01T00:00:00.000Z", "POST", "/path", ""));
        assert_ne!(base, signer.sign("2024-01-01T00:00:00.000Z", "GET", "/other", ""));
        assert_ne!(base, signer.sign("2024-01-01T00:00:00.000Z", "GET", "/path", "{}"));
    }

    #[test]
    fn timestamp_format_has_millisecond_precision_and_z_suffix() {
        let ts = Signer::timestamp_now();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert_eq!(ts.as_bytes()[ts.len() - 4], b'.');
    }
}
