//! Stripe webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=1700000000,v1=<hex>[,v1=<hex>...][,v0=<hex>]`.
//! Any `v1` entry may match (several appear while a secret is rolled).

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use super::types::Event;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutOfTolerance,

    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    #[error("Invalid signing secret")]
    InvalidSecret,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verifies signed deliveries against the endpoint's signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(WebhookError::MalformedHeader),
        }
    }
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify `payload` against the header and parse it as an event.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the signature does not verify or the
    /// payload is not an event.
    pub fn construct_event(&self, payload: &[u8], header: &str) -> Result<Event, WebhookError> {
        self.verify(payload, header, chrono::Utc::now().timestamp())?;
        Ok(serde_json::from_slice(payload)?)
    }

    /// Verify `payload` as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the header is malformed, the timestamp is
    /// outside the tolerance, or no `v1` signature matches.
    pub fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(header)?;

        if now.abs_diff(header.timestamp) > self.tolerance.as_secs() {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let expected = self.sign(payload, header.timestamp)?;

        if !header
            .signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            return Err(WebhookError::SignatureMismatch);
        }

        debug!(timestamp = header.timestamp, "Stripe signature verified");
        Ok(())
    }

    /// Build a `Stripe-Signature` value for `payload` signed at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSecret` if the HMAC key is rejected.
    pub fn signature_header(&self, payload: &[u8], timestamp: i64) -> Result<String, WebhookError> {
        Ok(format!("t={timestamp},v1={}", self.sign(payload, timestamp)?))
    }

    fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSecret)?;

        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;
    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(
            SecretString::from(SECRET.to_string()),
            Duration::from_secs(300),
        )
    }

    fn manual_signature(secret: &str, payload: &[u8], timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_valid_signature() {
        let header = format!("t={NOW},v1={}", manual_signature(SECRET, PAYLOAD, NOW));
        assert!(verifier().verify(PAYLOAD, &header, NOW).is_ok());
    }

    #[test]
    fn test_signature_header_round_trips() {
        let header = verifier().signature_header(PAYLOAD, NOW).unwrap();
        assert!(verifier().verify(PAYLOAD, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let header = format!(
            "t={NOW},v1={},v1={},v0=deadbeef",
            manual_signature("whsec_old", PAYLOAD, NOW),
            manual_signature(SECRET, PAYLOAD, NOW)
        );
        assert!(verifier().verify(PAYLOAD, &header, NOW).is_ok());
    }

    #[test]
    fn test_wrong_secret() {
        let header = format!("t={NOW},v1={}", manual_signature("whsec_other", PAYLOAD, NOW));
        assert!(matches!(
            verifier().verify(PAYLOAD, &header, NOW),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_modified_payload() {
        let header = format!("t={NOW},v1={}", manual_signature(SECRET, PAYLOAD, NOW));
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_2"}}}"#;
        assert!(matches!(
            verifier().verify(tampered, &header, NOW),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_timestamp_outside_tolerance() {
        let old = NOW - 301;
        let header = format!("t={old},v1={}", manual_signature(SECRET, PAYLOAD, old));
        assert!(matches!(
            verifier().verify(PAYLOAD, &header, NOW),
            Err(WebhookError::TimestampOutOfTolerance)
        ));

        let future = NOW + 301;
        let header = format!("t={future},v1={}", manual_signature(SECRET, PAYLOAD, future));
        assert!(matches!(
            verifier().verify(PAYLOAD, &header, NOW),
            Err(WebhookError::TimestampOutOfTolerance)
        ));
    }

    #[test]
    fn test_timestamp_at_tolerance_edge() {
        let edge = NOW - 300;
        let header = format!("t={edge},v1={}", manual_signature(SECRET, PAYLOAD, edge));
        assert!(verifier().verify(PAYLOAD, &header, NOW).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        let sig = manual_signature(SECRET, PAYLOAD, NOW);
        for header in [
            String::new(),
            "garbage".to_string(),
            format!("v1={sig}"),
            format!("t={NOW}"),
            format!("t=notanumber,v1={sig}"),
            format!("t={NOW},v0={sig}"),
        ] {
            assert!(
                matches!(
                    verifier().verify(PAYLOAD, &header, NOW),
                    Err(WebhookError::MalformedHeader)
                ),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_construct_event_parses_payload() {
        let now = chrono::Utc::now().timestamp();
        let header = verifier().signature_header(PAYLOAD, now).unwrap();
        let event = verifier().construct_event(PAYLOAD, &header).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "checkout.session.completed");
    }

    #[test]
    fn test_construct_event_rejects_non_event_body() {
        let payload = b"not json";
        let now = chrono::Utc::now().timestamp();
        let header = verifier().signature_header(payload, now).unwrap();
        assert!(matches!(
            verifier().construct_event(payload, &header),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
