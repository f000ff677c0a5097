//! Webhook signature verification
//!
//! Telnyx signs `"{timestamp}|{raw body}"` with Ed25519 and sends the
//! base64 signature in `telnyx-signature-ed25519` and the unix timestamp in
//! `telnyx-timestamp`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "telnyx-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "telnyx-timestamp";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("public key is not valid base64 Ed25519: {0}")]
    InvalidPublicKey(String),

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed timestamp")]
    InvalidTimestamp,

    #[error("timestamp outside tolerance ({0}s)")]
    Expired(i64),

    #[error("malformed signature")]
    InvalidEncoding,

    #[error("signature does not match")]
    Mismatch,

    #[error("no webhook public key configured")]
    NoKeyConfigured,
}

/// Authenticates inbound vendor callbacks
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    key: Option<VerifyingKey>,
    allow_unsigned: bool,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(
        public_key: Option<&str>,
        allow_unsigned: bool,
        tolerance_secs: u64,
    ) -> Result<Self, SignatureError> {
        let key = public_key.map(parse_public_key).transpose()?;

        Ok(Self {
            key,
            allow_unsigned,
            tolerance_secs: tolerance_secs.min(i64::MAX as u64) as i64,
        })
    }

    /// Whether a public key is loaded
    pub fn is_enforcing(&self) -> bool {
        self.key.is_some()
    }

    /// Verify a webhook against the current time
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        self.verify_at(timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let Some(key) = &self.key else {
            return if self.allow_unsigned {
                Ok(())
            } else {
                Err(SignatureError::NoKeyConfigured)
            };
        };

        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if (now - sent_at).abs() > self.tolerance_secs {
            return Err(SignatureError::Expired(self.tolerance_secs));
        }

        let signature_bytes = BASE64
            .decode(signature.trim())
            .map_err(|_| SignatureError::InvalidEncoding)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| SignatureError::InvalidEncoding)?;

        let mut signed = Vec::with_capacity(timestamp.len() + 1 + body.len());
        signed.extend_from_slice(timestamp.trim().as_bytes());
        signed.push(b'|');
        signed.extend_from_slice(body);

        key.verify(&signed, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}

fn parse_public_key(encoded: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidPublicKey("expected 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    const NOW: i64 = 1_760_000_000;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn verifier() -> WebhookVerifier {
        let public = BASE64.encode(signing_key().verifying_key().to_bytes());
        WebhookVerifier::new(Some(&public), false, 300).unwrap()
    }

    fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = format!("{}|", timestamp).into_bytes();
        message.extend_from_slice(body);
        BASE64.encode(signing_key().sign(&message).to_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"data":{"event_type":"call.hangup"}}"#;
        let ts = NOW.to_string();
        let sig = sign(&ts, body);
        assert_eq!(verifier().verify_at(Some(&ts), Some(&sig), body, NOW), Ok(()));
    }

    #[test]
    fn test_tampered_body_fails() {
        let ts = NOW.to_string();
        let sig = sign(&ts, b"original");
        assert_eq!(
            verifier().verify_at(Some(&ts), Some(&sig), b"tampered", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let ts = (NOW - 301).to_string();
        let sig = sign(&ts, b"body");
        assert_eq!(
            verifier().verify_at(Some(&ts), Some(&sig), b"body", NOW),
            Err(SignatureError::Expired(300))
        );
    }

    #[test]
    fn test_missing_headers_fail() {
        let v = verifier();
        assert_eq!(
            v.verify_at(None, Some("sig"), b"body", NOW),
            Err(SignatureError::MissingHeader(TIMESTAMP_HEADER))
        );
        assert_eq!(
            v.verify_at(Some("1"), None, b"body", NOW),
            Err(SignatureError::MissingHeader(SIGNATURE_HEADER))
        );
        assert_eq!(
            v.verify_at(Some(&NOW.to_string()), Some("not base64!"), b"body", NOW),
            Err(SignatureError::InvalidEncoding)
        );
    }

    #[test]
    fn test_without_key_follows_allow_unsigned() {
        let strict = WebhookVerifier::new(None, false, 300).unwrap();
        assert_eq!(
            strict.verify_at(None, None, b"body", NOW),
            Err(SignatureError::NoKeyConfigured)
        );
        assert!(!strict.is_enforcing());

        let open = WebhookVerifier::new(None, true, 300).unwrap();
        assert_eq!(open.verify_at(None, None, b"body", NOW), Ok(()));
    }

    #[test]
    fn test_bad_public_key_rejected() {
        assert!(matches!(
            WebhookVerifier::new(Some("c2hvcnQ="), false, 300),
            Err(SignatureError::InvalidPublicKey(_))
        ));
    }
}
