//! HMAC-SHA256 message signing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// Signer
// ============================================================================

/// Signs payload bytes with the app secret.
///
/// Signatures are the Base64 (standard alphabet, padded) encoding of the
/// 32-byte HMAC-SHA256 digest.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    /// Creates a signer keyed by `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Signs `message`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signature`] if the MAC cannot be keyed.
    pub fn sign(&self, message: &[u8]) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Checks `signature` against `message` in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signature`] if the signature is not valid Base64 or
    /// does not match.
    pub fn verify(&self, message: &[u8], signature: &str) -> Result<()> {
        let expected = STANDARD
            .decode(signature)
            .map_err(|e| Error::signature(format!("Signature is not Base64: {e}")))?;

        let mut mac = self.mac()?;
        mac.update(message);
        mac.verify_slice(&expected)
            .map_err(|_| Error::signature("Signature mismatch"))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::signature(format!("Invalid HMAC key: {e}")))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_case_2() {
        let signer = Signer::new("Jefe");
        let signature = signer.sign(b"what do ya want for nothing?").unwrap();
        let digest = STANDARD.decode(&signature).unwrap();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        assert_eq!(signature.len(), 44);
        assert!(signature.ends_with('='));
    }

    #[test]
    fn test_verify_round_trip() {
        let signer = Signer::new("secret");
        let signature = signer.sign(b"{\"a\":1}").unwrap();
        signer.verify(b"{\"a\":1}", &signature).unwrap();
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signer = Signer::new("secret");
        let signature = signer.sign(b"{\"a\":1}").unwrap();
        assert!(matches!(
            signer.verify(b"{\"a\": 1}", &signature),
            Err(Error::Signature { .. })
        ));
        assert!(Signer::new("other").verify(b"{\"a\":1}", &signature).is_err());
        assert!(signer.verify(b"{\"a\":1}", "not base64!").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", Signer::new("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
