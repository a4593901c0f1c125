//! Message signing for signed URLs.
//!
//! # Responsibilities
//! - Define the encryption collaborator contract (`encrypt`/`decrypt`)
//! - Provide an HMAC-SHA256 implementation keyed by the application key
//!
//! # Design Decisions
//! - `MessageVerifier` signs, it does not hide: the payload is base64url
//!   encoded and readable. Tamper detection is what signed URLs need
//! - `decrypt` returns `None` on any mismatch; it never errors
//! - MAC comparison is constant-time

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Encryption collaborator used by signed URLs.
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, value: &str) -> String;

    /// `None` when the value was not produced by this encrypter.
    fn decrypt(&self, value: &str) -> Option<String>;
}

/// HMAC-SHA256 message verifier: `base64url(payload).base64url(mac)`.
#[derive(Clone)]
pub struct MessageVerifier {
    key: Vec<u8>,
}

impl MessageVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can accept keys of any length");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for MessageVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageVerifier").finish_non_exhaustive()
    }
}

impl Encrypter for MessageVerifier {
    fn encrypt(&self, value: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(value.as_bytes());
        let mac = URL_SAFE_NO_PAD.encode(self.mac(&payload));
        format!("{}.{}", payload, mac)
    }

    fn decrypt(&self, value: &str) -> Option<String> {
        let (payload, mac) = value.split_once('.')?;
        let provided = URL_SAFE_NO_PAD.decode(mac).ok()?;
        let expected = self.mac(payload);
        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        String::from_utf8(bytes).ok()
    }
}
