//! State codec: every string field encrypted on its own.
//!
//! The encrypted form has the same JSON shape as the plaintext state, with
//! each owner group id, source URL, address and previous address replaced by
//! a token:
//!
//! ```text
//! token = base64url_nopad( 0x01 || nonce[12] || AES-256-GCM(ciphertext || tag[16]) )
//! ```
//!
//! The key is a base64 encoded 32-byte secret read from the environment. The
//! codec never generates or stores it.

use std::env;
use std::fmt;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use thiserror::Error;

use super::GenerationState;

/// Token format version.
const TOKEN_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encryption key is not set (expected environment variable `{0}`)")]
    KeyUnavailable(String),

    #[error("encryption key must be 32 bytes encoded as base64")]
    InvalidKey,

    #[error("encrypted state is not valid JSON")]
    Malformed(#[source] serde_json::Error),

    #[error("encrypted field is not a valid token")]
    InvalidToken,

    #[error("encrypted field failed authentication (wrong key or tampered state)")]
    Authentication,

    #[error("decrypted field is not UTF-8")]
    Utf8,

    #[error("failed to encrypt state")]
    Encrypt,
}

/// Symmetric key for state encryption.
#[derive(Clone)]
pub struct StateKey {
    cipher: Aes256Gcm,
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateKey(<redacted>)")
    }
}

impl StateKey {
    /// Read the key from environment variable `var`.
    ///
    /// A missing or empty variable is [`CodecError::KeyUnavailable`].
    pub fn from_env(var: &str) -> Result<Self, CodecError> {
        match env::var(var) {
            Ok(value) if !value.trim().is_empty() => Self::from_base64(&value),
            _ => Err(CodecError::KeyUnavailable(var.to_string())),
        }
    }

    /// Parse a base64 key, accepting URL-safe and standard alphabets, padded or not.
    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        let encoded = encoded.trim();
        let bytes = [URL_SAFE, URL_SAFE_NO_PAD, STANDARD, STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(encoded).ok())
            .ok_or(CodecError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != KEY_LEN {
            return Err(CodecError::InvalidKey);
        }
        let key = Key::<Aes256Gcm>::from_slice(bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt one field into a token. A fresh nonce is drawn per call.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CodecError::Encrypt)?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Decrypt and authenticate one token.
    pub fn decrypt_field(&self, token: &str) -> Result<String, CodecError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim().trim_end_matches('='))
            .map_err(|_| CodecError::InvalidToken)?;
        if raw.len() < 1 + NONCE_LEN + TAG_LEN || raw[0] != TOKEN_VERSION {
            return Err(CodecError::InvalidToken);
        }

        let (nonce, ciphertext) = raw[1..].split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::<U12>::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Authentication)?;
        String::from_utf8(plaintext).map_err(|_| CodecError::Utf8)
    }
}

/// Encrypt every field of `state` and serialize it as JSON.
pub fn encode(state: &GenerationState, key: &StateKey) -> Result<Vec<u8>, CodecError> {
    let encrypted = state.try_map_strings(|field| key.encrypt_field(field))?;
    serde_json::to_vec(&encrypted).map_err(|_| CodecError::Encrypt)
}

/// Parse an encrypted blob and decrypt every field.
///
/// Any malformed, tampered, or foreign-key blob fails as a whole.
pub fn decode(blob: &[u8], key: &StateKey) -> Result<GenerationState, CodecError> {
    let encrypted: GenerationState = serde_json::from_slice(blob).map_err(CodecError::Malformed)?;
    encrypted.try_map_strings(|token| key.decrypt_field(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PublishedRedirect;

    fn key(byte: u8) -> StateKey {
        StateKey::from_bytes(&[byte; KEY_LEN]).unwrap()
    }

    fn sample() -> GenerationState {
        let mut state = GenerationState::new();
        state.extend_group(
            "teamA",
            vec![
                PublishedRedirect::new("https://x.test/banner.png", "a1.png"),
                PublishedRedirect::new("https://x.test/info", "b2/index.html")
                    .with_previous("b2/index.html"),
            ],
        );
        state.extend_group("teamb", vec![PublishedRedirect::new("https://y.test", "c3/index.html")]);
        state
    }

    #[test]
    fn test_roundtrip() {
        let state = sample();
        let blob = encode(&state, &key(7)).unwrap();
        assert_eq!(decode(&blob, &key(7)).unwrap(), state);
    }

    #[test]
    fn test_roundtrip_empty_state() {
        let blob = encode(&GenerationState::new(), &key(1)).unwrap();
        assert_eq!(blob, b"{}");
        assert!(decode(&blob, &key(1)).unwrap().is_empty());
    }

    #[test]
    fn test_encrypted_form_hides_plaintext() {
        let blob = encode(&sample(), &key(7)).unwrap();
        let text = String::from_utf8(blob).unwrap();
        assert!(!text.contains("teamA"));
        assert!(!text.contains("x.test"));
        assert!(!text.contains("index.html"));
        assert!(text.contains("\"from\""));
        assert!(text.contains("\"previous_to\""));
    }

    #[test]
    fn test_same_plaintext_different_tokens() {
        let k = key(3);
        assert_ne!(k.encrypt_field("same").unwrap(), k.encrypt_field("same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let blob = encode(&sample(), &key(7)).unwrap();
        assert!(matches!(decode(&blob, &key(8)), Err(CodecError::Authentication)));
    }

    #[test]
    fn test_tampered_token_fails() {
        let k = key(9);
        let token = k.encrypt_field("https://x.test").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        assert!(matches!(k.decrypt_field(&tampered), Err(CodecError::Authentication)));
    }

    #[test]
    fn test_malformed_blob() {
        assert!(matches!(decode(b"<html>404</html>", &key(1)), Err(CodecError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"not-a-token": []}"#, &key(1)),
            Err(CodecError::InvalidToken)
        ));
    }

    #[test]
    fn test_key_parsing() {
        let encoded = URL_SAFE.encode([5u8; KEY_LEN]);
        assert!(StateKey::from_base64(&encoded).is_ok());
        assert!(StateKey::from_base64(&STANDARD_NO_PAD.encode([5u8; KEY_LEN])).is_ok());
        assert!(matches!(
            StateKey::from_base64(&URL_SAFE.encode([5u8; 16])),
            Err(CodecError::InvalidKey)
        ));
        assert!(matches!(StateKey::from_base64("%%%"), Err(CodecError::InvalidKey)));
    }

    #[test]
    fn test_key_unavailable() {
        let err = StateKey::from_env("REDIRKIT_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, CodecError::KeyUnavailable(ref var) if var.contains("NEVER_SET")));
    }

    #[test]
    fn test_debug_redacts_key() {
        assert_eq!(format!("{:?}", key(1)), "StateKey(<redacted>)");
    }
}
