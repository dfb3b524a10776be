//! Symmetric token cipher for cluster credentials at rest.
//!
//! Admin and metric tokens are stored as a single string:
//!
//! ```text
//! hex(iv) ":" hex(tag) ":" hex(ciphertext)
//! ```
//!
//! # Security model
//!
//! - AES-256-GCM with a 16-byte IV and a 128-bit tag.
//! - Every encryption draws a fresh IV from `OsRng`; encryption is not
//!   deterministic.
//! - The 32-byte key is provided once at startup and zeroized on drop.
//! - The wire format carries no version tag. Changing the algorithm or the
//!   encoding makes existing ciphertexts unreadable.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce, Tag};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CipherError;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// IV length in bytes.
const IV_LEN: usize = 16;

/// Authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit cipher key that is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from its configuration value.
    ///
    /// Accepts exactly 32 raw bytes, or exactly 64 hex characters decoding to
    /// 32 bytes. Anything else is rejected; short keys are never padded and
    /// long keys are never truncated.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] for any other length.
    pub fn from_config(value: &str) -> Result<Self, CipherError> {
        let raw = value.as_bytes();
        if raw.len() == KEY_LEN {
            let mut bytes = [0u8; KEY_LEN];
            bytes.copy_from_slice(raw);
            return Ok(Self(bytes));
        }

        if raw.len() == KEY_LEN * 2 {
            if let Ok(mut decoded) = hex::decode(value) {
                let mut bytes = [0u8; KEY_LEN];
                bytes.copy_from_slice(&decoded);
                decoded.zeroize();
                return Ok(Self(bytes));
            }
        }

        Err(CipherError::InvalidKeyLength { actual: raw.len() })
    }

    /// Generate a random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn cipher(&self) -> Aes256Gcm16 {
        Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(&self.0))
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A decrypted credential. Zeroized on drop and redacted in `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Borrow the plaintext. The caller must not log or persist it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

/// Encrypts and decrypts credential strings under the process-wide key.
#[derive(Debug, Clone)]
pub struct TokenCipher {
    key: CipherKey,
}

impl TokenCipher {
    #[must_use]
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` with a fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encryption`] if the AEAD operation fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .key
            .cipher()
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|e| CipherError::Encryption {
                reason: e.to_string(),
            })?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(&buffer)
        ))
    }

    /// Decrypt a wire string produced by [`encrypt`](Self::encrypt).
    ///
    /// An empty input yields an empty string without touching the cipher,
    /// which lets optional token fields pass through unchanged.
    ///
    /// # Errors
    ///
    /// - [`CipherError::InvalidFormat`] if the input is not three
    ///   `:`-separated hex segments with a 16-byte IV and a 16-byte tag, or
    ///   the plaintext is not UTF-8.
    /// - [`CipherError::AuthenticationFailure`] if the tag does not verify.
    pub fn decrypt(&self, wire: &str) -> Result<String, CipherError> {
        if wire.is_empty() {
            return Ok(String::new());
        }

        let segments: Vec<&str> = wire.split(':').collect();
        let [iv_hex, tag_hex, ciphertext_hex] = segments.as_slice() else {
            return Err(CipherError::InvalidFormat {
                reason: format!("expected 3 segments, got {}", segments.len()),
            });
        };

        if iv_hex.is_empty() || tag_hex.is_empty() {
            return Err(CipherError::InvalidFormat {
                reason: "empty iv or tag segment".to_owned(),
            });
        }

        let iv = decode_segment("iv", iv_hex, Some(IV_LEN))?;
        let tag = decode_segment("tag", tag_hex, Some(TAG_LEN))?;
        let mut buffer = decode_segment("ciphertext", ciphertext_hex, None)?;

        self.key
            .cipher()
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::<U16>::from_slice(&tag),
            )
            .map_err(|_| CipherError::AuthenticationFailure)?;

        String::from_utf8(buffer).map_err(|_| CipherError::InvalidFormat {
            reason: "plaintext is not valid UTF-8".to_owned(),
        })
    }

    /// Decrypt straight into a [`SecretToken`].
    ///
    /// # Errors
    ///
    /// Same as [`decrypt`](Self::decrypt).
    pub fn decrypt_token(&self, wire: &str) -> Result<SecretToken, CipherError> {
        self.decrypt(wire).map(SecretToken::new)
    }
}

fn decode_segment(
    name: &str,
    segment: &str,
    expected_len: Option<usize>,
) -> Result<Vec<u8>, CipherError> {
    let bytes = hex::decode(segment).map_err(|e| CipherError::InvalidFormat {
        reason: format!("{name} is not valid hex: {e}"),
    })?;

    match expected_len {
        Some(len) if bytes.len() != len => Err(CipherError::InvalidFormat {
            reason: format!("{name} must be {len} bytes, got {}", bytes.len()),
        }),
        _ => Ok(bytes),
    }
}
