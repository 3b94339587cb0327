//! Frame encryption for client-to-server frames.
//!
//! Each plaintext is padded with PKCS7 and encrypted with AES-128-CBC under
//! the shared key and a fresh random IV. The IV is prepended to the
//! ciphertext and the whole thing is base64-encoded (standard alphabet, with
//! padding) for transport.

use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::LinkError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Shared key length in bytes.
pub const KEY_LEN: usize = 16;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// AES-128-CBC cipher bound to the shared secret.
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
}

impl Cipher {
    /// Build a cipher from the raw shared key.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidKey`] unless the key is exactly 16 bytes.
    pub fn new(key: &[u8]) -> Result<Self, LinkError> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_wrong_len| LinkError::InvalidKey(key.len()))?;
        Ok(Self { key })
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let iv: [u8; IV_LEN] = rand::random();
        self.encrypt_with_iv(plaintext, &iv)
    }

    fn encrypt_with_iv(&self, plaintext: &str, iv: &[u8; IV_LEN]) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &(*iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let mut sealed = Vec::with_capacity(IV_LEN.saturating_add(ciphertext.len()));
        sealed.extend_from_slice(iv);
        sealed.extend_from_slice(&ciphertext);
        STANDARD.encode(sealed)
    }

    /// Reverse [`Cipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Cipher`] for invalid base64, input shorter than an
    /// IV, bad padding (usually a wrong key) or non-UTF-8 plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String, LinkError> {
        let sealed = STANDARD
            .decode(encoded)
            .map_err(|e| LinkError::Cipher(format!("invalid base64: {e}")))?;
        let (iv, ciphertext) = sealed
            .split_at_checked(IV_LEN)
            .ok_or_else(|| LinkError::Cipher(format!("{} bytes is shorter than an IV", sealed.len())))?;
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_wrong_len| LinkError::Cipher("malformed IV".to_owned()))?;
        let plaintext = Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| LinkError::Cipher(format!("decryption failed: {e}")))?;
        String::from_utf8(plaintext).map_err(|e| LinkError::Cipher(format!("plaintext is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef";

    #[test]
    fn round_trip_recovers_plaintext() {
        let cipher = Cipher::new(KEY).unwrap();
        let plaintext = r#"{"player_id":1,"action":"gun","game_state":{}}"#;
        let sealed = cipher.encrypt(plaintext);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn round_trip_handles_block_aligned_and_empty_input() {
        let cipher = Cipher::new(KEY).unwrap();
        for plaintext in ["", "exactly16bytes!!", "hello", "ünïcødé"] {
            assert_eq!(cipher.decrypt(&cipher.encrypt(plaintext)).unwrap(), plaintext);
        }
    }

    #[test]
    fn output_is_iv_then_padded_ciphertext() {
        let cipher = Cipher::new(KEY).unwrap();
        let iv = [7_u8; IV_LEN];
        let sealed = STANDARD.decode(cipher.encrypt_with_iv("hello", &iv)).unwrap();

        // 5 bytes pad to one block.
        assert_eq!(sealed.len(), IV_LEN + 16);
        assert_eq!(&sealed[..IV_LEN], &iv);
    }

    #[test]
    fn fresh_iv_per_message() {
        let cipher = Cipher::new(KEY).unwrap();
        assert_ne!(cipher.encrypt("hello"), cipher.encrypt("hello"));
    }

    #[test]
    fn key_must_be_sixteen_bytes() {
        assert_eq!(Cipher::new(b"short").unwrap_err(), LinkError::InvalidKey(5));
        assert_eq!(
            Cipher::new(b"0123456789abcdef0").unwrap_err(),
            LinkError::InvalidKey(17)
        );
    }

    #[test]
    fn wrong_key_or_garbage_fails_to_decrypt() {
        let sealed = Cipher::new(KEY).unwrap().encrypt("hello world, this is long");
        let other = Cipher::new(b"fedcba9876543210").unwrap();
        assert!(other.decrypt(&sealed).is_err());
        assert!(other.decrypt("not base64!").is_err());
        assert!(other.decrypt("AAAA").is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cipher = Cipher::new(KEY).unwrap();
        assert!(!format!("{cipher:?}").contains("0123"));
    }
}
