///! AES-256-GCM for personal fields at rest (user names, check-in notes).
///! Stored form: base64(nonce || ciphertext).
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand_core::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("APP_ENC_KEY must be a base64 encoded 32 byte key")]
    InvalidKey,
}

#[derive(Clone)]
pub struct Crypto {
    cipher: Aes256Gcm,
}

impl Crypto {
    pub fn from_base64_key(encoded: &str) -> Result<Self, CryptoError> {
        let key = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidKey)?;
        Self::from_key_bytes(&key)
    }

    pub fn from_key_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn encrypt_str(&self, value: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), value.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut stored = Vec::with_capacity(NONCE_LEN + sealed.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(stored))
    }

    pub fn decrypt_str(&self, stored: &str) -> Result<String, CryptoError> {
        let data = general_purpose::STANDARD
            .decode(stored)
            .map_err(|_| CryptoError::Decrypt)?;
        if data.len() <= NONCE_LEN {
            return Err(CryptoError::Decrypt);
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Decrypt)
    }

    pub fn encrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, CryptoError> {
        value.map(|v| self.encrypt_str(v)).transpose()
    }

    pub fn decrypt_opt(&self, stored: Option<&str>) -> Result<Option<String>, CryptoError> {
        stored.map(|v| self.decrypt_str(v)).transpose()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_crypto() -> Crypto {
        Crypto::from_key_bytes(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_roundtrip_uses_fresh_nonce() {
        let crypto = test_crypto();
        let a = crypto.encrypt_str("Ana Souza").unwrap();
        let b = crypto.encrypt_str("Ana Souza").unwrap();
        assert_ne!(a, b);
        assert_eq!(crypto.decrypt_str(&a).unwrap(), "Ana Souza");
        assert_eq!(crypto.decrypt_opt(None).unwrap(), None);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = test_crypto().encrypt_str("notes").unwrap();
        let other = Crypto::from_key_bytes(&[9u8; 32]).unwrap();
        assert!(matches!(other.decrypt_str(&sealed), Err(CryptoError::Decrypt)));
        assert!(test_crypto().decrypt_str("AAAA").is_err());
    }

    #[test]
    fn test_key_parsing() {
        let key = general_purpose::STANDARD.encode([1u8; 32]);
        assert!(Crypto::from_base64_key(&key).is_ok());
        assert!(Crypto::from_base64_key("short").is_err());
        assert!(Crypto::from_key_bytes(&[1u8; 16]).is_err());
    }
}
