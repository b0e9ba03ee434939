//! Key derivation and AES-256-GCM sealing for vault entries (§4.J).

use crate::format::{DEFAULT_DK_LEN, DEFAULT_PBKDF2_ITERATIONS};
use crate::format::{DEFAULT_SCRYPT_LOG_N, DEFAULT_SCRYPT_P, DEFAULT_SCRYPT_R};
use crate::format::{EncryptedSeed, KdfParams};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use ledger_core::errors::VaultError;
use rand::RngCore;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn unb64(text: &str) -> Result<Vec<u8>, VaultError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|err| VaultError::Generic(format!("invalid base64: {err}")))
}

pub fn default_scrypt_params(salt: &[u8]) -> KdfParams {
    KdfParams::Scrypt {
        log_n: DEFAULT_SCRYPT_LOG_N,
        r: DEFAULT_SCRYPT_R,
        p: DEFAULT_SCRYPT_P,
        dk_len: DEFAULT_DK_LEN,
        salt_base64: b64(salt),
    }
}

pub fn default_pbkdf2_params(salt: &[u8]) -> KdfParams {
    KdfParams::Pbkdf2 {
        iterations: DEFAULT_PBKDF2_ITERATIONS,
        dk_len: DEFAULT_DK_LEN,
        salt_base64: b64(salt),
    }
}

pub fn random_salt(len: usize) -> Vec<u8> {
    let mut salt = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derives a symmetric key from a passphrase using the KDF named in `params`.
pub fn derive_key(passphrase: &str, params: &KdfParams) -> Result<Vec<u8>, VaultError> {
    match params {
        KdfParams::Scrypt {
            log_n,
            r,
            p,
            dk_len,
            salt_base64,
        } => {
            let salt = unb64(salt_base64)?;
            let scrypt_params = scrypt::Params::new(*log_n, *r, *p, *dk_len)
                .map_err(|err| VaultError::Generic(format!("invalid scrypt params: {err}")))?;
            let mut key = vec![0u8; *dk_len];
            scrypt::scrypt(passphrase.as_bytes(), &salt, &scrypt_params, &mut key)
                .map_err(|err| VaultError::Generic(format!("scrypt failed: {err}")))?;
            Ok(key)
        }
        KdfParams::Pbkdf2 {
            iterations,
            dk_len,
            salt_base64,
        } => {
            let salt = unb64(salt_base64)?;
            let mut key = vec![0u8; *dk_len];
            pbkdf2::pbkdf2_hmac::<sha2::Sha256>(passphrase.as_bytes(), &salt, *iterations, &mut key);
            Ok(key)
        }
    }
}

/// Seals `plaintext` with AES-256-GCM under `key`, storing nonce/ciphertext/tag separately.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<EncryptedSeed, VaultError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut combined = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| VaultError::Generic("encryption failed".into()))?;
    let tag = combined.split_off(combined.len() - TAG_LEN);

    Ok(EncryptedSeed {
        nonce_base64: b64(&nonce_bytes),
        ciphertext_base64: b64(&combined),
        tag_base64: b64(&tag),
    })
}

/// Opens an [`EncryptedSeed`] with `key`; a tampered ciphertext/tag or wrong
/// key surfaces as [`VaultError::InvalidPassphrase`].
pub fn open(key: &[u8], sealed: &EncryptedSeed) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce_bytes = unb64(&sealed.nonce_base64)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(VaultError::Generic("invalid nonce length".into()));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut combined = unb64(&sealed.ciphertext_base64)?;
    combined.extend_from_slice(&unb64(&sealed.tag_base64)?);

    cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| VaultError::InvalidPassphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrypt_round_trip() {
        let salt = random_salt(16);
        let params = default_scrypt_params(&salt);
        let key = derive_key("hunter2", &params).unwrap();
        let sealed = seal(&key, b"a seed phrase").unwrap();
        let opened = open(&key, &sealed).unwrap();
        assert_eq!(opened, b"a seed phrase");
    }

    #[test]
    fn wrong_passphrase_fails_to_open() {
        let salt = random_salt(16);
        let params = default_scrypt_params(&salt);
        let key = derive_key("hunter2", &params).unwrap();
        let sealed = seal(&key, b"a seed phrase").unwrap();
        let wrong_key = derive_key("wrong", &params).unwrap();
        assert!(open(&wrong_key, &sealed).is_err());
    }

    #[test]
    fn pbkdf2_round_trip() {
        let salt = random_salt(16);
        let params = default_pbkdf2_params(&salt);
        let key = derive_key("hunter2", &params).unwrap();
        let sealed = seal(&key, b"another seed").unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), b"another seed");
    }
}
