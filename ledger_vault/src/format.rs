//! On-disk vault file shape (§4.J).

use serde::{Deserialize, Serialize};

pub const VAULT_VERSION: u32 = 1;

/// Scrypt defaults: `N=2^13, r=8, p=1, dkLen=32`.
pub const DEFAULT_SCRYPT_LOG_N: u8 = 13;
pub const DEFAULT_SCRYPT_R: u32 = 8;
pub const DEFAULT_SCRYPT_P: u32 = 1;
pub const DEFAULT_DK_LEN: usize = 32;
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum KdfParams {
    Scrypt {
        #[serde(rename = "logN")]
        log_n: u8,
        r: u32,
        p: u32,
        #[serde(rename = "dkLen")]
        dk_len: usize,
        #[serde(rename = "saltBase64")]
        salt_base64: String,
    },
    Pbkdf2 {
        iterations: u32,
        #[serde(rename = "dkLen")]
        dk_len: usize,
        #[serde(rename = "saltBase64")]
        salt_base64: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedSeed {
    #[serde(rename = "nonceBase64")]
    pub nonce_base64: String,
    #[serde(rename = "ciphertextBase64")]
    pub ciphertext_base64: String,
    #[serde(rename = "tagBase64")]
    pub tag_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    pub name: String,
    pub identity: String,
    #[serde(rename = "seedIndex")]
    pub seed_index: u32,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
    pub encrypted: EncryptedSeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFile {
    #[serde(rename = "vaultVersion")]
    pub vault_version: u32,
    pub kdf: KdfParams,
    pub entries: Vec<VaultEntry>,
}

impl VaultFile {
    pub fn empty(kdf: KdfParams) -> Self {
        Self {
            vault_version: VAULT_VERSION,
            kdf,
            entries: Vec::new(),
        }
    }
}

pub fn now_unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
