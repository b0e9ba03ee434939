//! Component J: the seed vault handle. All entry mutations happen inside a
//! single `tokio::sync::Mutex<VaultState>` critical section; the on-disk
//! advisory lock (§`lock`) only protects against cross-process races.

use crate::backend::{FileBackend, PluggableBackend, VaultBackend};
use crate::crypto;
use crate::format::{now_unix_seconds, KdfParams, VaultFile, VAULT_VERSION};
use crate::lock::{self, LockGuard};
use ledger_core::errors::VaultError;
use ledger_crypto::{CryptoProvider, Secp256k1Provider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A redacted view of a [`crate::format::VaultEntry`] — no key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntrySummary {
    pub name: String,
    pub identity: String,
    pub seed_index: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Where a transaction builder should pull signing material from, without
/// the caller needing to handle raw seeds directly in both cases uniformly.
pub enum SeedSource {
    FromSeed { seed: String },
    FromVaultRef { vault_ref: String },
}

pub enum ImportMode {
    Merge,
    Replace,
}

pub struct AddSeedInput {
    pub name: String,
    pub seed: String,
    pub seed_index: Option<u32>,
    pub overwrite: bool,
}

struct VaultState {
    entries: Vec<crate::format::VaultEntry>,
    kdf: KdfParams,
    key: Vec<u8>,
    passphrase: String,
}

pub struct OpenOptions {
    pub passphrase: String,
    pub create: bool,
    pub kdf_params: Option<KdfParams>,
    pub lock: bool,
    pub lock_timeout_ms: u64,
    pub auto_save: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            create: false,
            kdf_params: None,
            lock: true,
            lock_timeout_ms: 0,
            auto_save: true,
        }
    }
}

pub struct VaultHandle {
    backend: Arc<dyn VaultBackend>,
    lock_guard: Option<LockGuard>,
    auto_save: bool,
    state: Mutex<VaultState>,
}

impl VaultHandle {
    pub async fn open_file(path: impl Into<PathBuf>, options: OpenOptions) -> Result<Self, VaultError> {
        let path = path.into();
        let lock_guard = if options.lock {
            let lock_path = path.clone();
            let timeout_ms = options.lock_timeout_ms;
            Some(
                tokio::task::spawn_blocking(move || lock::acquire(&lock_path, timeout_ms))
                    .await
                    .map_err(|err| VaultError::Generic(format!("lock task panicked: {err}")))??,
            )
        } else {
            None
        };
        let backend: Arc<dyn VaultBackend> = Arc::new(FileBackend::new(path));
        Self::open_with_backend(backend, lock_guard, options).await
    }

    pub async fn open_pluggable(
        backend: PluggableBackend,
        options: OpenOptions,
    ) -> Result<Self, VaultError> {
        Self::open_with_backend(Arc::new(backend), None, options).await
    }

    async fn open_with_backend(
        backend: Arc<dyn VaultBackend>,
        lock_guard: Option<LockGuard>,
        options: OpenOptions,
    ) -> Result<Self, VaultError> {
        let existing = backend.read().await?;
        let newly_created = existing.is_none();

        let (file, key) = match existing {
            Some(bytes) => {
                let file: VaultFile = serde_json::from_slice(&bytes)
                    .map_err(|err| VaultError::Generic(format!("invalid vault file: {err}")))?;
                if file.vault_version != VAULT_VERSION {
                    return Err(VaultError::Generic(format!(
                        "unsupported vault version {}",
                        file.vault_version
                    )));
                }
                let key = crypto::derive_key(&options.passphrase, &file.kdf)?;
                (file, key)
            }
            None if options.create => {
                let kdf = options.kdf_params.clone().unwrap_or_else(|| {
                    let salt = crypto::random_salt(16);
                    crypto::default_scrypt_params(&salt)
                });
                let key = crypto::derive_key(&options.passphrase, &kdf)?;
                (VaultFile::empty(kdf), key)
            }
            None => {
                return Err(VaultError::NotFound(
                    backend
                        .file_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<pluggable backend>".into()),
                ))
            }
        };

        let handle = Self {
            backend,
            lock_guard,
            auto_save: options.auto_save,
            state: Mutex::new(VaultState {
                entries: file.entries,
                kdf: file.kdf,
                key,
                passphrase: options.passphrase,
            }),
        };
        if newly_created {
            handle.save().await?;
        }
        Ok(handle)
    }

    pub async fn list(&self) -> Vec<VaultEntrySummary> {
        let state = self.state.lock().await;
        state.entries.iter().map(summarize).collect()
    }

    pub async fn get_entry(&self, reference: &str) -> Result<VaultEntrySummary, VaultError> {
        let state = self.state.lock().await;
        resolve(&state.entries, reference).map(summarize)
    }

    pub async fn get_identity(&self, reference: &str) -> Result<String, VaultError> {
        self.get_entry(reference).await.map(|entry| entry.identity)
    }

    pub async fn get_seed(&self, reference: &str) -> Result<String, VaultError> {
        let state = self.state.lock().await;
        let entry = resolve(&state.entries, reference)?;
        let plaintext = crypto::open(&state.key, &entry.encrypted)?;
        String::from_utf8(plaintext)
            .map_err(|_| VaultError::Generic("decrypted seed was not valid UTF-8".into()))
    }

    /// `signer(ref)`: validates the reference resolves now, but defers
    /// decryption — the returned value just carries the vault reference.
    pub async fn signer(&self, reference: &str) -> Result<SeedSource, VaultError> {
        let state = self.state.lock().await;
        let entry = resolve(&state.entries, reference)?;
        Ok(SeedSource::FromVaultRef {
            vault_ref: entry.name.clone(),
        })
    }

    /// `getSeedSource(ref)`: decrypts eagerly and returns the seed text
    /// wrapped so it can be passed wherever a bare seed is accepted.
    pub async fn get_seed_source(&self, reference: &str) -> Result<SeedSource, VaultError> {
        let seed = self.get_seed(reference).await?;
        Ok(SeedSource::FromSeed { seed })
    }

    pub async fn add_seed(&self, input: AddSeedInput) -> Result<VaultEntrySummary, VaultError> {
        let mut state = self.state.lock().await;
        let seed_index = input.seed_index.unwrap_or(0);
        let existing_index = state.entries.iter().position(|e| e.name == input.name);

        if existing_index.is_some() && !input.overwrite {
            return Err(VaultError::EntryExists(input.name));
        }

        let provider = Secp256k1Provider::default();
        let identity = provider
            .identity_from_seed(&input.seed, seed_index)
            .map_err(|err| VaultError::Generic(err.to_string()))?;
        let encrypted = crypto::seal(&state.key, input.seed.as_bytes())?;
        let now = now_unix_seconds();
        let created_at = existing_index
            .map(|idx| state.entries[idx].created_at)
            .unwrap_or(now);

        let entry = crate::format::VaultEntry {
            name: input.name,
            identity,
            seed_index,
            created_at,
            updated_at: now,
            encrypted,
        };
        let summary = summarize(&entry);

        match existing_index {
            Some(idx) => state.entries[idx] = entry,
            None => state.entries.push(entry),
        }
        drop(state);
        self.maybe_save().await?;
        Ok(summary)
    }

    pub async fn remove(&self, reference: &str) -> Result<(), VaultError> {
        let mut state = self.state.lock().await;
        let idx = index_of(&state.entries, reference)?;
        state.entries.remove(idx);
        drop(state);
        self.maybe_save().await
    }

    /// All-or-nothing: every entry is decrypted under the old key before any
    /// mutation, so a failure mid-rotation leaves the vault untouched.
    pub async fn rotate_passphrase(&self, new_passphrase: &str) -> Result<(), VaultError> {
        let mut state = self.state.lock().await;

        let plaintexts: Result<Vec<Vec<u8>>, VaultError> = state
            .entries
            .iter()
            .map(|entry| crypto::open(&state.key, &entry.encrypted))
            .collect();
        let plaintexts = plaintexts?;

        let salt = crypto::random_salt(16);
        let new_kdf = match &state.kdf {
            KdfParams::Scrypt { .. } => crypto::default_scrypt_params(&salt),
            KdfParams::Pbkdf2 { .. } => crypto::default_pbkdf2_params(&salt),
        };
        let new_key = crypto::derive_key(new_passphrase, &new_kdf)?;

        let mut resealed = Vec::with_capacity(state.entries.len());
        for (entry, plaintext) in state.entries.iter().zip(plaintexts.iter()) {
            let mut entry = entry.clone();
            entry.encrypted = crypto::seal(&new_key, plaintext)?;
            resealed.push(entry);
        }

        state.entries = resealed;
        state.kdf = new_kdf;
        state.key = new_key;
        state.passphrase = new_passphrase.to_string();
        drop(state);
        self.maybe_save().await
    }

    /// Returns the current vault file bytes, still encrypted under this vault's passphrase.
    pub async fn export_encrypted(&self) -> Result<Vec<u8>, VaultError> {
        let state = self.state.lock().await;
        serde_json::to_vec_pretty(&VaultFile {
            vault_version: VAULT_VERSION,
            kdf: state.kdf.clone(),
            entries: state.entries.clone(),
        })
        .map_err(|err| VaultError::Generic(format!("failed to serialize vault: {err}")))
    }

    /// Decrypts every entry and returns a plaintext export. Handle with care: callers
    /// must treat the result as sensitive key material.
    pub async fn export_json(&self) -> Result<String, VaultError> {
        let state = self.state.lock().await;
        let mut exported = Vec::with_capacity(state.entries.len());
        for entry in &state.entries {
            let seed = String::from_utf8(crypto::open(&state.key, &entry.encrypted)?)
                .map_err(|_| VaultError::Generic("decrypted seed was not valid UTF-8".into()))?;
            exported.push(PlaintextEntry {
                name: entry.name.clone(),
                identity: entry.identity.clone(),
                seed_index: entry.seed_index,
                seed,
            });
        }
        serde_json::to_string_pretty(&exported)
            .map_err(|err| VaultError::Generic(format!("failed to serialize export: {err}")))
    }

    /// Imports entries from another vault's encrypted file. When
    /// `source_passphrase` is omitted, this vault's own (currently open)
    /// passphrase is assumed to also open the source blob.
    pub async fn import_encrypted(
        &self,
        blob: &[u8],
        mode: ImportMode,
        source_passphrase: Option<&str>,
    ) -> Result<(), VaultError> {
        let source_file: VaultFile = serde_json::from_slice(blob)
            .map_err(|err| VaultError::Generic(format!("invalid import blob: {err}")))?;
        if source_file.vault_version != VAULT_VERSION {
            return Err(VaultError::Generic(format!(
                "unsupported import vault version {}",
                source_file.vault_version
            )));
        }

        let mut state = self.state.lock().await;
        let source_key = match source_passphrase {
            Some(passphrase) => crypto::derive_key(passphrase, &source_file.kdf)?,
            None => crypto::derive_key(&state.passphrase, &source_file.kdf)?,
        };

        let mut reencrypted = Vec::with_capacity(source_file.entries.len());
        for entry in &source_file.entries {
            let plaintext = crypto::open(&source_key, &entry.encrypted)?;
            let mut entry = entry.clone();
            entry.encrypted = crypto::seal(&state.key, &plaintext)?;
            reencrypted.push(entry);
        }

        match mode {
            ImportMode::Replace => {
                state.entries = reencrypted;
            }
            ImportMode::Merge => {
                for incoming in reencrypted {
                    if let Some(idx) = state.entries.iter().position(|e| e.name == incoming.name) {
                        state.entries[idx] = incoming;
                    } else {
                        state.entries.push(incoming);
                    }
                }
            }
        }
        drop(state);
        self.maybe_save().await
    }

    async fn maybe_save(&self) -> Result<(), VaultError> {
        if self.auto_save {
            self.save().await
        } else {
            Ok(())
        }
    }

    pub async fn save(&self) -> Result<(), VaultError> {
        let bytes = self.export_encrypted().await?;
        self.backend.write(&bytes).await?;
        tracing::debug!("ledger_vault: saved vault");
        Ok(())
    }

    /// Releases the lock (via [`LockGuard`]'s `Drop`). Does not delete the
    /// vault file.
    pub fn close(self) {
        drop(self.lock_guard);
    }
}

#[derive(Serialize)]
struct PlaintextEntry {
    name: String,
    identity: String,
    seed_index: u32,
    seed: String,
}

fn summarize(entry: &crate::format::VaultEntry) -> VaultEntrySummary {
    VaultEntrySummary {
        name: entry.name.clone(),
        identity: entry.identity.clone(),
        seed_index: entry.seed_index,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    }
}

fn index_of(entries: &[crate::format::VaultEntry], reference: &str) -> Result<usize, VaultError> {
    entries
        .iter()
        .position(|e| e.name == reference)
        .or_else(|| entries.iter().position(|e| e.identity == reference))
        .ok_or_else(|| VaultError::EntryNotFound(reference.to_string()))
}

fn resolve<'a>(
    entries: &'a [crate::format::VaultEntry],
    reference: &str,
) -> Result<&'a crate::format::VaultEntry, VaultError> {
    index_of(entries, reference).map(|idx| &entries[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(passphrase: &str, create: bool) -> OpenOptions {
        OpenOptions {
            passphrase: passphrase.to_string(),
            create,
            lock_timeout_ms: 50,
            ..OpenOptions::default()
        }
    }

    #[tokio::test]
    async fn round_trip_add_save_close_reopen_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let vault = VaultHandle::open_file(&path, options("hunter2", true))
            .await
            .unwrap();
        vault
            .add_seed(AddSeedInput {
                name: "main".into(),
                seed: "correct horse battery staple".into(),
                seed_index: None,
                overwrite: false,
            })
            .await
            .unwrap();
        let identity = vault.get_identity("main").await.unwrap();
        vault.save().await.unwrap();
        vault.close();

        let reopened = VaultHandle::open_file(&path, options("hunter2", false))
            .await
            .unwrap();
        assert_eq!(
            reopened.get_seed("main").await.unwrap(),
            "correct horse battery staple"
        );
        assert_eq!(reopened.get_seed(&identity).await.unwrap(), "correct horse battery staple");
    }

    #[tokio::test]
    async fn add_seed_without_overwrite_rejects_duplicate_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let vault = VaultHandle::open_file(&path, options("hunter2", true))
            .await
            .unwrap();
        vault
            .add_seed(AddSeedInput {
                name: "main".into(),
                seed: "seed-one".into(),
                seed_index: None,
                overwrite: false,
            })
            .await
            .unwrap();
        let err = vault
            .add_seed(AddSeedInput {
                name: "main".into(),
                seed: "seed-two".into(),
                seed_index: None,
                overwrite: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::EntryExists(_)));
    }

    #[tokio::test]
    async fn rotate_passphrase_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let vault = VaultHandle::open_file(&path, options("hunter2", true))
            .await
            .unwrap();
        vault
            .add_seed(AddSeedInput {
                name: "main".into(),
                seed: "the-seed".into(),
                seed_index: None,
                overwrite: false,
            })
            .await
            .unwrap();
        vault.rotate_passphrase("new-passphrase").await.unwrap();
        vault.save().await.unwrap();
        vault.close();

        let reopened = VaultHandle::open_file(&path, options("new-passphrase", false))
            .await
            .unwrap();
        assert_eq!(reopened.get_seed("main").await.unwrap(), "the-seed");
    }
}
