//! Component J: a file-backed, passphrase-encrypted store of named seeds,
//! with atomic writes, advisory cross-process locking, and a pluggable-store
//! variant for hosts without a conventional filesystem.

pub mod backend;
pub mod crypto;
pub mod format;
pub mod lock;
pub mod vault;

pub use backend::{FileBackend, PluggableBackend, VaultBackend};
pub use format::{EncryptedSeed, KdfParams, VaultEntry, VaultFile, VAULT_VERSION};
pub use vault::{AddSeedInput, ImportMode, OpenOptions, SeedSource, VaultEntrySummary, VaultHandle};
