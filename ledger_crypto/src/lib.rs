//! Concrete implementation of the crypto collaborator described in §6.1:
//! seed → keypair, identity ↔ public-key codec, transaction signing, and
//! transaction-id hashing.

pub mod identity;
pub mod provider;

pub use identity::{identity_from_public_key, public_key_from_identity};
pub use provider::{CryptoProvider, Secp256k1Provider, TransactionInput};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid seed material: {0}")]
    InvalidSeed(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
