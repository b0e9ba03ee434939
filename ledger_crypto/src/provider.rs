//! Component L / §6.1: the crypto collaborator.
//!
//! The distilled core treats this as a trusted external dependency; this
//! crate ships a concrete implementation so the SDK runs end to end, while
//! keeping it behind the [`CryptoProvider`] trait so tests can substitute a
//! deterministic fake.

use crate::identity::{identity_from_public_key, public_key_from_identity};
use crate::CryptoError;
use libsecp256k1::{PublicKey, SecretKey};
use openssl::sha::Sha256;

/// The fields the signer needs, matching the `buildSignedTransaction` shape in §6.1.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    pub src_public_key: [u8; 32],
    pub dst_public_key: [u8; 32],
    pub amount: u64,
    pub tick: u32,
    pub input_type: u16,
    pub input_bytes: Vec<u8>,
}

/// The external crypto collaborator's full contract (§6.1).
pub trait CryptoProvider: Send + Sync {
    fn public_key_from_seed(&self, seed: &str) -> Result<[u8; 32], CryptoError>;
    fn private_key_from_seed(&self, seed: &str) -> Result<[u8; 32], CryptoError>;
    fn identity_from_seed(&self, seed: &str, seed_index: u32) -> Result<String, CryptoError>;
    fn public_key_from_identity(&self, identity: &str) -> Result<[u8; 32], CryptoError>;
    fn identity_from_public_key(&self, public_key: &[u8; 32]) -> String;
    fn build_signed_transaction(
        &self,
        input: &TransactionInput,
        private_key: &[u8; 32],
    ) -> Result<Vec<u8>, CryptoError>;
    fn transaction_id(&self, bytes: &[u8]) -> String;

    /// Derives `(publicKey, privateKey)` for a non-zero seed index, matching
    /// the scalar `identity_from_seed` derives from for the same pair. The
    /// plain `{public,private}_key_from_seed` calls above are this with
    /// `seed_index = 0`; the transaction builder uses this directly when
    /// signing on behalf of a vault entry recorded under a specific index.
    fn keypair_from_seed_indexed(
        &self,
        seed: &str,
        seed_index: u32,
    ) -> Result<([u8; 32], [u8; 32]), CryptoError>;
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finish()
}

fn scalar_for(seed: &str, seed_index: u32) -> Result<SecretKey, CryptoError> {
    let material = sha256(format!("{seed}#{seed_index}").as_bytes());
    SecretKey::parse(&material).map_err(|err| CryptoError::InvalidSeed(err.to_string()))
}

/// secp256k1-backed implementation used by default throughout the SDK.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Provider;

impl CryptoProvider for Secp256k1Provider {
    fn public_key_from_seed(&self, seed: &str) -> Result<[u8; 32], CryptoError> {
        let secret = scalar_for(seed, 0)?;
        Ok(public_key_bytes(&secret))
    }

    fn private_key_from_seed(&self, seed: &str) -> Result<[u8; 32], CryptoError> {
        Ok(scalar_for(seed, 0)?.serialize())
    }

    fn identity_from_seed(&self, seed: &str, seed_index: u32) -> Result<String, CryptoError> {
        let secret = scalar_for(seed, seed_index)?;
        let public_key = public_key_bytes(&secret);
        Ok(identity_from_public_key(&public_key))
    }

    fn public_key_from_identity(&self, identity: &str) -> Result<[u8; 32], CryptoError> {
        public_key_from_identity(identity)
    }

    fn identity_from_public_key(&self, public_key: &[u8; 32]) -> String {
        identity_from_public_key(public_key)
    }

    fn build_signed_transaction(
        &self,
        input: &TransactionInput,
        private_key: &[u8; 32],
    ) -> Result<Vec<u8>, CryptoError> {
        let secret = SecretKey::parse(private_key)
            .map_err(|err| CryptoError::InvalidSeed(err.to_string()))?;

        let mut header = Vec::with_capacity(32 + 32 + 8 + 4 + 2 + 2 + input.input_bytes.len());
        header.extend_from_slice(&input.src_public_key);
        header.extend_from_slice(&input.dst_public_key);
        header.extend_from_slice(&input.amount.to_le_bytes());
        header.extend_from_slice(&input.tick.to_le_bytes());
        header.extend_from_slice(&input.input_type.to_le_bytes());
        header.extend_from_slice(&(input.input_bytes.len() as u16).to_le_bytes());
        header.extend_from_slice(&input.input_bytes);

        let digest = sha256(&header);
        let message = libsecp256k1::Message::parse(&digest);
        let (signature, _recovery_id) = libsecp256k1::sign(&message, &secret);

        let mut signed = header;
        signed.extend_from_slice(&signature.serialize());
        Ok(signed)
    }

    fn transaction_id(&self, bytes: &[u8]) -> String {
        hex::encode(sha256(bytes))
    }

    fn keypair_from_seed_indexed(
        &self,
        seed: &str,
        seed_index: u32,
    ) -> Result<([u8; 32], [u8; 32]), CryptoError> {
        let secret = scalar_for(seed, seed_index)?;
        Ok((public_key_bytes(&secret), secret.serialize()))
    }
}

fn public_key_bytes(secret: &SecretKey) -> [u8; 32] {
    let full = PublicKey::from_secret_key(secret).serialize_compressed();
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[1..33]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_from_seed_matches_public_key_derived_independently() {
        let provider = Secp256k1Provider;
        let pk = provider.public_key_from_seed("correct horse battery staple").unwrap();
        let identity = provider
            .identity_from_seed("correct horse battery staple", 0)
            .unwrap();
        assert_eq!(identity, identity_from_public_key(&pk));
    }

    #[test]
    fn transaction_id_is_deterministic_hash_of_bytes() {
        let provider = Secp256k1Provider;
        let private_key = provider.private_key_from_seed("seed one").unwrap();
        let input = TransactionInput {
            src_public_key: provider.public_key_from_seed("seed one").unwrap(),
            dst_public_key: provider.public_key_from_seed("seed two").unwrap(),
            amount: 1,
            tick: 12345,
            input_type: 0,
            input_bytes: Vec::new(),
        };
        let bytes = provider
            .build_signed_transaction(&input, &private_key)
            .unwrap();
        let tx_id = provider.transaction_id(&bytes);
        assert_eq!(tx_id, hex::encode(sha256(&bytes)));
        assert_eq!(tx_id.len(), 64);
    }

    #[test]
    fn keypair_from_seed_indexed_matches_identity_from_seed() {
        let provider = Secp256k1Provider;
        let (public_key, _private_key) = provider
            .keypair_from_seed_indexed("correct horse battery staple", 3)
            .unwrap();
        let identity = provider
            .identity_from_seed("correct horse battery staple", 3)
            .unwrap();
        assert_eq!(identity, identity_from_public_key(&public_key));
    }

    #[test]
    fn build_signed_transaction_is_deterministic() {
        let provider = Secp256k1Provider;
        let private_key = provider.private_key_from_seed("seed one").unwrap();
        let input = TransactionInput {
            src_public_key: provider.public_key_from_seed("seed one").unwrap(),
            dst_public_key: provider.public_key_from_seed("seed two").unwrap(),
            amount: 7,
            tick: 42,
            input_type: 0,
            input_bytes: Vec::new(),
        };
        let first = provider
            .build_signed_transaction(&input, &private_key)
            .unwrap();
        let second = provider
            .build_signed_transaction(&input, &private_key)
            .unwrap();
        assert_eq!(first, second);
    }
}
