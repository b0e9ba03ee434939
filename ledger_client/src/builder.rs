//! Component D: the transaction builder — `buildSigned`, `send`,
//! `sendAndConfirm`, `sendAndConfirmWithReceipt`.

use crate::confirm::{ConfirmError, ConfirmationEngine, ConfirmationParams};
use ledger_core::errors::{DomainError, TransportError, ValidationError};
use ledger_core::rpc::{ArchiveClient, LiveClient, QueryTransaction};
use ledger_core::tick::TickHelper;
use ledger_crypto::{CryptoProvider, TransactionInput};
use ledger_vault::{SeedSource, VaultHandle};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
    #[error(transparent)]
    Crypto(#[from] ledger_crypto::CryptoError),
    #[error(transparent)]
    Vault(#[from] ledger_core::errors::VaultError),
    #[error(transparent)]
    TickHelper(#[from] ledger_core::errors::LedgerError),
    #[error("a vault is required to resolve a vault seed reference, but none was configured")]
    VaultNotConfigured,
}

/// An immutable, already-signed transaction (§3, `SignedTransaction`).
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub bytes: Vec<u8>,
    pub tx_id: String,
    pub target_tick: u32,
}

/// §3, `BroadcastResult`. `network_tx_id` is authoritative for confirmation
/// even when it happens to equal `tx_id`.
#[derive(Debug, Clone)]
pub struct BroadcastResult {
    pub peers_broadcast: i32,
    pub encoded_bytes: String,
    pub network_tx_id: String,
}

/// Input to [`TransactionBuilder::build_signed`].
pub struct BuildInput {
    pub source: SeedSource,
    pub to_identity: String,
    pub amount: u64,
    pub target_tick: Option<u64>,
    pub input_type: Option<u16>,
    pub input_bytes: Option<Vec<u8>>,
}

impl BuildInput {
    pub fn transfer(source: SeedSource, to_identity: impl Into<String>, amount: u64) -> Self {
        Self {
            source,
            to_identity: to_identity.into(),
            amount,
            target_tick: None,
            input_type: None,
            input_bytes: None,
        }
    }
}

#[derive(Clone)]
pub struct TransactionBuilder {
    live: LiveClient,
    archive: ArchiveClient,
    tick_helper: TickHelper,
    crypto: Arc<dyn CryptoProvider>,
    vault: Option<Arc<VaultHandle>>,
}

impl TransactionBuilder {
    pub fn new(
        live: LiveClient,
        archive: ArchiveClient,
        tick_helper: TickHelper,
        crypto: Arc<dyn CryptoProvider>,
        vault: Option<Arc<VaultHandle>>,
    ) -> Self {
        Self {
            live,
            archive,
            tick_helper,
            crypto,
            vault,
        }
    }

    /// Resolves a [`SeedSource`] into the raw seed text and the seed index
    /// it was recorded under (0 for a bare seed, the vault entry's own
    /// index for a vault reference — identity is never re-derived from the
    /// vault on read, so the index travels with the seed text here).
    async fn resolve_seed(&self, source: &SeedSource) -> Result<(String, u32), BuilderError> {
        match source {
            SeedSource::FromSeed { seed } => Ok((seed.clone(), 0)),
            SeedSource::FromVaultRef { vault_ref } => {
                let vault = self.vault.as_ref().ok_or(BuilderError::VaultNotConfigured)?;
                let summary = vault.get_entry(vault_ref).await?;
                let seed = vault.get_seed(vault_ref).await?;
                Ok((seed, summary.seed_index))
            }
        }
    }

    /// `buildSigned`: resolves the seed, resolves/validates the target tick,
    /// derives the keypair, and signs via the crypto collaborator.
    pub async fn build_signed(&self, input: BuildInput) -> Result<SignedTransaction, BuilderError> {
        let (seed, seed_index) = self.resolve_seed(&input.source).await?;

        let target_tick_u64 = match input.target_tick {
            Some(tick) => tick,
            None => self.tick_helper.suggested_target_tick(None).await?,
        };
        let target_tick: u32 = target_tick_u64
            .try_into()
            .map_err(|_| ValidationError::TickOutOfU32Range(target_tick_u64))?;

        let (src_public_key, private_key) = self.crypto.keypair_from_seed_indexed(&seed, seed_index)?;
        let dst_public_key = self.crypto.public_key_from_identity(&input.to_identity)?;

        let transaction_input = TransactionInput {
            src_public_key,
            dst_public_key,
            amount: input.amount,
            tick: target_tick,
            input_type: input.input_type.unwrap_or(0),
            input_bytes: input.input_bytes.unwrap_or_default(),
        };
        let bytes = self
            .crypto
            .build_signed_transaction(&transaction_input, &private_key)?;
        let tx_id = self.crypto.transaction_id(&bytes);

        Ok(SignedTransaction {
            bytes,
            tx_id,
            target_tick,
        })
    }

    /// Resolves the seed behind a [`SeedSource`] and derives the identity it
    /// signs for, without building a transaction. Used by the queue to key
    /// its per-source active slot before a transaction exists yet.
    pub async fn resolve_source_identity(&self, source: &SeedSource) -> Result<String, BuilderError> {
        let (seed, seed_index) = self.resolve_seed(source).await?;
        let (public_key, _private_key) = self.crypto.keypair_from_seed_indexed(&seed, seed_index)?;
        Ok(self.crypto.identity_from_public_key(&public_key))
    }

    /// Broadcasts an already-built transaction. `network_tx_id` is taken
    /// from the broadcast response, which is authoritative for confirmation.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<BroadcastResult, BuilderError> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&signed.bytes);
        let response = self.live.broadcast_transaction(encoded).await?;
        Ok(BroadcastResult {
            peers_broadcast: response.peers_broadcasted,
            encoded_bytes: response.encoded_transaction,
            network_tx_id: response.transaction_id,
        })
    }

    /// `send` = build + broadcast. Does not wait for confirmation.
    pub async fn send(
        &self,
        input: BuildInput,
    ) -> Result<(SignedTransaction, BroadcastResult), BuilderError> {
        let signed = self.build_signed(input).await?;
        let broadcast = self.broadcast(&signed).await?;
        Ok((signed, broadcast))
    }

    /// `sendAndConfirm` = build + broadcast + wait. Callers who want queue
    /// delegation should go through `LedgerClient::send_and_confirm`, which
    /// routes here only when no queue is configured.
    pub async fn send_and_confirm(
        &self,
        input: BuildInput,
        confirmation: ConfirmationParams,
        cancel: &CancellationToken,
    ) -> Result<(SignedTransaction, BroadcastResult), BuilderError> {
        let (signed, broadcast) = self.send(input).await?;
        let engine = ConfirmationEngine::new(self.archive.clone());
        engine
            .wait_for_confirmation(
                &broadcast.network_tx_id,
                signed.target_tick as u64,
                confirmation,
                cancel,
            )
            .await?;
        Ok((signed, broadcast))
    }

    /// `sendAndConfirmWithReceipt`: additionally returns the archive record.
    pub async fn send_and_confirm_with_receipt(
        &self,
        input: BuildInput,
        confirmation: ConfirmationParams,
        cancel: &CancellationToken,
    ) -> Result<(SignedTransaction, BroadcastResult, QueryTransaction), BuilderError> {
        let (signed, broadcast) = self.send(input).await?;
        let engine = ConfirmationEngine::new(self.archive.clone());
        let receipt = engine
            .wait_for_confirmation(
                &broadcast.network_tx_id,
                signed.target_tick as u64,
                confirmation,
                cancel,
            )
            .await?;
        Ok((signed, broadcast, receipt))
    }

    pub fn archive(&self) -> &ArchiveClient {
        &self.archive
    }

    pub fn live(&self) -> &LiveClient {
        &self.live
    }
}
