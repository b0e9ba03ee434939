//! Component F (the transfer/procedure façade) plus the `LedgerClient`
//! construction that wires every lower component together (§2).
//!
//! Stateless by design: every method here resolves its inputs, delegates to
//! the builder/queue/registry, and returns. `sendAndConfirm` always routes
//! through the queue per §4.D; procedure sends and the `...WithReceipt`
//! variants go straight through the builder, since a queued item's terminal
//! shape carries a [`BroadcastResult`], not an archive receipt.

use crate::builder::{BroadcastResult, BuilderError, BuildInput, SignedTransaction, TransactionBuilder};
use crate::confirm::{ConfirmError, ConfirmationParams};
use crate::queue::{QueueError, QueueItem, TransactionQueue};
use crate::send_many::{encode_send_many, SendManyTransfer};
use ledger_core::config::LedgerClientConfig;
use ledger_core::errors::{TransportError, ValidationError};
use ledger_core::rpc::{ArchiveClient, LiveClient, QueryTransaction, Transport};
use ledger_core::tick::TickHelper;
use ledger_crypto::CryptoProvider;
use ledger_interfaces::{
    ContractHandle, InterfaceError, InterfaceRegistry, QueryInput, QueryOutcome,
};
use ledger_vault::{SeedSource, VaultHandle};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum LedgerClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error("no contract interface registry was configured for this client")]
    InterfacesNotConfigured,
}

/// The SDK's public façade (§2): owns the RPC surfaces, the transaction
/// builder, the per-source queue, and (optionally) the contract interface
/// registry. Log streaming (`ledger_logstream::run`) and the vault are
/// independent collaborators callers drive directly; this struct only wires
/// in a vault reference for seed resolution.
pub struct LedgerClient {
    builder: TransactionBuilder,
    queue: TransactionQueue,
    confirmation: ConfirmationParams,
    interfaces: Option<InterfaceRegistry>,
}

impl LedgerClient {
    /// Builds the RPC surfaces from `config.rpc_base_url` and wires the
    /// transaction builder, queue, and (optional) interface registry
    /// together. `interfaces`, when supplied, must already be constructed
    /// against a [`LiveClient`] sharing the same base URL.
    pub fn new(
        config: &LedgerClientConfig,
        crypto: Arc<dyn CryptoProvider>,
        vault: Option<Arc<VaultHandle>>,
        interfaces: Option<InterfaceRegistry>,
    ) -> Result<Self, LedgerClientError> {
        let transport = Arc::new(Transport::new(&config.rpc_base_url)?);
        let live = LiveClient::new(transport.clone());
        let archive = ArchiveClient::new(transport);
        let tick_helper = TickHelper::new(live.clone(), config.tick_offset);
        let builder = TransactionBuilder::new(live, archive, tick_helper, crypto, vault);
        let queue = TransactionQueue::new(config.queue_policy);
        let confirmation = ConfirmationParams {
            timeout: config.confirmation_timeout(),
            poll_interval: config.confirmation_poll_interval(),
        };
        Ok(Self {
            builder,
            queue,
            confirmation,
            interfaces,
        })
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    /// `send`: build + broadcast, no wait.
    pub async fn send(
        &self,
        input: BuildInput,
    ) -> Result<(SignedTransaction, BroadcastResult), LedgerClientError> {
        Ok(self.builder.send(input).await?)
    }

    /// `sendAndConfirm`: delegates to `sendQueued` (§4.D).
    pub async fn send_and_confirm(&self, input: BuildInput) -> Result<QueueItem, LedgerClientError> {
        self.send_queued(input).await
    }

    /// `sendQueued`: resolves the source identity up front (to key the
    /// queue's active slot), builds the signed transaction, then hands both
    /// to the queue.
    pub async fn send_queued(&self, input: BuildInput) -> Result<QueueItem, LedgerClientError> {
        let source_identity = self.builder.resolve_source_identity(&input.source).await?;
        let signed = self.builder.build_signed(input).await?;
        let item = self
            .queue
            .enqueue(&self.builder, source_identity, signed, self.confirmation)
            .await?;
        Ok(item)
    }

    /// `sendAndConfirmWithReceipt`: bypasses the queue so the archive record
    /// can be returned directly.
    pub async fn send_and_confirm_with_receipt(
        &self,
        input: BuildInput,
        cancel: &CancellationToken,
    ) -> Result<(SignedTransaction, BroadcastResult, QueryTransaction), LedgerClientError> {
        Ok(self
            .builder
            .send_and_confirm_with_receipt(input, self.confirmation, cancel)
            .await?)
    }

    /// `transfer`: a plain value transfer (`inputType=0`, empty payload).
    pub async fn transfer(
        &self,
        source: SeedSource,
        to_identity: impl Into<String>,
        amount: u64,
    ) -> Result<QueueItem, LedgerClientError> {
        self.send_and_confirm(BuildInput::transfer(source, to_identity, amount))
            .await
    }

    /// Encodes up to 25 `(destination, amount)` pairs into the fixed
    /// send-many payload (§6.5) and builds the transaction input that
    /// invokes it, targeting `contract_identity` with the given `input_type`.
    pub fn build_send_many_input(
        &self,
        source: SeedSource,
        contract_identity: impl Into<String>,
        input_type: u16,
        transfers: &[SendManyTransfer],
    ) -> Result<BuildInput, LedgerClientError> {
        let payload = encode_send_many(transfers)?;
        Ok(BuildInput {
            source,
            to_identity: contract_identity.into(),
            amount: 0,
            target_tick: None,
            input_type: Some(input_type),
            input_bytes: Some(payload),
        })
    }

    fn contract<'a>(
        &'a self,
        name: &str,
    ) -> Result<ContractHandle<'a>, LedgerClientError> {
        let registry = self
            .interfaces
            .as_ref()
            .ok_or(LedgerClientError::InterfacesNotConfigured)?;
        Ok(registry.contract(name)?)
    }

    /// `query`/`queryValue` passthrough against a registered contract.
    pub async fn query_contract(
        &self,
        contract_name: &str,
        function_name: &str,
        input: QueryInput,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome, LedgerClientError> {
        let contract = self.contract(contract_name)?;
        Ok(contract.query(function_name, input, cancel).await?)
    }

    /// `sendProcedure`: resolves the procedure's target identity and payload
    /// via the interface registry, then builds + broadcasts (no wait).
    pub async fn send_procedure(
        &self,
        source: SeedSource,
        contract_name: &str,
        procedure_name: &str,
        input_bytes: Option<Vec<u8>>,
        input_value: Option<serde_json::Value>,
    ) -> Result<(SignedTransaction, BroadcastResult), LedgerClientError> {
        let input = self.build_procedure_input(
            source,
            contract_name,
            procedure_name,
            input_bytes,
            input_value,
        )?;
        self.send(input).await
    }

    /// `sendProcedureAndConfirm`: as above, then waits for confirmation via
    /// the builder directly (procedures do not go through the queue).
    pub async fn send_procedure_and_confirm(
        &self,
        source: SeedSource,
        contract_name: &str,
        procedure_name: &str,
        input_bytes: Option<Vec<u8>>,
        input_value: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<(SignedTransaction, BroadcastResult), LedgerClientError> {
        let input = self.build_procedure_input(
            source,
            contract_name,
            procedure_name,
            input_bytes,
            input_value,
        )?;
        Ok(self
            .builder
            .send_and_confirm(input, self.confirmation, cancel)
            .await?)
    }

    /// `sendProcedureAndConfirmWithReceipt`: as above, additionally
    /// returning the confirmed archive record.
    pub async fn send_procedure_and_confirm_with_receipt(
        &self,
        source: SeedSource,
        contract_name: &str,
        procedure_name: &str,
        input_bytes: Option<Vec<u8>>,
        input_value: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<(SignedTransaction, BroadcastResult, QueryTransaction), LedgerClientError> {
        let input = self.build_procedure_input(
            source,
            contract_name,
            procedure_name,
            input_bytes,
            input_value,
        )?;
        Ok(self
            .builder
            .send_and_confirm_with_receipt(input, self.confirmation, cancel)
            .await?)
    }

    fn build_procedure_input(
        &self,
        source: SeedSource,
        contract_name: &str,
        procedure_name: &str,
        input_bytes: Option<Vec<u8>>,
        input_value: Option<serde_json::Value>,
    ) -> Result<BuildInput, LedgerClientError> {
        let contract = self.contract(contract_name)?;
        let request = contract.build_procedure_request(procedure_name, input_bytes, input_value, None)?;
        Ok(BuildInput {
            source,
            to_identity: request.contract_identity,
            amount: 0,
            target_tick: None,
            input_type: Some(request.input_type),
            input_bytes: Some(request.input_bytes),
        })
    }
}
