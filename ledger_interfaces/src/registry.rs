//! Component H: interface registry + per-contract helpers, including
//! component G (the contract query helper's sized-retry loop).

use crate::codec::{CodecError, CodecRegistry};
use crate::file::{ContractDescriptor, EntryKind, InterfaceEntry, InterfaceFile};
use base64::Engine;
use ledger_core::errors::{DomainError, TransportError, ValidationError};
use ledger_core::retry::{cancellable_sleep, SleepOutcome};
use ledger_core::rpc::LiveClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("codec error on `{entry}`: {source}")]
    Codec { entry: String, source: CodecError },
    #[error("registry construction failed: {0}")]
    Construction(String),
}

/// Raw sized-retry query result (component G).
#[derive(Debug, Clone)]
pub struct RawQueryResult {
    pub response_bytes: Vec<u8>,
    pub response_base64: String,
    pub attempts: u32,
}

/// Component G: `queryRaw`. Re-issues the query while the response is
/// shorter than `expected_output_size` and attempts remain.
pub async fn query_raw(
    live: &LiveClient,
    contract_index: u32,
    input_type: u16,
    input_bytes: &[u8],
    expected_output_size: Option<u32>,
    retries: u32,
    retry_delay: Duration,
    cancel: &CancellationToken,
) -> Result<RawQueryResult, InterfaceError> {
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(DomainError::ContractQueryAborted.into());
        }
        attempts += 1;
        let response_bytes = live
            .query_smart_contract(contract_index, input_type, input_bytes)
            .await?;

        let short_of_expected = expected_output_size
            .map(|expected| (response_bytes.len() as u32) < expected)
            .unwrap_or(false);

        if short_of_expected && attempts <= retries {
            if cancellable_sleep(retry_delay, cancel).await == SleepOutcome::Cancelled {
                return Err(DomainError::ContractQueryAborted.into());
            }
            continue;
        }

        let response_base64 = base64::engine::general_purpose::STANDARD.encode(&response_bytes);
        return Ok(RawQueryResult {
            response_bytes,
            response_base64,
            attempts,
        });
    }
}

/// Input to [`ContractHandle::query`].
#[derive(Default)]
pub struct QueryInput {
    pub input_bytes: Option<Vec<u8>>,
    pub input_value: Option<serde_json::Value>,
    pub codec_override: Option<Arc<dyn crate::codec::ErasedCodec>>,
    pub expected_output_size: Option<u32>,
    pub allow_size_mismatch: bool,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl QueryInput {
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            input_bytes: Some(bytes),
            ..Self::default()
        }
    }
}

/// Result of a resolved query, with the decoded value attached if a codec applied.
pub struct QueryOutcome {
    pub response_bytes: Vec<u8>,
    pub response_base64: String,
    pub attempts: u32,
    pub decoded: Option<serde_json::Value>,
}

/// A resolved target for building a procedure transaction (§4.H); handed to
/// `ledger_client`'s transaction builder, which owns signing and broadcast.
pub struct ProcedureRequest {
    pub contract_identity: String,
    pub input_type: u16,
    pub input_bytes: Vec<u8>,
}

fn materialize_bytes(
    entry: &InterfaceEntry,
    explicit_bytes: &Option<Vec<u8>>,
    input_value: &Option<serde_json::Value>,
    codec: &Option<Arc<dyn crate::codec::ErasedCodec>>,
    entry_name: &str,
) -> Result<Vec<u8>, InterfaceError> {
    if let Some(bytes) = explicit_bytes {
        return Ok(bytes.clone());
    }
    if let Some(value) = input_value {
        let codec = codec
            .clone()
            .ok_or(DomainError::InterfaceCodecMissing(entry_name.to_string()))?;
        return codec
            .encode_value(entry, value)
            .map_err(|source| InterfaceError::Codec {
                entry: entry_name.to_string(),
                source,
            });
    }
    Ok(Vec::new())
}

/// Per-contract handle returned by [`InterfaceRegistry::contract`].
pub struct ContractHandle<'a> {
    file: &'a InterfaceFile,
    codecs: &'a CodecRegistry,
    live: &'a LiveClient,
}

impl<'a> ContractHandle<'a> {
    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.file.contract
    }

    pub fn get_entry(&self, kind: EntryKind, name: &str) -> Result<&InterfaceEntry, InterfaceError> {
        self.file
            .find_entry(kind, name)
            .ok_or_else(|| DomainError::InterfaceEntryNotFound(name.to_string()).into())
    }

    fn resolve_codec(
        &self,
        entry_name: &str,
        explicit: &Option<Arc<dyn crate::codec::ErasedCodec>>,
    ) -> Option<Arc<dyn crate::codec::ErasedCodec>> {
        explicit
            .clone()
            .or_else(|| self.codecs.get(&self.file.contract.name, entry_name))
    }

    /// `query`: resolves bytes, validates size, delegates to component G,
    /// and attaches a decoded value when a codec is available.
    pub async fn query(
        &self,
        name: &str,
        input: QueryInput,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome, InterfaceError> {
        let entry = self.get_entry(EntryKind::Function, name)?;
        let contract_index = self
            .file
            .contract
            .contract_index
            .ok_or_else(|| InterfaceError::Construction(format!(
                "contract `{}` has no contractIndex required for function queries",
                self.file.contract.name
            )))?;

        let codec = self.resolve_codec(name, &input.codec_override);
        let bytes = materialize_bytes(entry, &input.input_bytes, &input.input_value, &codec, name)?;

        if let Some(expected) = entry.input_size {
            if bytes.len() as u32 != expected && !input.allow_size_mismatch {
                return Err(ValidationError::InputSizeMismatch {
                    expected,
                    actual: bytes.len(),
                }
                .into());
            }
        }

        let expected_output_size = input.expected_output_size.or(entry.output_size);
        let raw = query_raw(
            self.live,
            contract_index,
            entry.input_type,
            &bytes,
            expected_output_size,
            input.retries,
            input.retry_delay,
            cancel,
        )
        .await?;

        let decoded = match &codec {
            Some(codec) => Some(codec.decode_value(entry, &raw.response_bytes).map_err(
                |source| InterfaceError::Codec {
                    entry: name.to_string(),
                    source,
                },
            )?),
            None => None,
        };

        Ok(QueryOutcome {
            response_bytes: raw.response_bytes,
            response_base64: raw.response_base64,
            attempts: raw.attempts,
            decoded,
        })
    }

    /// `queryValue`: same as [`Self::query`] but requires a codec and returns only the decoded value.
    pub async fn query_value(
        &self,
        name: &str,
        input: QueryInput,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, InterfaceError> {
        let outcome = self.query(name, input, cancel).await?;
        outcome
            .decoded
            .ok_or_else(|| DomainError::InterfaceCodecMissing(name.to_string()).into())
    }

    /// Resolves a procedure target and materializes/validates its payload,
    /// returning a value object for `ledger_client` to sign and broadcast.
    /// No `allowSizeMismatch` escape is available for procedures (§4.H).
    pub fn build_procedure_request(
        &self,
        name: &str,
        input_bytes: Option<Vec<u8>>,
        input_value: Option<serde_json::Value>,
        codec_override: Option<Arc<dyn crate::codec::ErasedCodec>>,
    ) -> Result<ProcedureRequest, InterfaceError> {
        let entry = self.get_entry(EntryKind::Procedure, name)?;
        let contract_identity = self.resolve_procedure_identity()?;
        let codec = self.resolve_codec(name, &codec_override);
        let bytes = materialize_bytes(entry, &input_bytes, &input_value, &codec, name)?;

        if let Some(expected) = entry.input_size {
            if bytes.len() as u32 != expected {
                return Err(ValidationError::InputSizeMismatch {
                    expected,
                    actual: bytes.len(),
                }
                .into());
            }
        }

        Ok(ProcedureRequest {
            contract_identity,
            input_type: entry.input_type,
            input_bytes: bytes,
        })
    }

    fn resolve_procedure_identity(&self) -> Result<String, InterfaceError> {
        if let Some(id) = &self.file.contract.contract_id {
            return Ok(id.clone());
        }
        if let Some(hex_key) = &self.file.contract.contract_public_key_hex {
            let bytes = hex::decode(hex_key)
                .map_err(|err| InterfaceError::from(ValidationError::InvalidHex(err.to_string())))?;
            if bytes.len() != 32 {
                return Err(ValidationError::InvalidHex(format!(
                    "contractPublicKeyHex must decode to 32 bytes, got {}",
                    bytes.len()
                ))
                .into());
            }
            let mut public_key = [0u8; 32];
            public_key.copy_from_slice(&bytes);
            return Ok(ledger_crypto::identity_from_public_key(&public_key));
        }
        Err(InterfaceError::Construction(format!(
            "contract `{}` has neither contractId nor contractPublicKeyHex",
            self.file.contract.name
        )))
    }
}

/// Component H: in-memory index of contract interface files.
pub struct InterfaceRegistry {
    files: Vec<InterfaceFile>,
    by_name: HashMap<String, usize>,
    by_index: HashMap<u32, usize>,
    codecs: CodecRegistry,
    live: LiveClient,
}

impl InterfaceRegistry {
    /// Iterates the provided files; duplicate `contract.name` or
    /// `contractIndex` is an error. If a codec registry is supplied, every
    /// `(contract, kind, entryName)` binding must name a real entry.
    pub fn new(
        files: Vec<InterfaceFile>,
        codecs: CodecRegistry,
        live: LiveClient,
    ) -> Result<Self, InterfaceError> {
        let mut by_name = HashMap::new();
        let mut by_index = HashMap::new();

        for (idx, file) in files.iter().enumerate() {
            if by_name.insert(file.contract.name.clone(), idx).is_some() {
                return Err(InterfaceError::Construction(format!(
                    "duplicate contract name `{}`",
                    file.contract.name
                )));
            }
            if let Some(contract_index) = file.contract.contract_index {
                if by_index.insert(contract_index, idx).is_some() {
                    return Err(InterfaceError::Construction(format!(
                        "duplicate contractIndex {contract_index}"
                    )));
                }
            }
        }

        for (contract_name, kind, entry_name) in codecs.bindings_for_validation() {
            let idx = by_name.get(contract_name).ok_or_else(|| {
                InterfaceError::Construction(format!(
                    "codec registered for unknown contract `{contract_name}`"
                ))
            })?;
            let file = &files[*idx];
            if file.find_entry(kind, entry_name).is_none() {
                return Err(InterfaceError::Construction(format!(
                    "codec registered for `{contract_name}.{entry_name}` but no matching entry exists"
                )));
            }
        }

        tracing::debug!(count = files.len(), "ledger_interfaces: registry constructed");
        Ok(Self {
            files,
            by_name,
            by_index,
            codecs,
            live,
        })
    }

    pub fn contract(&self, name: &str) -> Result<ContractHandle<'_>, InterfaceError> {
        let idx = *self
            .by_name
            .get(name)
            .ok_or_else(|| DomainError::InterfaceEntryNotFound(name.to_string()))?;
        Ok(ContractHandle {
            file: &self.files[idx],
            codecs: &self.codecs,
            live: &self.live,
        })
    }

    pub fn contract_by_index(&self, index: u32) -> Result<ContractHandle<'_>, InterfaceError> {
        let idx = *self
            .by_index
            .get(&index)
            .ok_or_else(|| DomainError::InterfaceEntryNotFound(index.to_string()))?;
        Ok(ContractHandle {
            file: &self.files[idx],
            codecs: &self.codecs,
            live: &self.live,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecBinding, TypedCodec};
    use ledger_core::rpc::Transport;
    use std::sync::Arc as StdArc;

    fn sample_file() -> InterfaceFile {
        InterfaceFile {
            contract: ContractDescriptor {
                name: "QX".into(),
                contract_index: Some(1),
                contract_public_key_hex: None,
                contract_id: None,
            },
            entries: vec![InterfaceEntry {
                kind: EntryKind::Function,
                name: "Fees".into(),
                input_type: 1,
                input_size: Some(0),
                output_size: Some(16),
            }],
        }
    }

    fn live_client() -> LiveClient {
        let transport = StdArc::new(Transport::new("https://rpc.example.test").unwrap());
        LiveClient::new(transport)
    }

    #[test]
    fn duplicate_contract_name_is_rejected() {
        let files = vec![sample_file(), sample_file()];
        let err = InterfaceRegistry::new(files, CodecRegistry::default(), live_client())
            .unwrap_err();
        assert!(matches!(err, InterfaceError::Construction(_)));
    }

    #[test]
    fn duplicate_contract_index_is_rejected() {
        let mut second = sample_file();
        second.contract.name = "QY".into();
        let files = vec![sample_file(), second];
        let err = InterfaceRegistry::new(files, CodecRegistry::default(), live_client())
            .unwrap_err();
        assert!(matches!(err, InterfaceError::Construction(_)));
    }

    struct Passthrough;
    impl crate::codec::Codec for Passthrough {
        type Value = serde_json::Value;
        fn encode(
            &self,
            _entry: &InterfaceEntry,
            value: &Self::Value,
        ) -> Result<Vec<u8>, CodecError> {
            Ok(value.to_string().into_bytes())
        }
        fn decode(
            &self,
            _entry: &InterfaceEntry,
            bytes: &[u8],
        ) -> Result<Self::Value, CodecError> {
            serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
        }
    }

    #[test]
    fn codec_naming_nonexistent_entry_fails_construction() {
        let binding = CodecBinding {
            contract_name: "QX".into(),
            kind: EntryKind::Function,
            entry_name: "DoesNotExist".into(),
            codec: StdArc::new(TypedCodec::new(Passthrough)),
        };
        let codecs = CodecRegistry::new(vec![binding]);
        let err = InterfaceRegistry::new(vec![sample_file()], codecs, live_client()).unwrap_err();
        assert!(matches!(err, InterfaceError::Construction(_)));
    }

    #[tokio::test]
    async fn function_query_without_contract_index_reports_construction_error() {
        let mut file = sample_file();
        file.contract.contract_index = None;
        let registry =
            InterfaceRegistry::new(vec![file], CodecRegistry::default(), live_client()).unwrap();
        let contract = registry.contract("QX").unwrap();
        let cancel = CancellationToken::new();
        let err = contract
            .query("Fees", QueryInput::with_bytes(Vec::new()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, InterfaceError::Construction(_)));
    }

    #[tokio::test]
    async fn size_guard_rejects_before_any_rpc_call() {
        let registry =
            InterfaceRegistry::new(vec![sample_file()], CodecRegistry::default(), live_client())
                .unwrap();
        let contract = registry.contract("QX").unwrap();
        let cancel = CancellationToken::new();
        let err = contract
            .query("Fees", QueryInput::with_bytes(vec![1, 2, 3]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterfaceError::Validation(ValidationError::InputSizeMismatch { .. })
        ));
    }
}
