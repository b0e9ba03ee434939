//! Codec interface (§4.H) and the per-contract codec registry.
//!
//! The registry is a dynamically-typed, sum-typed table keyed by entry name:
//! callers implement [`Codec`] against their own value type, and
//! [`TypedCodec`] erases it to [`ErasedCodec`] (operating over
//! `serde_json::Value`) so the registry can hold codecs for many different
//! value types side by side. Codec-validation happens once, at registry
//! construction (see [`crate::registry::InterfaceRegistry::new`]), never per call.

use crate::file::{EntryKind, InterfaceEntry};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// A statically-typed encode/decode pair for one interface entry's payload.
pub trait Codec: Send + Sync {
    type Value: Serialize + DeserializeOwned;

    fn encode(&self, entry: &InterfaceEntry, value: &Self::Value) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, entry: &InterfaceEntry, bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

/// Type-erased codec, keyed by entry name in the registry. Encode/decode
/// failures are wrapped to [`CodecError`] and never leak a foreign exception
/// type into callers (§4.H).
pub trait ErasedCodec: Send + Sync {
    fn encode_value(
        &self,
        entry: &InterfaceEntry,
        value: &serde_json::Value,
    ) -> Result<Vec<u8>, CodecError>;
    fn decode_value(
        &self,
        entry: &InterfaceEntry,
        bytes: &[u8],
    ) -> Result<serde_json::Value, CodecError>;
}

/// Adapts a statically-typed [`Codec`] to the registry's erased interface.
pub struct TypedCodec<C: Codec> {
    inner: C,
    _value: PhantomData<C::Value>,
}

impl<C: Codec> TypedCodec<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            _value: PhantomData,
        }
    }
}

impl<C: Codec> ErasedCodec for TypedCodec<C> {
    fn encode_value(
        &self,
        entry: &InterfaceEntry,
        value: &serde_json::Value,
    ) -> Result<Vec<u8>, CodecError> {
        let typed: C::Value = serde_json::from_value(value.clone())
            .map_err(|err| CodecError::Encode(err.to_string()))?;
        self.inner.encode(entry, &typed)
    }

    fn decode_value(
        &self,
        entry: &InterfaceEntry,
        bytes: &[u8],
    ) -> Result<serde_json::Value, CodecError> {
        let typed = self.inner.decode(entry, bytes)?;
        serde_json::to_value(typed).map_err(|err| CodecError::Decode(err.to_string()))
    }
}

/// One named codec binding: which contract/kind/entry it applies to.
pub struct CodecBinding {
    pub contract_name: String,
    pub kind: EntryKind,
    pub entry_name: String,
    pub codec: Arc<dyn ErasedCodec>,
}

struct RegisteredCodec {
    kind: EntryKind,
    codec: Arc<dyn ErasedCodec>,
}

/// The codec registry supplied at [`crate::registry::InterfaceRegistry`]
/// construction. Validated against the loaded interface files before the
/// registry is usable.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<(String, String), Arc<RegisteredCodec>>,
}

impl Clone for RegisteredCodec {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            codec: self.codec.clone(),
        }
    }
}

impl CodecRegistry {
    pub fn new(bindings: Vec<CodecBinding>) -> Self {
        let codecs = bindings
            .into_iter()
            .map(|binding| {
                (
                    (binding.contract_name, binding.entry_name),
                    Arc::new(RegisteredCodec {
                        kind: binding.kind,
                        codec: binding.codec,
                    }),
                )
            })
            .collect();
        Self { codecs }
    }

    pub fn get(&self, contract_name: &str, entry_name: &str) -> Option<Arc<dyn ErasedCodec>> {
        self.codecs
            .get(&(contract_name.to_string(), entry_name.to_string()))
            .map(|registered| registered.codec.clone())
    }

    /// Every `(contract, kind, entryName)` triple a codec was registered for;
    /// used at registry construction to verify each one names a real entry.
    pub(crate) fn bindings_for_validation(&self) -> impl Iterator<Item = (&str, EntryKind, &str)> {
        self.codecs
            .iter()
            .map(|((contract, entry), registered)| {
                (contract.as_str(), registered.kind, entry.as_str())
            })
    }
}
