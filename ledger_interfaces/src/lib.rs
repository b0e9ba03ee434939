//! Declarative contract-interface loading, codec binding, and contract
//! query/procedure-request resolution (components G and H).
//!
//! This crate never signs or broadcasts a transaction — [`ContractHandle`]
//! resolves and validates procedure inputs and hands back a plain
//! [`ProcedureRequest`] value object; the caller's SDK façade is responsible
//! for turning that into a signed, broadcast transaction.

pub mod codec;
pub mod file;
pub mod registry;

pub use codec::{Codec, CodecBinding, CodecError, CodecRegistry, ErasedCodec, TypedCodec};
pub use file::{ContractDescriptor, EntryKind, InterfaceEntry, InterfaceFile};
pub use registry::{
    query_raw, ContractHandle, InterfaceError, InterfaceRegistry, ProcedureRequest, QueryInput,
    QueryOutcome, RawQueryResult,
};
