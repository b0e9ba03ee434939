//! Process-wide error taxonomy shared by every crate in this workspace.
//!
//! Each variant is matchable by calling code (see the accessor methods below);
//! `Display` messages are meant for logs, not end users.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Details captured from a non-2xx HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFailure {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    pub body_text: String,
}

/// Errors raised by the RPC transport (component A).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {} failed with status {}: {}", .0.url, .0.status, .0.body_text)]
    RequestFailed(Box<RequestFailure>),

    #[error("response body was not valid JSON: {0}")]
    InvalidJson(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    /// A 404 from `getTransactionByHash` is a distinguished, non-fatal signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::RequestFailed(f) if f.status == 404)
    }
}

/// Errors raised by the log-stream engine's WebSocket transport.
#[derive(Debug, Error)]
pub enum StreamTransportError {
    #[error("websocket request failed: {0}")]
    RequestFailed(String),

    #[error("inbound frame was not valid JSON: {0}")]
    InvalidJson(String),
}

/// Input validation failures (no RPC call has been attempted yet).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("tick offset {offset} is outside the configured range [{min}, {max}]")]
    TickOffsetOutOfRange { offset: i64, min: u64, max: u64 },

    #[error("input size mismatch: expected {expected} bytes, got {actual}")]
    InputSizeMismatch { expected: u32, actual: usize },

    #[error("value is not valid hex: {0}")]
    InvalidHex(String),

    #[error("send-many list has {count} entries, maximum is {max}")]
    SendManyTooLong { count: usize, max: usize },

    #[error("tick {0} does not fit in a u32")]
    TickOutOfU32Range(u64),

    #[error("identity string has invalid length or encoding: {0}")]
    InvalidIdentity(String),
}

/// Domain-level failures raised by the confirmation engine, queue, and
/// contract-query/interface layers.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("transaction was not found after reaching the target tick")]
    TxNotFound,

    #[error("confirmation timed out before the target tick was reached")]
    TxConfirmationTimeout,

    #[error("confirmation was aborted")]
    TxConfirmationAborted,

    #[error("queued transaction ended with status {status}: {cause}")]
    QueuedTransaction { status: String, cause: String },

    #[error("contract query was aborted")]
    ContractQueryAborted,

    #[error("interface entry `{0}` not found")]
    InterfaceEntryNotFound(String),

    #[error("no codec registered for interface entry `{0}`")]
    InterfaceCodecMissing(String),

    #[error("codec validation failed: {0}")]
    InterfaceCodecValidation(String),

    #[error("codec error on entry `{entry}`: {message}")]
    InterfaceCodec { entry: String, message: String },
}

/// Seed-vault specific failures (component J).
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault file not found at {0}")]
    NotFound(String),

    #[error("invalid passphrase")]
    InvalidPassphrase,

    #[error("no vault entry matches `{0}`")]
    EntryNotFound(String),

    #[error("a vault entry named `{0}` already exists")]
    EntryExists(String),

    #[error("vault error: {0}")]
    Generic(String),
}

/// Configuration construction failures. Always raised eagerly, never at call time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration field `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// Top-level error enum that every public entry point in this workspace
/// ultimately returns. Library code should prefer returning this type (or a
/// crate-local subset) over `anyhow::Error`; `anyhow` is reserved for
/// binaries, examples, and tests.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    StreamTransport(#[from] StreamTransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished_from_other_statuses() {
        let not_found = TransportError::RequestFailed(Box::new(RequestFailure {
            url: "https://x/query/v1/getTransactionByHash".into(),
            method: "POST".into(),
            status: 404,
            status_text: "Not Found".into(),
            body_text: String::new(),
        }));
        assert!(not_found.is_not_found());

        let server_error = TransportError::RequestFailed(Box::new(RequestFailure {
            url: "https://x".into(),
            method: "GET".into(),
            status: 500,
            status_text: "Internal Server Error".into(),
            body_text: String::new(),
        }));
        assert!(!server_error.is_not_found());
    }
}
