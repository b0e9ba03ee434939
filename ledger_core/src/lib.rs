//! Ambient stack and RPC transport shared by every other crate in this
//! workspace: structured errors, configuration, retry/backoff, wide-integer
//! decoding, logging, and the HTTP transport for the live/archive surfaces.

pub mod config;
pub mod errors;
pub mod retry;
pub mod rpc;
pub mod telemetry;
pub mod tick;
pub mod wide_int;

pub use config::LedgerClientConfig;
pub use errors::LedgerError;
