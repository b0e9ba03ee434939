//! The SDK's public façade crate (§2): composes the RPC transport, tick
//! helper, crypto collaborator, vault, and interface registry into the
//! confirmation engine, transaction builder, transaction queue, and the
//! transfer/procedure façade.

pub mod builder;
pub mod confirm;
pub mod facade;
pub mod queue;
pub mod send_many;

pub use builder::{BroadcastResult, BuildInput, BuilderError, SignedTransaction, TransactionBuilder};
pub use confirm::{ConfirmError, ConfirmationEngine, ConfirmationParams};
pub use facade::{LedgerClient, LedgerClientError};
pub use queue::{QueueError, QueueItem, QueueStatus, TransactionQueue};
pub use send_many::{encode_send_many, SendManyTransfer, SEND_MANY_MAX_TRANSFERS, SEND_MANY_PAYLOAD_SIZE};
