//! Component A: RPC transport, split into the live and archive surfaces that
//! share one [`Transport`].

mod archive;
mod live;
mod transport;

pub use archive::*;
pub use live::*;
pub use transport::{ErrorHook, RequestHook, ResponseHook, Transport, TransportHooks};
