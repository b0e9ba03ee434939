pub mod cursor;
pub mod engine;
pub mod message;
pub mod socket;
pub mod subscription;

pub use cursor::{cursor_key, CursorStore, FileCursorStore, InMemoryCursorStore, LogCursor};
pub use engine::{run, LogStreamConfig, LogStreamHandle, LogStreamHandlers};
pub use message::{
    AckMessage, CatchUpCompleteMessage, ErrorMessage, IncomingMessage, LogMessage,
    OutgoingMessage, WelcomeMessage,
};
pub use socket::{InboundReceiver, OutboundFrame, OutboundSender, SocketFactory, TungsteniteSocketFactory};
pub use subscription::LogSubscription;
