//! Component I: the log-stream engine. Construction connects the socket,
//! sends exactly one bootstrap frame, then hands the caller a [`LogStreamHandle`]
//! for the public actions while a background task dispatches inbound frames.

use crate::cursor::{cursor_key, CursorStore, LogCursor};
use crate::message::{IncomingMessage, OutgoingMessage};
use crate::socket::{InboundReceiver, OutboundFrame, OutboundSender, SocketFactory};
use crate::subscription::LogSubscription;
use ledger_core::errors::StreamTransportError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct LogStreamConfig {
    pub url: String,
    pub subscriptions: Vec<LogSubscription>,
}

type WelcomeHandler = Arc<dyn Fn(crate::message::WelcomeMessage) + Send + Sync>;
type AckHandler = Arc<dyn Fn(crate::message::AckMessage) + Send + Sync>;
type CatchUpHandler = Arc<dyn Fn(crate::message::CatchUpCompleteMessage) + Send + Sync>;
type PongHandler = Arc<dyn Fn() + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(crate::message::ErrorMessage) + Send + Sync>;
type LogHandler = Arc<dyn Fn(crate::message::LogMessage) + Send + Sync>;
type TransportErrorHandler = Arc<dyn Fn(&StreamTransportError) + Send + Sync>;

#[derive(Default, Clone)]
pub struct LogStreamHandlers {
    pub on_welcome: Option<WelcomeHandler>,
    pub on_ack: Option<AckHandler>,
    pub on_catch_up_complete: Option<CatchUpHandler>,
    pub on_pong: Option<PongHandler>,
    pub on_error: Option<ErrorHandler>,
    pub on_log: Option<LogHandler>,
    pub on_transport_error: Option<TransportErrorHandler>,
}

/// Handle for the public actions (§4.I step 5) once the session is running.
#[derive(Clone)]
pub struct LogStreamHandle {
    outbound: OutboundSender,
}

impl LogStreamHandle {
    fn send(&self, message: &OutgoingMessage) -> Result<(), StreamTransportError> {
        let text = serde_json::to_string(message)
            .map_err(|err| StreamTransportError::InvalidJson(err.to_string()))?;
        self.outbound
            .send(OutboundFrame::Text(text))
            .map_err(|_| StreamTransportError::RequestFailed("socket closed".into()))
    }

    pub fn subscribe(&self, sub: LogSubscription) -> Result<(), StreamTransportError> {
        self.send(&OutgoingMessage::Subscribe { sub })
    }

    pub fn subscribe_many(
        &self,
        subscriptions: Vec<LogSubscription>,
        last_log_id: Option<u64>,
        last_tick: Option<u32>,
    ) -> Result<(), StreamTransportError> {
        self.send(&OutgoingMessage::SubscribeBatch {
            subscriptions,
            last_log_id,
            last_tick,
        })
    }

    pub fn unsubscribe(&self, sc_index: u32, log_type: u32) -> Result<(), StreamTransportError> {
        self.send(&OutgoingMessage::Unsubscribe { sc_index, log_type })
    }

    pub fn unsubscribe_all(&self) -> Result<(), StreamTransportError> {
        self.send(&OutgoingMessage::UnsubscribeAll)
    }

    pub fn ping(&self) -> Result<(), StreamTransportError> {
        self.send(&OutgoingMessage::Ping)
    }

    pub fn close(&self) {
        let _ = self.outbound.send(OutboundFrame::Close);
    }
}

/// Resolves each subscription's initial cursor (explicit wins, else the
/// cursor store, else none), then decides batched-vs-individual bootstrap
/// framing per §4.I step 3.
async fn resolve_bootstrap_subscriptions(
    subscriptions: &[LogSubscription],
    cursor_store: Option<&Arc<dyn CursorStore>>,
) -> Vec<LogSubscription> {
    let mut resolved = Vec::with_capacity(subscriptions.len());
    for sub in subscriptions {
        if sub.has_explicit_cursor() {
            resolved.push(sub.clone());
            continue;
        }
        let stored = match cursor_store {
            Some(store) => store.get(&sub.key()).await,
            None => None,
        };
        match stored {
            Some(cursor) => resolved.push(sub.clone().with_cursor(cursor)),
            None => resolved.push(sub.clone()),
        }
    }
    resolved
}

async fn send_bootstrap(
    handle: &LogStreamHandle,
    subscriptions: &[LogSubscription],
    cursor_store: Option<&Arc<dyn CursorStore>>,
) -> Result<(), StreamTransportError> {
    let resolved = resolve_bootstrap_subscriptions(subscriptions, cursor_store).await;
    let any_explicit = resolved.iter().any(|s| s.has_explicit_cursor());

    if !any_explicit && resolved.len() > 1 {
        handle.subscribe_many(resolved, None, None)
    } else {
        for sub in resolved {
            handle.subscribe(sub)?;
        }
        Ok(())
    }
}

async fn record_cursor(store: &Arc<dyn CursorStore>, log: &crate::message::LogMessage) {
    let key = cursor_key(log.sc_index, log.log_type);
    let cursor = match (log.effective_log_id(), log.effective_tick()) {
        (Some(last_log_id), _) => LogCursor {
            last_tick: None,
            last_log_id: Some(last_log_id),
        },
        (None, Some(last_tick)) => LogCursor {
            last_tick: Some(last_tick),
            last_log_id: None,
        },
        (None, None) => return,
    };
    store.set(&key, cursor).await;
}

async fn dispatch_loop(
    mut inbound: InboundReceiver,
    handlers: LogStreamHandlers,
    cursor_store: Option<Arc<dyn CursorStore>>,
    outbound: OutboundSender,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            frame = inbound.recv() => frame,
            _ = cancel.cancelled() => {
                let _ = outbound.send(OutboundFrame::Close);
                return;
            }
        };

        let Some(frame) = frame else {
            return;
        };

        let text = match frame {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "ledger_logstream: transport error");
                if let Some(handler) = &handlers.on_transport_error {
                    handler(&err);
                }
                return;
            }
        };

        let message: IncomingMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "ledger_logstream: dropping unparsable frame");
                continue;
            }
        };

        match message {
            IncomingMessage::Welcome(msg) => {
                if let Some(handler) = &handlers.on_welcome {
                    handler(msg);
                }
            }
            IncomingMessage::Ack(msg) => {
                if let Some(handler) = &handlers.on_ack {
                    handler(msg);
                }
            }
            IncomingMessage::CatchUpComplete(msg) => {
                if let Some(handler) = &handlers.on_catch_up_complete {
                    handler(msg);
                }
            }
            IncomingMessage::Pong => {
                if let Some(handler) = &handlers.on_pong {
                    handler();
                }
            }
            IncomingMessage::Error(msg) => {
                if let Some(handler) = &handlers.on_error {
                    handler(msg);
                }
            }
            IncomingMessage::Log(msg) => {
                if let Some(handler) = &handlers.on_log {
                    handler(msg.clone());
                }
                if let Some(store) = cursor_store.clone() {
                    let msg = msg.clone();
                    tokio::spawn(async move { record_cursor(&store, &msg).await });
                }
            }
        }
    }
}

/// Connects, bootstraps, and spawns the background dispatch task. Returns a
/// handle for the public actions once the bootstrap frame(s) have been sent.
pub async fn run(
    factory: Arc<dyn SocketFactory>,
    config: LogStreamConfig,
    handlers: LogStreamHandlers,
    cursor_store: Option<Arc<dyn CursorStore>>,
    cancel: CancellationToken,
) -> Result<LogStreamHandle, StreamTransportError> {
    let (outbound, inbound) = factory.connect(&config.url).await?;
    let handle = LogStreamHandle {
        outbound: outbound.clone(),
    };
    send_bootstrap(&handle, &config.subscriptions, cursor_store.as_ref()).await?;
    tokio::spawn(dispatch_loop(inbound, handlers, cursor_store, outbound, cancel));
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::InMemoryCursorStore;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn single_subscription_sends_individual_subscribe() {
        let store: Arc<dyn CursorStore> = Arc::new(InMemoryCursorStore::new());
        let (outbound_probe, mut outbound_probe_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        // Build a minimal fake by hand-driving resolve_bootstrap_subscriptions + send_bootstrap.
        let handle = LogStreamHandle {
            outbound: outbound_probe,
        };
        let subs = vec![LogSubscription::new(1, 2)];
        send_bootstrap(&handle, &subs, Some(&store)).await.unwrap();

        let frame = outbound_probe_rx.recv().await.unwrap();
        match frame {
            OutboundFrame::Text(text) => assert!(text.contains("\"subscribe\"")),
            OutboundFrame::Close => panic!("expected a subscribe frame"),
        }
    }

    #[tokio::test]
    async fn multiple_subscriptions_without_explicit_cursor_batch() {
        let (outbound_probe, mut outbound_probe_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let handle = LogStreamHandle {
            outbound: outbound_probe,
        };
        let subs = vec![LogSubscription::new(1, 2), LogSubscription::new(3, 4)];
        send_bootstrap(&handle, &subs, None).await.unwrap();

        let frame = outbound_probe_rx.recv().await.unwrap();
        match frame {
            OutboundFrame::Text(text) => assert!(text.contains("subscriptions")),
            OutboundFrame::Close => panic!("expected a batched subscribe frame"),
        }
        assert!(outbound_probe_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn log_message_updates_cursor_store() {
        let store = Arc::new(InMemoryCursorStore::new());
        let msg = crate::message::LogMessage {
            sc_index: 7,
            log_type: 9,
            log_id: Some(100),
            id: None,
            tick: None,
            tick_number: None,
            payload: serde_json::Value::Null,
        };
        record_cursor(&(store.clone() as Arc<dyn CursorStore>), &msg).await;
        let cursor = store.get(&cursor_key(7, 9)).await.unwrap();
        assert_eq!(cursor.last_log_id, Some(100));
    }
}
