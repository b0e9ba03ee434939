//! Pluggable socket transport (§4.I step 1: "create the socket, factory
//! pluggable for tests").

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use ledger_core::errors::StreamTransportError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// A frame queued for the outbound socket task: either a text payload or a
/// request to close the underlying connection.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

pub type OutboundSender = mpsc::UnboundedSender<OutboundFrame>;
pub type InboundReceiver = mpsc::UnboundedReceiver<Result<String, StreamTransportError>>;

#[async_trait]
pub trait SocketFactory: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(OutboundSender, InboundReceiver), StreamTransportError>;
}

/// Real WebSocket transport over `tokio-tungstenite`.
pub struct TungsteniteSocketFactory;

#[async_trait]
impl SocketFactory for TungsteniteSocketFactory {
    async fn connect(&self, url: &str) -> Result<(OutboundSender, InboundReceiver), StreamTransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| StreamTransportError::RequestFailed(err.to_string()))?;
        let (mut ws_sink, mut ws_stream) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Result<String, StreamTransportError>>();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if ws_sink.send(WsMessage::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    OutboundFrame::Close => break,
                }
            }
            let _ = ws_sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_stream.next().await {
                let mapped = match frame {
                    Ok(WsMessage::Text(text)) => Ok(text),
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => Err(StreamTransportError::RequestFailed(err.to_string())),
                };
                let is_err = mapped.is_err();
                if inbound_tx.send(mapped).is_err() || is_err {
                    break;
                }
            }
        });

        Ok((outbound_tx, inbound_rx))
    }
}
