//! Inbound/outbound wire frames, routed by the `type` field (§4.I step 4).

use crate::subscription::LogSubscription;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Deserialize)]
pub struct WelcomeMessage {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AckMessage {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatchUpCompleteMessage {
    #[serde(default, rename = "scIndex")]
    pub sc_index: Option<u32>,
    #[serde(default, rename = "logType")]
    pub log_type: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogMessage {
    #[serde(rename = "scIndex")]
    pub sc_index: u32,
    #[serde(rename = "logType")]
    pub log_type: u32,
    #[serde(default, rename = "logId")]
    pub log_id: Option<u64>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub tick: Option<u32>,
    #[serde(default, rename = "tickNumber")]
    pub tick_number: Option<u32>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LogMessage {
    pub fn effective_log_id(&self) -> Option<u64> {
        self.log_id.or(self.id)
    }

    pub fn effective_tick(&self) -> Option<u32> {
        self.tick.or(self.tick_number)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IncomingMessage {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    CatchUpComplete(CatchUpCompleteMessage),
    Pong,
    Error(ErrorMessage),
    Log(LogMessage),
}

/// Outbound wire frames (§6.3): a single `action` field distinguishes frame
/// kinds, but `subscribe` covers both the single-subscription and the
/// batched forms, so this is serialized by hand rather than derived.
#[derive(Debug, Clone)]
pub enum OutgoingMessage {
    Subscribe {
        sub: LogSubscription,
    },
    SubscribeBatch {
        subscriptions: Vec<LogSubscription>,
        last_log_id: Option<u64>,
        last_tick: Option<u32>,
    },
    Unsubscribe {
        sc_index: u32,
        log_type: u32,
    },
    UnsubscribeAll,
    Ping,
}

impl Serialize for OutgoingMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            OutgoingMessage::Subscribe { sub } => {
                map.serialize_entry("action", "subscribe")?;
                map.serialize_entry("scIndex", &sub.sc_index)?;
                map.serialize_entry("logType", &sub.log_type)?;
                if let Some(last_tick) = sub.last_tick {
                    map.serialize_entry("lastTick", &last_tick)?;
                }
                if let Some(last_log_id) = sub.last_log_id {
                    map.serialize_entry("lastLogId", &last_log_id)?;
                }
            }
            OutgoingMessage::SubscribeBatch {
                subscriptions,
                last_log_id,
                last_tick,
            } => {
                map.serialize_entry("action", "subscribe")?;
                map.serialize_entry("subscriptions", subscriptions)?;
                if let Some(last_tick) = last_tick {
                    map.serialize_entry("lastTick", last_tick)?;
                }
                if let Some(last_log_id) = last_log_id {
                    map.serialize_entry("lastLogId", last_log_id)?;
                }
            }
            OutgoingMessage::Unsubscribe { sc_index, log_type } => {
                map.serialize_entry("action", "unsubscribe")?;
                map.serialize_entry("scIndex", sc_index)?;
                map.serialize_entry("logType", log_type)?;
            }
            OutgoingMessage::UnsubscribeAll => {
                map.serialize_entry("action", "unsubscribeAll")?;
            }
            OutgoingMessage::Ping => {
                map.serialize_entry("action", "ping")?;
            }
        }
        map.end()
    }
}
