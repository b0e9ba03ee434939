//! `LogSubscription` (§3) and wire messages exchanged with `wss?://host/ws/logs`.

use crate::cursor::{cursor_key, LogCursor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSubscription {
    #[serde(rename = "scIndex")]
    pub sc_index: u32,
    #[serde(rename = "logType")]
    pub log_type: u32,
    #[serde(default, rename = "lastTick")]
    pub last_tick: Option<u32>,
    #[serde(default, rename = "lastLogId")]
    pub last_log_id: Option<u64>,
}

impl LogSubscription {
    pub fn new(sc_index: u32, log_type: u32) -> Self {
        Self {
            sc_index,
            log_type,
            last_tick: None,
            last_log_id: None,
        }
    }

    pub fn key(&self) -> String {
        cursor_key(self.sc_index, self.log_type)
    }

    pub fn has_explicit_cursor(&self) -> bool {
        self.last_tick.is_some() || self.last_log_id.is_some()
    }

    pub fn cursor(&self) -> Option<LogCursor> {
        if self.has_explicit_cursor() {
            Some(LogCursor {
                last_tick: self.last_tick,
                last_log_id: self.last_log_id,
            })
        } else {
            None
        }
    }

    pub fn with_cursor(mut self, cursor: LogCursor) -> Self {
        self.last_tick = cursor.last_tick;
        self.last_log_id = cursor.last_log_id;
        self
    }
}
