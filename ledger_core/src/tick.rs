//! Component B: tick helper.

use crate::config::TickOffsetConfig;
use crate::errors::{LedgerError, ValidationError};
use crate::rpc::LiveClient;

/// Reads the current tick and returns a target tick, guarded by the
/// configured `[min_offset, max_offset]` range.
#[derive(Clone)]
pub struct TickHelper {
    live: LiveClient,
    config: TickOffsetConfig,
}

impl TickHelper {
    pub fn new(live: LiveClient, config: TickOffsetConfig) -> Self {
        Self { live, config }
    }

    /// `getSuggestedTargetTick`: validates the offset before making any RPC
    /// call, then returns `current_tick + offset`.
    pub async fn suggested_target_tick(&self, offset: Option<u64>) -> Result<u64, LedgerError> {
        let offset = offset.unwrap_or(self.config.default_offset);
        if offset < self.config.min_offset || offset > self.config.max_offset {
            return Err(ValidationError::TickOffsetOutOfRange {
                offset: offset as i64,
                min: self.config.min_offset,
                max: self.config.max_offset,
            }
            .into());
        }
        let info = self.live.tick_info().await.map_err(LedgerError::from)?;
        Ok(info.tick + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Transport;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn helper_against(server: &MockServer, config: TickOffsetConfig) -> TickHelper {
        let transport = Arc::new(Transport::new(&server.uri()).unwrap());
        TickHelper::new(LiveClient::new(transport), config)
    }

    #[tokio::test]
    async fn rejects_offset_outside_range_without_any_rpc_call() {
        let server = MockServer::start().await;
        // Deliberately register no mock: a call would fail loudly, proving
        // the validation short-circuits before any request is issued.
        let helper = helper_against(
            &server,
            TickOffsetConfig {
                min_offset: 0,
                default_offset: 5,
                max_offset: 10,
            },
        )
        .await;
        let err = helper.suggested_target_tick(Some(99)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::TickOffsetOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn adds_offset_to_current_tick() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live/v1/tick-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tick": 1000})))
            .mount(&server)
            .await;
        let helper = helper_against(
            &server,
            TickOffsetConfig {
                min_offset: 0,
                default_offset: 5,
                max_offset: 10,
            },
        )
        .await;
        let target = helper.suggested_target_tick(Some(7)).await.unwrap();
        assert_eq!(target, 1007);
    }
}
