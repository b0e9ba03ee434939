//! Component C: the confirmation engine.
//!
//! A single state machine that polls the archive surface until a broadcast
//! transaction's target tick has been fully processed and the transaction
//! either shows up in the archive or is confirmed absent.

use ledger_core::errors::{DomainError, TransportError};
use ledger_core::retry::{cancellable_sleep, SleepOutcome};
use ledger_core::rpc::{ArchiveClient, QueryTransaction};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Clone)]
pub struct ConfirmationEngine {
    archive: ArchiveClient,
}

/// Parameters for a single confirmation wait; defaults mirror
/// `ledger_core::config::ConfirmationConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationParams {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(60_000),
            poll_interval: Duration::from_millis(1_000),
        }
    }
}

impl ConfirmationEngine {
    pub fn new(archive: ArchiveClient) -> Self {
        Self { archive }
    }

    /// Polls until the transaction is confirmed, confirmed absent, or the
    /// wait times out / is cancelled. `cancel` is expected to already
    /// combine any external token with caller-specific derived tokens
    /// (timeout is handled internally, not via the token).
    pub async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        target_tick: u64,
        params: ConfirmationParams,
        cancel: &CancellationToken,
    ) -> Result<QueryTransaction, ConfirmError> {
        let start = Instant::now();
        let mut seen_not_found_after_target = false;

        loop {
            if cancel.is_cancelled() {
                return Err(DomainError::TxConfirmationAborted.into());
            }

            if start.elapsed() > params.timeout {
                if seen_not_found_after_target {
                    return Err(DomainError::TxNotFound.into());
                }
                return Err(DomainError::TxConfirmationTimeout.into());
            }

            let last_processed_tick = self.archive.get_last_processed_tick().await?;
            if last_processed_tick < target_tick {
                if cancellable_sleep(params.poll_interval, cancel).await == SleepOutcome::Cancelled
                {
                    return Err(DomainError::TxConfirmationAborted.into());
                }
                continue;
            }

            match self.archive.get_transaction_by_hash(tx_id).await {
                Ok(Some(record)) => return Ok(record),
                Ok(None) => {
                    seen_not_found_after_target = true;
                    if cancellable_sleep(params.poll_interval, cancel).await
                        == SleepOutcome::Cancelled
                    {
                        return Err(DomainError::TxConfirmationAborted.into());
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::rpc::Transport;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_against(server: &MockServer) -> ConfirmationEngine {
        let transport = Arc::new(Transport::new(&server.uri()).unwrap());
        ConfirmationEngine::new(ArchiveClient::new(transport))
    }

    #[tokio::test]
    async fn succeeds_once_target_tick_processed_and_record_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query/v1/getLastProcessedTick"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tick": 100})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/query/v1/getTransactionByHash"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hash": "abc",
                "amount": 5,
                "source": "SRC",
                "destination": "DST",
                "tickNumber": 100,
                "timestamp": 0,
                "inputType": 0,
                "inputSize": 0,
                "inputData": "",
                "signature": "",
            })))
            .mount(&server)
            .await;

        let engine = engine_against(&server);
        let cancel = CancellationToken::new();
        let record = engine
            .wait_for_confirmation("abc", 100, ConfirmationParams::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(record.hash, "abc");
    }

    #[tokio::test]
    async fn not_found_after_target_tick_past_timeout_is_distinguished_from_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query/v1/getLastProcessedTick"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tick": 100})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/query/v1/getTransactionByHash"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let engine = engine_against(&server);
        let cancel = CancellationToken::new();
        let params = ConfirmationParams {
            timeout: Duration::from_millis(5),
            poll_interval: Duration::from_millis(1),
        };
        let err = engine
            .wait_for_confirmation("abc", 100, params, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfirmError::Domain(DomainError::TxNotFound)
        ));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query/v1/getLastProcessedTick"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tick": 1})))
            .mount(&server)
            .await;

        let engine = engine_against(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine
            .wait_for_confirmation("abc", 100, ConfirmationParams::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfirmError::Domain(DomainError::TxConfirmationAborted)
        ));
    }
}
