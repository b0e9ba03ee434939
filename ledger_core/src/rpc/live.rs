//! The "live" (current-state) RPC surface (component A).

use super::transport::Transport;
use crate::errors::TransportError;
use crate::wide_int::deserialize_wide_u64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct TickInfo {
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub tick: u64,
    #[serde(default, rename = "epoch")]
    pub epoch: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub balance: u64,
    #[serde(default, deserialize_with = "deserialize_wide_u64")]
    pub valid_for_tick: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastTransactionRequest {
    pub encoded_transaction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastTransactionResponse {
    pub peers_broadcasted: i32,
    pub encoded_transaction: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuerySmartContractRequest {
    pub contract_index: u32,
    pub input_type: u16,
    pub input_size: u32,
    pub request_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySmartContractResponse {
    pub response_data: String,
}

/// The live surface: `tickInfo`, `balance`, `broadcastTransaction`, `querySmartContract`.
#[derive(Clone)]
pub struct LiveClient {
    transport: Arc<Transport>,
}

impl LiveClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn tick_info(&self) -> Result<TickInfo, TransportError> {
        self.transport.get_json("live/v1/tick-info", &[]).await
    }

    pub async fn balance(&self, identity: &str) -> Result<Balance, TransportError> {
        self.transport
            .get_json(&format!("live/v1/balances/{identity}"), &[])
            .await
    }

    pub async fn broadcast_transaction(
        &self,
        encoded_transaction_base64: String,
    ) -> Result<BroadcastTransactionResponse, TransportError> {
        let body = BroadcastTransactionRequest {
            encoded_transaction: encoded_transaction_base64,
        };
        self.transport
            .post_json("live/v1/broadcast-transaction", &body)
            .await
    }

    pub async fn query_smart_contract(
        &self,
        contract_index: u32,
        input_type: u16,
        input_bytes: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        use base64::Engine;
        let request_data = base64::engine::general_purpose::STANDARD.encode(input_bytes);
        let body = QuerySmartContractRequest {
            contract_index,
            input_type,
            input_size: input_bytes.len() as u32,
            request_data,
        };
        let response: QuerySmartContractResponse = self
            .transport
            .post_json("live/v1/querySmartContract", &body)
            .await?;
        base64::engine::general_purpose::STANDARD
            .decode(response.response_data)
            .map_err(|err| TransportError::InvalidJson(err.to_string()))
    }
}
