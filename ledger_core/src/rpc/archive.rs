//! The "query" (archive) RPC surface (component A).

use super::transport::Transport;
use crate::errors::TransportError;
use crate::wide_int::{deserialize_wide_u128, deserialize_wide_u64};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct LastProcessedTick {
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub tick: u64,
}

/// A confirmed transaction record as returned by the archive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTransaction {
    pub hash: String,
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub amount: u64,
    pub source: String,
    pub destination: String,
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub tick_number: u64,
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub timestamp: u64,
    pub input_type: u16,
    pub input_size: u32,
    pub input_data: String,
    pub signature: String,
    #[serde(default)]
    pub money_flew: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionByHashRequest<'a> {
    pub hash: &'a str,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_to: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionsForIdentityRequest<'a> {
    pub identity: &'a str,
    #[serde(default)]
    pub filters: TransactionFilters,
    #[serde(default)]
    pub ranges: TransactionRanges,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsForIdentityResponse {
    pub transactions: Vec<QueryTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickData {
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub tick: u64,
    pub epoch: u32,
    pub signature: String,
    #[serde(default)]
    pub transaction_hashes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessedTickInterval {
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub initial_processed_tick: u64,
    #[serde(deserialize_with = "deserialize_wide_u64")]
    pub last_processed_tick: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputorListForEpochRequest {
    pub epoch: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputorList {
    pub epoch: u32,
    pub identities: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_wide_u128")]
    pub signature_weight: u128,
}

/// The archive surface: `getLastProcessedTick`, `getTransactionByHash`, and friends.
#[derive(Clone)]
pub struct ArchiveClient {
    transport: Arc<Transport>,
}

impl ArchiveClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn get_last_processed_tick(&self) -> Result<u64, TransportError> {
        let response: LastProcessedTick = self
            .transport
            .get_json("query/v1/getLastProcessedTick", &[])
            .await?;
        Ok(response.tick)
    }

    /// Returns `Ok(None)` on a 404, distinguishing "not found" from a transport failure.
    pub async fn get_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<QueryTransaction>, TransportError> {
        self.transport
            .post_json_optional("query/v1/getTransactionByHash", &TransactionByHashRequest { hash })
            .await
    }

    pub async fn get_transactions_for_identity(
        &self,
        request: &TransactionsForIdentityRequest<'_>,
    ) -> Result<Vec<QueryTransaction>, TransportError> {
        let response: TransactionsForIdentityResponse = self
            .transport
            .post_json("query/v1/getTransactionsForIdentity", request)
            .await?;
        Ok(response.transactions)
    }

    pub async fn get_transactions_for_tick(
        &self,
        tick: u64,
    ) -> Result<Vec<QueryTransaction>, TransportError> {
        #[derive(Serialize)]
        struct Request {
            tick: u64,
        }
        #[derive(Deserialize)]
        struct Response {
            transactions: Vec<QueryTransaction>,
        }
        let response: Response = self
            .transport
            .post_json("query/v1/getTransactionsForTick", &Request { tick })
            .await?;
        Ok(response.transactions)
    }

    pub async fn get_tick_data(&self, tick: u64) -> Result<TickData, TransportError> {
        #[derive(Serialize)]
        struct Request {
            tick: u64,
        }
        self.transport
            .post_json("query/v1/getTickData", &Request { tick })
            .await
    }

    pub async fn get_processed_tick_intervals(
        &self,
    ) -> Result<Vec<ProcessedTickInterval>, TransportError> {
        self.transport
            .get_json("query/v1/getProcessedTickIntervals", &[])
            .await
    }

    pub async fn get_computor_lists_for_epoch(
        &self,
        epoch: u32,
    ) -> Result<ComputorList, TransportError> {
        self.transport
            .post_json(
                "query/v1/getComputorListsForEpoch",
                &ComputorListForEpochRequest { epoch },
            )
            .await
    }
}
