//! Component E: the transaction queue. One active item per source identity;
//! history is append-only. Guarded per source by a `tokio::sync::Mutex` held
//! only for the duration of a transition, never for the in-flight work.

use crate::builder::{BroadcastResult, BuilderError, SignedTransaction, TransactionBuilder};
use crate::confirm::{ConfirmError, ConfirmationEngine, ConfirmationParams};
use crossbeam_skiplist::SkipMap;
use ledger_core::config::QueuePolicy;
use ledger_core::errors::DomainError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("a transaction is already active for this source identity")]
    Busy,
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Submitted,
    Confirming,
    Confirmed,
    Failed,
    Superseded,
}

/// §3, `QueueItem<R>`. `R` defaults to [`BroadcastResult`], the only
/// instantiation this workspace produces.
#[derive(Debug, Clone)]
pub struct QueueItem<R = BroadcastResult> {
    pub id: u64,
    pub source_identity: String,
    pub target_tick: u64,
    pub created_at: u64,
    pub status: QueueStatus,
    pub tx_id: Option<String>,
    pub result: Option<R>,
    pub error: Option<String>,
}

impl<R> QueueItem<R> {
    fn new(id: u64, source_identity: String, target_tick: u64) -> Self {
        Self {
            id,
            source_identity,
            target_tick,
            created_at: now_unix_seconds(),
            status: QueueStatus::Pending,
            tx_id: None,
            result: None,
            error: None,
        }
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

struct ActiveHandle {
    target_tick: u64,
    cancel: CancellationToken,
    terminal: watch::Sender<Option<QueueItem>>,
}

#[derive(Default)]
struct SourceSlot {
    active: Mutex<Option<ActiveHandle>>,
}

pub struct TransactionQueue {
    slots: SkipMap<String, Arc<SourceSlot>>,
    policy: QueuePolicy,
    next_id: AtomicU64,
}

impl TransactionQueue {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            slots: SkipMap::new(),
            policy,
            next_id: AtomicU64::new(1),
        }
    }

    fn slot_for(&self, source_identity: &str) -> Arc<SourceSlot> {
        if let Some(entry) = self.slots.get(source_identity) {
            return entry.value().clone();
        }
        self.slots
            .get_or_insert(source_identity.to_string(), Arc::new(SourceSlot::default()))
            .value()
            .clone()
    }

    /// Enqueues an already-signed transaction for broadcast + confirmation,
    /// applying the configured preemption policy against any in-flight item
    /// for the same source identity. Resolves with the terminal item.
    pub async fn enqueue(
        &self,
        builder: &TransactionBuilder,
        source_identity: String,
        signed: SignedTransaction,
        confirmation: ConfirmationParams,
    ) -> Result<QueueItem, QueueError> {
        let slot = self.slot_for(&source_identity);
        let target_tick = signed.target_tick as u64;

        loop {
            let mut active = slot.active.lock().await;
            match &*active {
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let cancel = CancellationToken::new();
                    let (terminal_tx, _terminal_rx) = watch::channel(None);
                    *active = Some(ActiveHandle {
                        target_tick,
                        cancel: cancel.clone(),
                        terminal: terminal_tx.clone(),
                    });
                    drop(active);

                    let item = QueueItem::new(id, source_identity.clone(), target_tick);
                    let terminal_item = self
                        .drive(builder, item, signed, confirmation, &cancel)
                        .await;

                    let mut active = slot.active.lock().await;
                    if matches!(&*active, Some(handle) if handle.target_tick == target_tick) {
                        *active = None;
                    }
                    drop(active);

                    let _ = terminal_tx.send(Some(terminal_item.clone()));
                    return Ok(terminal_item);
                }
                Some(existing) => match self.policy {
                    QueuePolicy::Reject => {
                        return Err(QueueError::Busy);
                    }
                    QueuePolicy::WaitForConfirm => {
                        let mut rx = existing.terminal.subscribe();
                        drop(active);
                        wait_for_terminal(&mut rx).await;
                        continue;
                    }
                    QueuePolicy::ReplaceHigherTick => {
                        if target_tick > existing.target_tick {
                            existing.cancel.cancel();
                            let mut rx = existing.terminal.subscribe();
                            drop(active);
                            wait_for_terminal(&mut rx).await;
                            continue;
                        }
                        return Err(QueueError::Busy);
                    }
                },
            }
        }
    }

    async fn drive(
        &self,
        builder: &TransactionBuilder,
        mut item: QueueItem,
        signed: SignedTransaction,
        confirmation: ConfirmationParams,
        cancel: &CancellationToken,
    ) -> QueueItem {
        if cancel.is_cancelled() {
            item.status = QueueStatus::Superseded;
            return item;
        }

        item.status = QueueStatus::Submitted;
        let broadcast = match builder.broadcast(&signed).await {
            Ok(broadcast) => broadcast,
            Err(err) => {
                item.status = QueueStatus::Failed;
                item.error = Some(err.to_string());
                return item;
            }
        };
        item.tx_id = Some(broadcast.network_tx_id.clone());
        item.result = Some(broadcast.clone());
        item.status = QueueStatus::Confirming;

        let engine = ConfirmationEngine::new(builder.archive().clone());
        match engine
            .wait_for_confirmation(&broadcast.network_tx_id, item.target_tick, confirmation, cancel)
            .await
        {
            Ok(_) => {
                item.status = QueueStatus::Confirmed;
            }
            Err(ConfirmError::Domain(DomainError::TxConfirmationAborted)) => {
                item.status = QueueStatus::Superseded;
            }
            Err(err) => {
                item.status = QueueStatus::Failed;
                item.error = Some(err.to_string());
            }
        }
        item
    }
}

async fn wait_for_terminal(rx: &mut watch::Receiver<Option<QueueItem>>) {
    loop {
        if rx.borrow().is_some() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
