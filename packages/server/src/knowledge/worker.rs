use std::time::Duration;

use common::knowledge::EntryStatus;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::chunker::chunk_text;
use crate::config::IndexingConfig;
use crate::entity::{knowledge_chunk, knowledge_entry};

/// Chunks written per INSERT. Each row binds three parameters, which keeps a
/// statement well under SQLite's 32766 and Postgres' 65535 bind limits.
const CHUNK_INSERT_BATCH: usize = 500;

/// What happened to a single pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    Ready { chunks: usize },
    Failed,
    /// Another worker or a delete got there first.
    Skipped,
}

/// Moves pending entries to `ready` by splitting their text into chunks.
///
/// Entries whose text yields no chunk are marked `failed`.
#[derive(Clone)]
pub struct IndexingWorker {
    db: DatabaseConnection,
    config: IndexingConfig,
}

impl IndexingWorker {
    pub fn new(db: DatabaseConnection, config: IndexingConfig) -> Self {
        Self { db, config }
    }

    /// Run the worker as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            batch_size = self.config.batch_size,
            chunk_size = self.config.chunk_size,
            "Starting indexing worker"
        );

        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));

        loop {
            interval.tick().await;

            match self.run_once().await {
                Ok(0) => {}
                Ok(processed) => debug!(processed, "Indexed pending entries"),
                Err(e) => error!(error = %e, "Indexing pass failed"),
            }
        }
    }

    /// Process one batch of pending entries, oldest first.
    ///
    /// Returns how many entries changed status.
    pub async fn run_once(&self) -> Result<usize, DbErr> {
        let pending: Vec<Uuid> = knowledge_entry::Entity::find()
            .select_only()
            .column(knowledge_entry::Column::Id)
            .filter(knowledge_entry::Column::Status.eq(EntryStatus::Pending))
            .order_by_asc(knowledge_entry::Column::Id)
            .limit(Some(self.config.batch_size))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut processed = 0;
        for entry_id in pending {
            match self.index_entry(entry_id).await {
                Ok(IndexOutcome::Skipped) => {}
                Ok(IndexOutcome::Ready { chunks }) => {
                    debug!(%entry_id, chunks, "Entry ready");
                    processed += 1;
                }
                Ok(IndexOutcome::Failed) => {
                    warn!(%entry_id, "Entry has no indexable text");
                    processed += 1;
                }
                Err(e) if is_transient(&e) => {
                    warn!(%entry_id, error = %e, "Indexing interrupted, will retry");
                }
                Err(e) => {
                    error!(%entry_id, error = %e, "Failed to index entry");
                    match self.mark_failed(entry_id).await {
                        Ok(true) => processed += 1,
                        Ok(false) => {}
                        Err(e) => error!(%entry_id, error = %e, "Failed to mark entry failed"),
                    }
                }
            }
        }

        Ok(processed)
    }

    async fn index_entry(&self, entry_id: Uuid) -> Result<IndexOutcome, DbErr> {
        let txn = self.db.begin().await?;

        let Some(entry) = knowledge_entry::Entity::find_by_id(entry_id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(IndexOutcome::Skipped);
        };

        if entry.status != EntryStatus::Pending {
            txn.rollback().await?;
            return Ok(IndexOutcome::Skipped);
        }

        let chunks = chunk_text(&entry.text, self.config.chunk_size);
        let (status, outcome) = if chunks.is_empty() {
            (EntryStatus::Failed, IndexOutcome::Failed)
        } else {
            (
                EntryStatus::Ready,
                IndexOutcome::Ready {
                    chunks: chunks.len(),
                },
            )
        };

        // Claim the entry; a concurrent worker that already moved it wins.
        let claimed = knowledge_entry::Entity::update_many()
            .col_expr(knowledge_entry::Column::Status, Expr::value(status))
            .filter(knowledge_entry::Column::Id.eq(entry_id))
            .filter(knowledge_entry::Column::Status.eq(EntryStatus::Pending))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(IndexOutcome::Skipped);
        }

        for (batch_index, batch) in chunks.chunks(CHUNK_INSERT_BATCH).enumerate() {
            let offset = batch_index * CHUNK_INSERT_BATCH;
            let models = batch
                .iter()
                .enumerate()
                .map(|(i, content)| knowledge_chunk::ActiveModel {
                    entry_id: Set(entry_id),
                    position: Set((offset + i) as i32),
                    content: Set(content.clone()),
                    ..Default::default()
                });
            knowledge_chunk::Entity::insert_many(models)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(outcome)
    }

    /// Move a still-pending entry to `failed` so it stops occupying a batch slot.
    async fn mark_failed(&self, entry_id: Uuid) -> Result<bool, DbErr> {
        let res = knowledge_entry::Entity::update_many()
            .col_expr(
                knowledge_entry::Column::Status,
                Expr::value(EntryStatus::Failed),
            )
            .filter(knowledge_entry::Column::Id.eq(entry_id))
            .filter(knowledge_entry::Column::Status.eq(EntryStatus::Pending))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }
}

/// Connection-level failures; the entry itself is not at fault.
fn is_transient(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}
