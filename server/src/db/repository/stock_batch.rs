//! Stock Batch Repository
//!
//! Batch creation carries the "availability flip": when a new batch brings
//! plate-capable lines, every plate-capable line of the shop's earlier
//! same-day batches is switched to `is_available = false`, so plate
//! consumption always lands on the newest batch. The flip and the insert
//! commit in one guarded transaction.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{
    BaseRepository, RepoError, RepoResult, TxnScript, is_conflict_error, parse_record_id,
};
use crate::db::models::{StockBatch, StockLineKind};

const TABLE: &str = "stock_batch";

/// Bounded retries for optimistic-concurrency conflicts
const MAX_COMMIT_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct StockBatchRepository {
    base: BaseRepository,
}

impl StockBatchRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn db(&self) -> &Surreal<Db> {
        self.base.db()
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<StockBatch>> {
        let rid = parse_record_id(TABLE, id)?;
        let batch: Option<StockBatch> = self.base.db().select(rid).await?;
        Ok(batch)
    }

    pub async fn find_by_shop(&self, shop: &str, limit: i64, offset: i64) -> RepoResult<Vec<StockBatch>> {
        let batches: Vec<StockBatch> = self
            .base
            .db()
            .query(
                "SELECT * FROM stock_batch WHERE shop = $shop \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("shop", shop.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?
            .take(0)?;
        Ok(batches)
    }

    /// Daily Stock Locator: all batches of one shop within the business-day
    /// bounds, oldest first (earlier-entered stock depletes before later
    /// top-ups).
    pub async fn find_for_business_day(
        &self,
        shop: &str,
        start_millis: i64,
        end_millis: i64,
    ) -> RepoResult<Vec<StockBatch>> {
        let batches: Vec<StockBatch> = self
            .base
            .db()
            .query(
                "SELECT * FROM stock_batch WHERE shop = $shop \
                 AND created_at >= $start AND created_at < $end \
                 ORDER BY created_at ASC",
            )
            .bind(("shop", shop.to_string()))
            .bind(("start", start_millis))
            .bind(("end", end_millis))
            .await?
            .take(0)?;
        Ok(batches)
    }

    /// Create a batch, flipping earlier same-day plate lines off when the new
    /// batch has plate-capable lines of its own.
    pub async fn create_for_day(
        &self,
        batch: StockBatch,
        day_start: i64,
        day_end: i64,
    ) -> RepoResult<StockBatch> {
        let flip_needed = batch.has_plate_lines();

        for attempt in 0.. {
            let mut txn = TxnScript::new();

            if flip_needed {
                let earlier = self
                    .find_for_business_day(&batch.shop, day_start, day_end)
                    .await?;
                for mut existing in earlier {
                    let mut touched = false;
                    for line in existing.lines.iter_mut() {
                        if let StockLineKind::PlateCapable { is_available, .. } = &mut line.kind
                            && *is_available
                        {
                            *is_available = false;
                            touched = true;
                        }
                    }
                    if !touched {
                        continue;
                    }
                    let Some(id) = existing.id.clone() else {
                        continue;
                    };
                    let rid = txn.bind_record(id);
                    let lines = txn.bind_value(
                        serde_json::to_value(&existing.lines)
                            .map_err(|e| RepoError::Database(e.to_string()))?,
                    );
                    let version = txn.bind_value(serde_json::json!(existing.version));
                    txn.push_guarded(format!(
                        "UPDATE {rid} SET lines = {lines}, version = version + 1 \
                         WHERE version = {version}"
                    ));
                }
            }

            let new_id = parse_record_id(TABLE, &uuid::Uuid::new_v4().simple().to_string())?;
            let mut to_insert = batch.clone();
            to_insert.id = Some(new_id.clone());
            let mut content = serde_json::to_value(&to_insert)
                .map_err(|e| RepoError::Database(e.to_string()))?;
            if let Some(obj) = content.as_object_mut() {
                obj.remove("id");
            }

            let rid = txn.bind_record(new_id.clone());
            let content_var = txn.bind_value(content);
            txn.push(format!("CREATE {rid} CONTENT {content_var}"));

            match txn.run(self.base.db()).await {
                Ok(()) => {
                    let created: Option<StockBatch> = self.base.db().select(new_id).await?;
                    return created
                        .ok_or_else(|| RepoError::Database("Failed to create stock batch".into()));
                }
                Err(e) if is_conflict_error(&e) && attempt + 1 < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(attempt, "Stock batch create hit version conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("bounded retry loop always returns");
    }

    /// Set `is_default`, clearing the flag from the shop's other batches
    pub async fn set_default(&self, id: &str) -> RepoResult<StockBatch> {
        let rid = parse_record_id(TABLE, id)?;
        let batch: Option<StockBatch> = self.base.db().select(rid.clone()).await?;
        let batch = batch.ok_or_else(|| RepoError::NotFound(format!("Stock batch {} not found", id)))?;

        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE stock_batch SET is_default = false WHERE shop = $shop AND is_default = true; \
                 UPDATE $rid SET is_default = true; \
                 COMMIT TRANSACTION;",
            )
            .bind(("shop", batch.shop.clone()))
            .bind(("rid", rid.clone()))
            .await?
            .check()?;

        let updated: Option<StockBatch> = self.base.db().select(rid).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Stock batch {} not found", id)))
    }

    /// Clear `is_default` on one batch
    pub async fn unset_default(&self, id: &str) -> RepoResult<StockBatch> {
        let rid = parse_record_id(TABLE, id)?;
        let updated: Vec<StockBatch> = self
            .base
            .db()
            .query("UPDATE $rid SET is_default = false RETURN AFTER")
            .bind(("rid", rid))
            .await?
            .take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Stock batch {} not found", id)))
    }

    /// Toggle a plate-capable line's availability gate
    pub async fn set_line_availability(
        &self,
        id: &str,
        product: &str,
        available: bool,
    ) -> RepoResult<StockBatch> {
        for attempt in 0.. {
            let mut batch = self
                .find_by_id(id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Stock batch {} not found", id)))?;

            let mut touched = false;
            for line in batch.lines.iter_mut() {
                if line.product == product
                    && let StockLineKind::PlateCapable { is_available, .. } = &mut line.kind
                {
                    *is_available = available;
                    touched = true;
                }
            }
            if !touched {
                return Err(RepoError::Validation(format!(
                    "No plate-capable line for product {} in batch {}",
                    product, id
                )));
            }

            let Some(rid) = batch.id.clone() else {
                return Err(RepoError::Database("Batch missing id".into()));
            };

            let mut txn = TxnScript::new();
            let rid_var = txn.bind_record(rid);
            let lines = txn.bind_value(
                serde_json::to_value(&batch.lines)
                    .map_err(|e| RepoError::Database(e.to_string()))?,
            );
            let version = txn.bind_value(serde_json::json!(batch.version));
            txn.push_guarded(format!(
                "UPDATE {rid_var} SET lines = {lines}, version = version + 1 \
                 WHERE version = {version}"
            ));

            match txn.run(self.base.db()).await {
                Ok(()) => {
                    return self
                        .find_by_id(id)
                        .await?
                        .ok_or_else(|| RepoError::NotFound(format!("Stock batch {} not found", id)));
                }
                Err(e) if is_conflict_error(&e) && attempt + 1 < MAX_COMMIT_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
        unreachable!("bounded retry loop always returns");
    }

    /// Hard delete a batch
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let rid = parse_record_id(TABLE, id)?;
        let deleted: Option<StockBatch> = self.base.db().delete(rid).await?;
        Ok(deleted.is_some())
    }
}
