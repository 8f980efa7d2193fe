//! An in-memory [`CheckoutDatabase`] backend.
//!
//! `MemoryDatabase` is what the endpoint tests and the fixtures run against. It is cheap to clone (clones share the
//! same store) and supports failure injection on `put_batch`.
//!
//! Unlike [`crate::SqliteDatabase`], batches are **not** atomic. Entities are written one at a time in batch order, so
//! a failure part-way through leaves the earlier entities in place and reports [`DatabaseError::PartialWrite`].
use std::{collections::HashMap, sync::Arc};

use log::*;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::traits::{CheckoutDatabase, DatabaseError, EntityBatch};

#[derive(Debug, Clone)]
struct Record {
    parent_id: Option<String>,
    body: Value,
    seq: u64,
}

#[derive(Debug, Default)]
struct Store {
    records: HashMap<(String, String), Record>,
    redemptions: Vec<(String, String)>,
    seq: u64,
    /// When set, the next `put_batch` fails after writing this many entities.
    fail_after: Option<usize>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<RwLock<Store>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `put_batch` call fail once `written` entities have been stored. Use 0 to reject the whole batch.
    pub async fn fail_next_write_after(&self, written: usize) {
        self.store.write().await.fail_after = Some(written);
    }

    /// The number of stored entities of the given kind.
    pub async fn count(&self, kind: &str) -> usize {
        self.store.read().await.records.keys().filter(|(k, _)| k == kind).count()
    }
}

impl CheckoutDatabase for MemoryDatabase {
    fn url(&self) -> &str {
        "memory://"
    }

    async fn get_raw(&self, kind: &str, id: &str) -> Result<Option<Value>, DatabaseError> {
        let store = self.store.read().await;
        if store.closed {
            return Err(DatabaseError::Closed);
        }
        Ok(store.records.get(&(kind.to_string(), id.to_string())).map(|r| r.body.clone()))
    }

    async fn children_raw(&self, kind: &str, parent_id: &str) -> Result<Vec<Value>, DatabaseError> {
        let store = self.store.read().await;
        if store.closed {
            return Err(DatabaseError::Closed);
        }
        let mut children = store
            .records
            .iter()
            .filter(|((k, _), r)| k == kind && r.parent_id.as_deref() == Some(parent_id))
            .map(|(_, r)| r)
            .collect::<Vec<_>>();
        children.sort_by_key(|r| r.seq);
        Ok(children.into_iter().map(|r| r.body.clone()).collect())
    }

    async fn put_batch(&self, batch: EntityBatch) -> Result<(), DatabaseError> {
        let mut store = self.store.write().await;
        if store.closed {
            return Err(DatabaseError::Closed);
        }
        let fail_after = store.fail_after.take();
        let total = batch.len();
        for (written, entity) in batch.into_entities().into_iter().enumerate() {
            if fail_after == Some(written) {
                warn!("🗃️ Injected write failure after {written} of {total} entities");
                return Err(DatabaseError::PartialWrite { written, total, reason: "injected failure".into() });
            }
            store.seq += 1;
            let key = (entity.kind.to_string(), entity.id);
            // Replacing a record keeps its original position in ancestor queries
            let seq = store.records.get(&key).map(|r| r.seq).unwrap_or(store.seq);
            store.records.insert(key, Record { parent_id: entity.parent_id, body: entity.body, seq });
        }
        trace!("🗃️ Stored {total} entities");
        Ok(())
    }

    async fn append_redemption(&self, code: &str, order_id: &str) -> Result<(), DatabaseError> {
        let mut store = self.store.write().await;
        if store.closed {
            return Err(DatabaseError::Closed);
        }
        store.redemptions.push((code.to_string(), order_id.to_string()));
        Ok(())
    }

    async fn redemption_count(&self, code: &str) -> Result<i64, DatabaseError> {
        let store = self.store.read().await;
        if store.closed {
            return Err(DatabaseError::Closed);
        }
        Ok(store.redemptions.iter().filter(|(c, _)| c == code).count() as i64)
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        self.store.write().await.closed = true;
        Ok(())
    }
}
