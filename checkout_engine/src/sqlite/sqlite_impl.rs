//! `SqliteDatabase` is the production [`CheckoutDatabase`] backend.
//!
//! Entities live in a single `entities` table as JSON documents, and ancestor queries use the `(kind, parent_id)`
//! index. Batches are written inside one transaction, so a failed batch leaves nothing behind.
use std::fmt::Debug;

use log::*;
use serde_json::Value;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, entities, new_pool, redemptions};
use crate::traits::{CheckoutDatabase, DatabaseError, EntityBatch};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn get_raw(&self, kind: &str, id: &str) -> Result<Option<Value>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        entities::fetch_entity(kind, id, &mut conn).await
    }

    async fn children_raw(&self, kind: &str, parent_id: &str) -> Result<Vec<Value>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        entities::fetch_children(kind, parent_id, &mut conn).await
    }

    async fn put_batch(&self, batch: EntityBatch) -> Result<(), DatabaseError> {
        let total = batch.len();
        let mut tx = self.pool.begin().await?;
        for entity in batch.into_entities() {
            entities::upsert_entity(&entity, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Stored a batch of {total} entities");
        Ok(())
    }

    async fn append_redemption(&self, code: &str, order_id: &str) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        redemptions::insert_redemption(code, order_id, &mut conn).await?;
        debug!("🗃️ Recorded redemption of coupon {code} for order {order_id}");
        Ok(())
    }

    async fn redemption_count(&self, code: &str) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        redemptions::redemption_count(code, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, DatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// The number of stored entities of the given kind.
    pub async fn count(&self, kind: &str) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        entities::count_entities(kind, &mut conn).await
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod test {
    use checkout_common::Cents;

    use super::*;
    use crate::{
        db_types::{Order, Payment, User},
        test_utils::prepare_env::{prepare_test_env, random_db_path},
    };

    async fn database() -> SqliteDatabase {
        let url = random_db_path();
        prepare_test_env(&url).await;
        SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
    }

    #[tokio::test]
    async fn entities_round_trip() {
        let db = database().await;
        let order = Order { id: "ord_1".into(), user_id: "usr_1".into(), total: Cents::from(1_200), ..Default::default() };
        db.put(&order).await.unwrap();
        let fetched = db.get::<Order>("ord_1").await.unwrap().unwrap();
        assert_eq!(fetched, order);
        assert!(db.get::<Order>("ord_2").await.unwrap().is_none());

        let updated = Order { total: Cents::from(900), ..order };
        db.put(&updated).await.unwrap();
        assert_eq!(db.get::<Order>("ord_1").await.unwrap().unwrap().total, Cents::from(900));
        assert_eq!(db.count("order").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ancestor_queries_keep_insertion_order() {
        let db = database().await;
        let payment = |id: &str| Payment { id: id.into(), order_id: "ord_1".into(), ..Default::default() };
        let mut batch = EntityBatch::new();
        batch.add(&payment("pay_b")).unwrap().add(&payment("pay_a")).unwrap().add(&payment("pay_c")).unwrap();
        db.put_batch(batch).await.unwrap();
        db.put(&payment("pay_b")).await.unwrap();
        let ids = db.children::<Payment>("ord_1").await.unwrap().into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["pay_b", "pay_a", "pay_c"]);
        assert!(db.children::<Payment>("ord_2").await.unwrap().is_empty());

        let user = User { id: "usr_1".into(), email: "alice@example.com".into(), ..Default::default() };
        db.put(&user).await.unwrap();
        let found = db.children::<User>(&User::email_key("Alice@Example.com")).await.unwrap();
        assert_eq!(found, vec![user]);
    }

    #[tokio::test]
    async fn failed_batches_write_nothing() {
        let db = database().await;
        db.pool().close().await;
        let mut batch = EntityBatch::new();
        batch.add(&Order { id: "ord_1".into(), ..Default::default() }).unwrap();
        assert!(db.put_batch(batch).await.is_err());

        let db = database().await;
        sqlx::query("CREATE TRIGGER no_payments BEFORE INSERT ON entities WHEN NEW.kind = 'payment' \
                     BEGIN SELECT RAISE(ABORT, 'payments are read only'); END;")
            .execute(db.pool())
            .await
            .unwrap();
        let mut batch = EntityBatch::new();
        batch
            .add(&Order { id: "ord_1".into(), ..Default::default() })
            .unwrap()
            .add(&Payment { id: "pay_1".into(), order_id: "ord_1".into(), ..Default::default() })
            .unwrap();
        let err = db.put_batch(batch).await.unwrap_err();
        assert!(err.to_string().contains("read only"));
        assert_eq!(db.count("order").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn redemptions_accumulate() {
        let db = database().await;
        assert_eq!(db.redemption_count("SPRING").await.unwrap(), 0);
        db.append_redemption("SPRING", "ord_1").await.unwrap();
        db.append_redemption("SPRING", "ord_2").await.unwrap();
        db.append_redemption("SUMMER", "ord_3").await.unwrap();
        assert_eq!(db.redemption_count("SPRING").await.unwrap(), 2);
    }
}
