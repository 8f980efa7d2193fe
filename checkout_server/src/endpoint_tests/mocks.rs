use checkout_engine::traits::{CheckoutDatabase, DatabaseError, EntityBatch};
use mockall::mock;
use serde_json::Value;

mock! {
    pub CheckoutDb {}
    impl CheckoutDatabase for CheckoutDb {
        fn url(&self) -> &str;
        async fn get_raw(&self, kind: &str, id: &str) -> Result<Option<Value>, DatabaseError>;
        async fn children_raw(&self, kind: &str, parent_id: &str) -> Result<Vec<Value>, DatabaseError>;
        async fn put_batch(&self, batch: EntityBatch) -> Result<(), DatabaseError>;
        async fn append_redemption(&self, code: &str, order_id: &str) -> Result<(), DatabaseError>;
        async fn redemption_count(&self, code: &str) -> Result<i64, DatabaseError>;
        async fn close(&mut self) -> Result<(), DatabaseError>;
    }
}
