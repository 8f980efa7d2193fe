use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A document that can be persisted through a [`CheckoutDatabase`].
///
/// Every entity has a kind (its "table"), a unique id within that kind, and an optional parent key. Parent keys are
/// what ancestor queries filter on: payments hang off their order, fees off their payment, discounts off their scope.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn parent_id(&self) -> Option<String> {
        None
    }
}

/// An entity in its stored form.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub kind: &'static str,
    pub id: String,
    pub parent_id: Option<String>,
    pub body: Value,
}

impl StoredEntity {
    pub fn from_entity<E: Entity>(entity: &E) -> Result<Self, DatabaseError> {
        let body = serde_json::to_value(entity).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        Ok(Self { kind: E::KIND, id: entity.id().to_string(), parent_id: entity.parent_id(), body })
    }
}

/// A set of entities to persist together.
///
/// Backends that support transactions write the whole batch or nothing. Backends that don't must document what a
/// mid-batch failure leaves behind.
#[derive(Debug, Clone, Default)]
pub struct EntityBatch {
    entities: Vec<StoredEntity>,
}

impl EntityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<E: Entity>(&mut self, entity: &E) -> Result<&mut Self, DatabaseError> {
        if entity.id().is_empty() {
            return Err(DatabaseError::MissingId(E::KIND));
        }
        self.entities.push(StoredEntity::from_entity(entity)?);
        Ok(self)
    }

    pub fn add_all<'a, E: Entity + 'a, I: IntoIterator<Item = &'a E>>(
        &mut self,
        entities: I,
    ) -> Result<&mut Self, DatabaseError> {
        for e in entities {
            self.add(e)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.entities.iter().map(|e| e.kind).collect()
    }

    pub fn into_entities(self) -> Vec<StoredEntity> {
        self.entities
    }
}

#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("Database driver error: {0}")]
    DriverError(String),
    #[error("Could not serialize entity. {0}")]
    Serialization(String),
    #[error("Could not deserialize {kind} {id}. {reason}")]
    Deserialization { kind: &'static str, id: String, reason: String },
    #[error("Cannot store a {0} without an id")]
    MissingId(&'static str),
    #[error("Batch write failed after {written} of {total} entities. {reason}")]
    PartialWrite { written: usize, total: usize, reason: String },
    #[error("The database connection is closed")]
    Closed,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::DriverError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::DriverError(e.to_string())
    }
}

fn decode<E: Entity>(id: &str, body: Value) -> Result<E, DatabaseError> {
    serde_json::from_value(body).map_err(|e| DatabaseError::Deserialization {
        kind: E::KIND,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// The persistence port for the checkout core.
///
/// Implementors only need to supply the raw document operations. The typed helpers (`get`, `children`, `put`) are
/// provided on top of them.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the document of the given kind and id, if it exists.
    async fn get_raw(&self, kind: &str, id: &str) -> Result<Option<Value>, DatabaseError>;

    /// Ancestor query. Fetches every document of the given kind whose parent key is `parent_id`, in insertion order.
    async fn children_raw(&self, kind: &str, parent_id: &str) -> Result<Vec<Value>, DatabaseError>;

    /// Writes every entity in the batch, inserting or replacing by `(kind, id)`.
    async fn put_batch(&self, batch: EntityBatch) -> Result<(), DatabaseError>;

    /// Appends a redemption record for the coupon. No limit is enforced here; two concurrent checkouts racing for the
    /// last redemption can both succeed.
    async fn append_redemption(&self, code: &str, order_id: &str) -> Result<(), DatabaseError>;

    /// The number of redemptions recorded for the coupon.
    async fn redemption_count(&self, code: &str) -> Result<i64, DatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), DatabaseError>;

    async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, DatabaseError> {
        match self.get_raw(E::KIND, id).await? {
            Some(body) => decode(id, body).map(Some),
            None => Ok(None),
        }
    }

    async fn children<E: Entity>(&self, parent_id: &str) -> Result<Vec<E>, DatabaseError> {
        self.children_raw(E::KIND, parent_id).await?.into_iter().map(|body| decode(parent_id, body)).collect()
    }

    async fn put<E: Entity>(&self, entity: &E) -> Result<(), DatabaseError> {
        let mut batch = EntityBatch::new();
        batch.add(entity)?;
        self.put_batch(batch).await
    }
}
