use log::trace;
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::traits::{DatabaseError, StoredEntity};

fn parse_body(kind: &str, id: &str, body: &str) -> Result<Value, DatabaseError> {
    serde_json::from_str(body).map_err(|e| DatabaseError::DriverError(format!("The stored {kind} {id} is not JSON. {e}")))
}

pub async fn fetch_entity(kind: &str, id: &str, conn: &mut SqliteConnection) -> Result<Option<Value>, DatabaseError> {
    let body: Option<String> = sqlx::query_scalar("SELECT body FROM entities WHERE kind = $1 AND id = $2")
        .bind(kind)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    body.map(|b| parse_body(kind, id, &b)).transpose()
}

/// Every entity of `kind` under `parent_id`, oldest first. Replacing an entity keeps its original position.
pub async fn fetch_children(
    kind: &str,
    parent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Value>, DatabaseError> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, body FROM entities WHERE kind = $1 AND parent_id = $2 ORDER BY seq")
            .bind(kind)
            .bind(parent_id)
            .fetch_all(conn)
            .await?;
    rows.iter().map(|(id, body)| parse_body(kind, id, body)).collect()
}

/// Inserts the entity, or replaces the body and parent of the existing entity with the same kind and id. This is not
/// atomic on its own; pass `&mut *tx` to embed it in a transaction.
pub async fn upsert_entity(entity: &StoredEntity, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    let body = serde_json::to_string(&entity.body).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    sqlx::query(
        r#"
            INSERT INTO entities (kind, id, parent_id, body) VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, id) DO UPDATE SET
                parent_id = excluded.parent_id,
                body = excluded.body,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(entity.kind)
    .bind(&entity.id)
    .bind(&entity.parent_id)
    .bind(body)
    .execute(conn)
    .await?;
    trace!("🗃️ Stored {} {}", entity.kind, entity.id);
    Ok(())
}

pub async fn count_entities(kind: &str, conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM entities WHERE kind = $1").bind(kind).fetch_one(conn).await?;
    Ok(count)
}
