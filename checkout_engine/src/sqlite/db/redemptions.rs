use sqlx::SqliteConnection;

use crate::traits::DatabaseError;

pub async fn insert_redemption(code: &str, order_id: &str, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO coupon_redemptions (code, order_id) VALUES ($1, $2)")
        .bind(code)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn redemption_count(code: &str, conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions WHERE code = $1").bind(code).fetch_one(conn).await?;
    Ok(count)
}
