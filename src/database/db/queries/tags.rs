use std::collections::HashMap;

use sqlx::{FromRow, PgConnection, PgExecutor};

use crate::database::models::transaction::NamedRef;
use crate::database::models::Tag;

/*========== Tag Queries ==========*/

pub async fn list_tags(db: impl PgExecutor<'_>, user_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "SELECT id, user_id, name, created_at FROM tags WHERE user_id = $1 ORDER BY name ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn create_tag(
    db: impl PgExecutor<'_>,
    user_id: i64,
    name: &str,
) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (user_id, name) VALUES ($1, $2)
        RETURNING id, user_id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await
}

pub async fn delete_tag(
    db: impl PgExecutor<'_>,
    user_id: i64,
    tag_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ids from `ids` that the user does not own.
pub async fn foreign_tag_ids(
    db: impl PgExecutor<'_>,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let owned: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM tags WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .fetch_all(db)
            .await?;
    Ok(ids.iter().copied().filter(|id| !owned.contains(id)).collect())
}

#[derive(FromRow)]
struct TransactionTagRow {
    transaction_id: i64,
    id: i64,
    name: String,
}

/// Tags of each transaction, keyed by transaction id.
pub async fn tags_for_transactions(
    db: impl PgExecutor<'_>,
    transaction_ids: &[i64],
) -> Result<HashMap<i64, Vec<NamedRef>>, sqlx::Error> {
    let mut by_transaction: HashMap<i64, Vec<NamedRef>> = HashMap::new();
    if transaction_ids.is_empty() {
        return Ok(by_transaction);
    }
    let rows = sqlx::query_as::<_, TransactionTagRow>(
        r#"
        SELECT tt.transaction_id, t.id, t.name
        FROM transaction_tags tt
        JOIN tags t ON t.id = tt.tag_id
        WHERE tt.transaction_id = ANY($1)
        ORDER BY t.name ASC
        "#,
    )
    .bind(transaction_ids)
    .fetch_all(db)
    .await?;

    for row in rows {
        by_transaction
            .entry(row.transaction_id)
            .or_default()
            .push(NamedRef {
                id: row.id,
                name: row.name,
            });
    }
    Ok(by_transaction)
}

/// Replaces the tag set of one transaction.
pub async fn set_transaction_tags(
    conn: &mut PgConnection,
    transaction_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM transaction_tags WHERE transaction_id = $1")
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;
    if tag_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO transaction_tags (transaction_id, tag_id)
        SELECT $1, UNNEST($2::BIGINT[])
        "#,
    )
    .bind(transaction_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
