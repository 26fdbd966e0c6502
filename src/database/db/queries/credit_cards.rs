use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::database::models::{CreditCard, CreditCardFields, CreditCardFilter};

const CARD_COLUMNS: &str =
    "id, user_id, name, close_day, due_day, credit_limit, is_active, created_at, updated_at";

/*========== Credit Card Queries ==========*/

pub async fn list_credit_cards(
    db: impl PgExecutor<'_>,
    user_id: i64,
    filter: &CreditCardFilter,
) -> Result<Vec<CreditCard>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {CARD_COLUMNS} FROM credit_cards WHERE user_id = "
    ));
    qb.push_bind(user_id);
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" ORDER BY name ASC, id ASC");
    qb.build_query_as::<CreditCard>().fetch_all(db).await
}

pub async fn get_credit_card(
    db: impl PgExecutor<'_>,
    user_id: i64,
    card_id: i64,
) -> Result<Option<CreditCard>, sqlx::Error> {
    sqlx::query_as::<_, CreditCard>(&format!(
        "SELECT {CARD_COLUMNS} FROM credit_cards WHERE id = $1 AND user_id = $2"
    ))
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn create_credit_card(
    db: impl PgExecutor<'_>,
    user_id: i64,
    fields: &CreditCardFields,
) -> Result<CreditCard, sqlx::Error> {
    sqlx::query_as::<_, CreditCard>(&format!(
        r#"
        INSERT INTO credit_cards (user_id, name, close_day, due_day, credit_limit, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&fields.name)
    .bind(fields.close_day)
    .bind(fields.due_day)
    .bind(fields.credit_limit)
    .bind(fields.is_active)
    .fetch_one(db)
    .await
}

pub async fn update_credit_card(
    db: impl PgExecutor<'_>,
    user_id: i64,
    card_id: i64,
    fields: &CreditCardFields,
) -> Result<Option<CreditCard>, sqlx::Error> {
    sqlx::query_as::<_, CreditCard>(&format!(
        r#"
        UPDATE credit_cards
        SET name = $1, close_day = $2, due_day = $3, credit_limit = $4, is_active = $5,
            updated_at = NOW()
        WHERE id = $6 AND user_id = $7
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(&fields.name)
    .bind(fields.close_day)
    .bind(fields.due_day)
    .bind(fields.credit_limit)
    .bind(fields.is_active)
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Removes the card together with every transaction charged to it.
pub async fn delete_credit_card(
    pool: &PgPool,
    user_id: i64,
    card_id: i64,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM transactions WHERE credit_card_id = $1 AND user_id = $2")
        .bind(card_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM credit_cards WHERE id = $1 AND user_id = $2")
        .bind(card_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

/// Net amount charged to the card on bills due on or after `from`
/// (refunds booked as INCOME reduce it).
pub async fn open_charges(
    db: impl PgExecutor<'_>,
    user_id: i64,
    card_id: i64,
    from: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(CASE WHEN transaction_type = 'INCOME' THEN -amount ELSE amount END), 0.00)
        FROM transactions
        WHERE user_id = $1 AND credit_card_id = $2 AND charge_at_card >= $3
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .bind(from)
    .fetch_one(db)
    .await
}
