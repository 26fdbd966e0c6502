use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::database::models::{Account, AccountFields, AccountFilter};

const ACCOUNT_COLUMNS: &str = "id, user_id, name, current_balance, account_type, currency, \
                               is_active, created_at, updated_at";

/*========== Account Queries ==========*/

pub async fn list_accounts(
    db: impl PgExecutor<'_>,
    user_id: i64,
    filter: &AccountFilter,
) -> Result<Vec<Account>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = "
    ));
    qb.push_bind(user_id);
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(account_type) = &filter.account_type {
        qb.push(" AND account_type = ").push_bind(account_type.clone());
    }
    if let Some(currency) = &filter.currency {
        qb.push(" AND currency = ")
            .push_bind(currency.trim().to_ascii_uppercase());
    }
    qb.push(" ORDER BY name ASC, id ASC");
    qb.build_query_as::<Account>().fetch_all(db).await
}

pub async fn get_account(
    db: impl PgExecutor<'_>,
    user_id: i64,
    account_id: i64,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 AND user_id = $2"
    ))
    .bind(account_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

// current_balance always starts at zero; only transactions move it
pub async fn create_account(
    db: impl PgExecutor<'_>,
    user_id: i64,
    fields: &AccountFields,
) -> Result<Account, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        INSERT INTO accounts (user_id, name, account_type, currency, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&fields.name)
    .bind(fields.account_type.as_str())
    .bind(&fields.currency)
    .bind(fields.is_active)
    .fetch_one(db)
    .await
}

pub async fn update_account(
    db: impl PgExecutor<'_>,
    user_id: i64,
    account_id: i64,
    fields: &AccountFields,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts
        SET name = $1, account_type = $2, currency = $3, is_active = $4, updated_at = NOW()
        WHERE id = $5 AND user_id = $6
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(&fields.name)
    .bind(fields.account_type.as_str())
    .bind(&fields.currency)
    .bind(fields.is_active)
    .bind(account_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Removes the account together with every transaction booked on it.
pub async fn delete_account(
    pool: &PgPool,
    user_id: i64,
    account_id: i64,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // transactions first: the foreign key would reject the account delete
    sqlx::query("DELETE FROM transactions WHERE account_id = $1 AND user_id = $2")
        .bind(account_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let acc_result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND user_id = $2")
        .bind(account_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(acc_result.rows_affected() > 0)
}

/// Applies a signed change to `current_balance`. Callers run it in the same
/// database transaction as the transaction write that caused it.
pub async fn adjust_balance(
    conn: &mut PgConnection,
    account_id: i64,
    delta: Decimal,
) -> Result<(), sqlx::Error> {
    if delta.is_zero() {
        return Ok(());
    }
    sqlx::query(
        r#"
        UPDATE accounts
        SET current_balance = current_balance + $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(delta)
    .bind(account_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
