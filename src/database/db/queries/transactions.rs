use chrono::NaiveDate;
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{accounts, tags};
use crate::database::models::{NewTransaction, Transaction, TransactionFilter, TransactionResponse};

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.user_id, t.transaction_type, t.amount, t.description, t.occurred_at,
           t.charge_at_card, t.account_id, t.credit_card_id, t.category_id, t.subcategory_id,
           t.installments_total, t.installment_number, t.installment_group_id,
           t.need_review, t.origin, t.created_at, t.updated_at,
           a.name AS account_name, cc.name AS credit_card_name,
           c.name AS category_name, s.name AS subcategory_name
    FROM transactions t
    LEFT JOIN accounts a ON a.id = t.account_id
    LEFT JOIN credit_cards cc ON cc.id = t.credit_card_id
    LEFT JOIN categories c ON c.id = t.category_id
    LEFT JOIN subcategories s ON s.id = t.subcategory_id
"#;

/*========== Transaction Reads ==========*/

/// Shared WHERE clause of the list and count queries. Expects `t` and `c`
/// (categories) to be in scope.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, filter: &TransactionFilter) {
    qb.push(" WHERE t.user_id = ").push_bind(user_id);
    if let Some(kind) = &filter.transaction_type {
        qb.push(" AND t.transaction_type = ").push_bind(kind.clone());
    }
    if let Some(id) = filter.account_id {
        qb.push(" AND t.account_id = ").push_bind(id);
    }
    if let Some(id) = filter.credit_card_id {
        qb.push(" AND t.credit_card_id = ").push_bind(id);
    }
    if let Some(id) = filter.category_id {
        qb.push(" AND t.category_id = ").push_bind(id);
    }
    if let Some(id) = filter.subcategory_id {
        qb.push(" AND t.subcategory_id = ").push_bind(id);
    }
    if let Some(day) = filter.occurred_at {
        qb.push(" AND t.occurred_at = ").push_bind(day);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND t.occurred_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND t.occurred_at <= ").push_bind(to);
    }
    if let Some(need_review) = filter.need_review {
        qb.push(" AND t.need_review = ").push_bind(need_review);
    }
    if !filter.inactive_categories {
        qb.push(" AND (t.category_id IS NULL OR c.is_active)");
    }
}

pub async fn list_transactions(
    db: impl PgExecutor<'_>,
    user_id: i64,
    filter: &TransactionFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(TRANSACTION_SELECT);
    push_filters(&mut qb, user_id, filter);
    qb.push(" ORDER BY t.occurred_at DESC, t.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    qb.build_query_as::<Transaction>().fetch_all(db).await
}

pub async fn count_transactions(
    db: impl PgExecutor<'_>,
    user_id: i64,
    filter: &TransactionFilter,
) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM transactions t LEFT JOIN categories c ON c.id = t.category_id",
    );
    push_filters(&mut qb, user_id, filter);
    qb.build_query_scalar::<i64>().fetch_one(db).await
}

pub async fn get_transaction(
    db: impl PgExecutor<'_>,
    user_id: i64,
    transaction_id: i64,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "{TRANSACTION_SELECT} WHERE t.id = $1 AND t.user_id = $2"
    ))
    .bind(transaction_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn get_transactions_by_ids(
    db: impl PgExecutor<'_>,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "{TRANSACTION_SELECT} WHERE t.user_id = $1 AND t.id = ANY($2) ORDER BY t.id"
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(db)
    .await
}

/// Owned transactions among `ids`, locked until the surrounding transaction ends.
pub async fn get_transactions_for_update(
    conn: &mut PgConnection,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "{TRANSACTION_SELECT} WHERE t.user_id = $1 AND t.id = ANY($2) ORDER BY t.id FOR UPDATE OF t"
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_installment_group(
    db: impl PgExecutor<'_>,
    user_id: i64,
    group_id: Uuid,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "{TRANSACTION_SELECT} WHERE t.user_id = $1 AND t.installment_group_id = $2 ORDER BY t.installment_number ASC"
    ))
    .bind(user_id)
    .bind(group_id)
    .fetch_all(db)
    .await
}

/// Card transactions whose charge date falls within `[from, to]`.
pub async fn list_card_charges(
    db: impl PgExecutor<'_>,
    user_id: i64,
    card_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        r#"{TRANSACTION_SELECT}
        WHERE t.user_id = $1 AND t.credit_card_id = $2
          AND t.charge_at_card BETWEEN $3 AND $4
        ORDER BY t.occurred_at ASC, t.id ASC"#
    ))
    .bind(user_id)
    .bind(card_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}

pub async fn tag_ids_of(
    db: impl PgExecutor<'_>,
    transaction_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT tag_id FROM transaction_tags WHERE transaction_id = $1 ORDER BY tag_id",
    )
    .bind(transaction_id)
    .fetch_all(db)
    .await
}

/// Attaches tags to rows, keeping their order.
pub async fn with_tags(
    db: impl PgExecutor<'_>,
    rows: Vec<Transaction>,
) -> Result<Vec<TransactionResponse>, sqlx::Error> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags = tags::tags_for_transactions(db, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let row_tags = tags.remove(&row.id).unwrap_or_default();
            TransactionResponse::new(row, row_tags)
        })
        .collect())
}

/*========== Transaction Writes ==========*/

/* Every write keeps the funding account's balance in step with its
transactions. Run these inside a database transaction so a failure
leaves neither the row nor the balance half-updated. */

pub async fn insert_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    t: &NewTransaction,
) -> Result<i64, sqlx::Error> {
    let new_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO transactions (
            user_id, transaction_type, amount, description, occurred_at, charge_at_card,
            account_id, credit_card_id, category_id, subcategory_id,
            installments_total, installment_number, installment_group_id,
            need_review, origin
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(t.transaction_type.as_str())
    .bind(t.amount)
    .bind(&t.description)
    .bind(t.occurred_at)
    .bind(t.charge_at_card)
    .bind(t.account_id)
    .bind(t.credit_card_id)
    .bind(t.category_id)
    .bind(t.subcategory_id)
    .bind(t.installments_total)
    .bind(t.installment_number)
    .bind(t.installment_group_id)
    .bind(t.need_review)
    .bind(&t.origin)
    .fetch_one(&mut *conn)
    .await?;

    tags::set_transaction_tags(&mut *conn, new_id, &t.tag_ids).await?;

    if let Some(account_id) = t.account_id {
        let delta = t.transaction_type.balance_delta(t.amount);
        accounts::adjust_balance(&mut *conn, account_id, delta).await?;
    }

    Ok(new_id)
}

pub async fn update_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    current: &Transaction,
    t: &NewTransaction,
) -> Result<(), sqlx::Error> {
    if let Some(account_id) = current.account_id {
        let revert = -current.transaction_type.balance_delta(current.amount);
        accounts::adjust_balance(&mut *conn, account_id, revert).await?;
    }

    sqlx::query(
        r#"
        UPDATE transactions
        SET transaction_type = $1, amount = $2, description = $3, occurred_at = $4,
            charge_at_card = $5, account_id = $6, credit_card_id = $7, category_id = $8,
            subcategory_id = $9, need_review = $10, origin = $11, updated_at = NOW()
        WHERE id = $12 AND user_id = $13
        "#,
    )
    .bind(t.transaction_type.as_str())
    .bind(t.amount)
    .bind(&t.description)
    .bind(t.occurred_at)
    .bind(t.charge_at_card)
    .bind(t.account_id)
    .bind(t.credit_card_id)
    .bind(t.category_id)
    .bind(t.subcategory_id)
    .bind(t.need_review)
    .bind(&t.origin)
    .bind(current.id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    tags::set_transaction_tags(&mut *conn, current.id, &t.tag_ids).await?;

    if let Some(account_id) = t.account_id {
        let delta = t.transaction_type.balance_delta(t.amount);
        accounts::adjust_balance(&mut *conn, account_id, delta).await?;
    }
    Ok(())
}

pub async fn delete_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    current: &Transaction,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
        .bind(current.id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    if let Some(account_id) = current.account_id {
        let revert = -current.transaction_type.balance_delta(current.amount);
        accounts::adjust_balance(&mut *conn, account_id, revert).await?;
    }
    Ok(true)
}
