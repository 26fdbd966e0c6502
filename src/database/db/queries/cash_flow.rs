use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgExecutor};

use crate::database::models::{CashFlowGroup, CashFlowResult, CashFlowView, CashFlowViewFields};
use crate::services::cash_flow_report::MonthlyAmount;

const VIEW_COLUMNS: &str = "id, user_id, name, created_at, updated_at";

/*========== Cash-Flow View Queries ==========*/

pub async fn list_views(
    db: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Vec<CashFlowView>, sqlx::Error> {
    sqlx::query_as::<_, CashFlowView>(&format!(
        "SELECT {VIEW_COLUMNS} FROM cash_flow_views WHERE user_id = $1 ORDER BY name ASC, id ASC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn get_view(
    db: impl PgExecutor<'_>,
    user_id: i64,
    view_id: i64,
) -> Result<Option<CashFlowView>, sqlx::Error> {
    sqlx::query_as::<_, CashFlowView>(&format!(
        "SELECT {VIEW_COLUMNS} FROM cash_flow_views WHERE id = $1 AND user_id = $2"
    ))
    .bind(view_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn list_groups(
    db: impl PgExecutor<'_>,
    view_id: i64,
) -> Result<Vec<CashFlowGroup>, sqlx::Error> {
    sqlx::query_as::<_, CashFlowGroup>(
        r#"
        SELECT g.id, g.view_id, g.name, g.position,
               COALESCE(
                   ARRAY_AGG(gc.category_id ORDER BY gc.category_id)
                       FILTER (WHERE gc.category_id IS NOT NULL),
                   '{}'
               ) AS category_ids
        FROM cash_flow_groups g
        LEFT JOIN cash_flow_group_categories gc ON gc.group_id = g.id
        WHERE g.view_id = $1
        GROUP BY g.id
        ORDER BY g.position ASC
        "#,
    )
    .bind(view_id)
    .fetch_all(db)
    .await
}

pub async fn list_results(
    db: impl PgExecutor<'_>,
    view_id: i64,
) -> Result<Vec<CashFlowResult>, sqlx::Error> {
    sqlx::query_as::<_, CashFlowResult>(
        "SELECT id, view_id, name, position FROM cash_flow_results WHERE view_id = $1 ORDER BY position ASC",
    )
    .bind(view_id)
    .fetch_all(db)
    .await
}

async fn insert_layout(
    conn: &mut PgConnection,
    view_id: i64,
    fields: &CashFlowViewFields,
) -> Result<(), sqlx::Error> {
    for group in &fields.groups {
        let group_id: i64 = sqlx::query_scalar(
            "INSERT INTO cash_flow_groups (view_id, name, position) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(view_id)
        .bind(&group.name)
        .bind(group.position)
        .fetch_one(&mut *conn)
        .await?;

        if !group.category_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO cash_flow_group_categories (group_id, category_id)
                SELECT $1, UNNEST($2::BIGINT[])
                "#,
            )
            .bind(group_id)
            .bind(group.category_ids.as_slice())
            .execute(&mut *conn)
            .await?;
        }
    }

    for result in &fields.results {
        sqlx::query("INSERT INTO cash_flow_results (view_id, name, position) VALUES ($1, $2, $3)")
            .bind(view_id)
            .bind(&result.name)
            .bind(result.position)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn create_view(
    conn: &mut PgConnection,
    user_id: i64,
    fields: &CashFlowViewFields,
) -> Result<i64, sqlx::Error> {
    let view_id: i64 = sqlx::query_scalar(
        "INSERT INTO cash_flow_views (user_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(user_id)
    .bind(&fields.name)
    .fetch_one(&mut *conn)
    .await?;

    insert_layout(conn, view_id, fields).await?;
    Ok(view_id)
}

/// Renames the view and swaps its whole layout for `fields`.
pub async fn replace_view(
    conn: &mut PgConnection,
    user_id: i64,
    view_id: i64,
    fields: &CashFlowViewFields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE cash_flow_views SET name = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3",
    )
    .bind(&fields.name)
    .bind(view_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    // group categories go with their groups through ON DELETE CASCADE
    sqlx::query("DELETE FROM cash_flow_groups WHERE view_id = $1")
        .bind(view_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM cash_flow_results WHERE view_id = $1")
        .bind(view_id)
        .execute(&mut *conn)
        .await?;

    insert_layout(conn, view_id, fields).await?;
    Ok(true)
}

pub async fn delete_view(
    db: impl PgExecutor<'_>,
    user_id: i64,
    view_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cash_flow_views WHERE id = $1 AND user_id = $2")
        .bind(view_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/*========== Report Aggregates ==========*/

#[derive(FromRow)]
struct MonthlyAmountRow {
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
    month: i32,
    total: Decimal,
}

/// Signed monthly sums of the user's transactions occurring in `[from, to)`,
/// per category and subcategory. The category's type decides the sign; without
/// a category the transaction's own type does, and transfers count as zero.
pub async fn monthly_amounts(
    db: impl PgExecutor<'_>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MonthlyAmount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MonthlyAmountRow>(
        r#"
        SELECT t.category_id,
               t.subcategory_id,
               EXTRACT(MONTH FROM t.occurred_at)::INT4 AS month,
               SUM(CASE
                       WHEN c.transaction_type = 'income' THEN t.amount
                       WHEN c.transaction_type = 'expense' THEN -t.amount
                       WHEN c.id IS NULL AND t.transaction_type = 'INCOME' THEN t.amount
                       WHEN c.id IS NULL AND t.transaction_type = 'EXPENSE' THEN -t.amount
                       ELSE 0
                   END)::NUMERIC(14, 2) AS total
        FROM transactions t
        LEFT JOIN categories c ON c.id = t.category_id
        WHERE t.user_id = $1 AND t.occurred_at >= $2 AND t.occurred_at < $3
        GROUP BY t.category_id, t.subcategory_id, EXTRACT(MONTH FROM t.occurred_at)
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| MonthlyAmount {
            category_id: row.category_id,
            subcategory_id: row.subcategory_id,
            month: row.month as u32,
            total: row.total,
        })
        .collect())
}
