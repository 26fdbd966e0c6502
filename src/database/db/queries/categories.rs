use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};

use crate::database::models::{
    Category, CategoryFields, CategoryType, Subcategory, SubcategoryFields,
};

const CATEGORY_COLUMNS: &str =
    "id, user_id, name, transaction_type, description, is_active, created_at, updated_at";

// subcategories report the type of their parent category
const SUBCATEGORY_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.category_id, s.name, s.description, c.transaction_type,
           s.is_active, s.created_at, s.updated_at
    FROM subcategories s
    JOIN categories c ON c.id = s.category_id
"#;

/*========== Category Queries ==========*/

/// Active categories, optionally of one type.
pub async fn list_categories(
    db: impl PgExecutor<'_>,
    user_id: i64,
    transaction_type: Option<CategoryType>,
) -> Result<Vec<Category>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active AND user_id = "
    ));
    qb.push_bind(user_id);
    if let Some(kind) = transaction_type {
        qb.push(" AND transaction_type = ").push_bind(kind.as_str());
    }
    qb.push(" ORDER BY name ASC, id ASC");
    qb.build_query_as::<Category>().fetch_all(db).await
}

/// Fetches an owned category whether or not it is still active.
pub async fn get_category(
    db: impl PgExecutor<'_>,
    user_id: i64,
    category_id: i64,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND user_id = $2"
    ))
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn get_categories_by_ids(
    db: impl PgExecutor<'_>,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = $1 AND id = ANY($2) ORDER BY name ASC, id ASC"
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(db)
    .await
}

pub async fn create_category(
    db: impl PgExecutor<'_>,
    user_id: i64,
    fields: &CategoryFields,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        r#"
        INSERT INTO categories (user_id, name, transaction_type, description, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CATEGORY_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&fields.name)
    .bind(fields.transaction_type.as_str())
    .bind(&fields.description)
    .bind(fields.is_active)
    .fetch_one(db)
    .await
}

pub async fn update_category(
    db: impl PgExecutor<'_>,
    user_id: i64,
    category_id: i64,
    fields: &CategoryFields,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        r#"
        UPDATE categories
        SET name = $1, transaction_type = $2, description = $3, is_active = $4, updated_at = NOW()
        WHERE id = $5 AND user_id = $6
        RETURNING {CATEGORY_COLUMNS}
        "#
    ))
    .bind(&fields.name)
    .bind(fields.transaction_type.as_str())
    .bind(&fields.description)
    .bind(fields.is_active)
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Soft delete: the category and all its subcategories become inactive.
/// Transactions keep pointing at them.
pub async fn deactivate_category(
    conn: &mut PgConnection,
    user_id: i64,
    category_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE categories SET is_active = FALSE, updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(category_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    deactivate_subcategories_of(&mut *conn, user_id, category_id).await?;
    Ok(true)
}

/// Retires every active subcategory of a category.
pub async fn deactivate_subcategories_of(
    db: impl PgExecutor<'_>,
    user_id: i64,
    category_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subcategories SET is_active = FALSE, updated_at = NOW()
        WHERE category_id = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(category_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/*========== Subcategory Queries ==========*/

pub async fn list_subcategories(
    db: impl PgExecutor<'_>,
    user_id: i64,
    category_id: Option<i64>,
) -> Result<Vec<Subcategory>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(SUBCATEGORY_SELECT);
    qb.push(" WHERE s.is_active AND s.user_id = ").push_bind(user_id);
    if let Some(category_id) = category_id {
        qb.push(" AND s.category_id = ").push_bind(category_id);
    }
    qb.push(" ORDER BY s.name ASC, s.id ASC");
    qb.build_query_as::<Subcategory>().fetch_all(db).await
}

/// Active subcategories of several categories at once, ordered by name.
pub async fn list_subcategories_of(
    db: impl PgExecutor<'_>,
    user_id: i64,
    category_ids: &[i64],
) -> Result<Vec<Subcategory>, sqlx::Error> {
    sqlx::query_as::<_, Subcategory>(&format!(
        "{SUBCATEGORY_SELECT} WHERE s.is_active AND s.user_id = $1 AND s.category_id = ANY($2) ORDER BY s.name ASC, s.id ASC"
    ))
    .bind(user_id)
    .bind(category_ids)
    .fetch_all(db)
    .await
}

pub async fn get_subcategory(
    db: impl PgExecutor<'_>,
    user_id: i64,
    subcategory_id: i64,
) -> Result<Option<Subcategory>, sqlx::Error> {
    sqlx::query_as::<_, Subcategory>(&format!(
        "{SUBCATEGORY_SELECT} WHERE s.id = $1 AND s.user_id = $2"
    ))
    .bind(subcategory_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn create_subcategory(
    conn: &mut PgConnection,
    user_id: i64,
    fields: &SubcategoryFields,
) -> Result<Subcategory, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO subcategories (user_id, category_id, name, description, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(fields.category_id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.is_active)
    .fetch_one(&mut *conn)
    .await?;

    get_subcategory(&mut *conn, user_id, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_subcategory(
    conn: &mut PgConnection,
    user_id: i64,
    subcategory_id: i64,
    fields: &SubcategoryFields,
) -> Result<Option<Subcategory>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subcategories
        SET category_id = $1, name = $2, description = $3, is_active = $4, updated_at = NOW()
        WHERE id = $5 AND user_id = $6
        "#,
    )
    .bind(fields.category_id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.is_active)
    .bind(subcategory_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_subcategory(&mut *conn, user_id, subcategory_id).await
}

pub async fn deactivate_subcategory(
    db: impl PgExecutor<'_>,
    user_id: i64,
    subcategory_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subcategories SET is_active = FALSE, updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(subcategory_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
