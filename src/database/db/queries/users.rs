use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::database::models::{NewUser, Session, User};

const USER_COLUMNS: &str =
    "id, username, password_hash, email, first_name, last_name, date_joined";

/*========== User Queries ==========*/

pub async fn create_user(
    db: impl PgExecutor<'_>,
    new: &NewUser,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, password_hash, email, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(new.username.as_deref().unwrap_or_default().trim())
    .bind(password_hash)
    .bind(new.email.trim())
    .bind(new.first_name.trim())
    .bind(new.last_name.trim())
    .fetch_one(db)
    .await
}

pub async fn find_user_by_username(
    db: impl PgExecutor<'_>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(db)
    .await
}

/*========== Session Queries ==========*/

pub async fn create_session(
    db: impl PgExecutor<'_>,
    user_id: i64,
    session_key: &str,
    expires_at: DateTime<Utc>,
) -> Result<Session, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (session_key, user_id, expires_at)
        VALUES ($1, $2, $3)
        RETURNING session_key, user_id, created_at, expires_at
        "#,
    )
    .bind(session_key)
    .bind(user_id)
    .bind(expires_at)
    .fetch_one(db)
    .await
}

/// The user behind a live session, if the key exists and has not expired.
pub async fn find_session_user(
    db: impl PgExecutor<'_>,
    session_key: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.password_hash, u.email, u.first_name, u.last_name, u.date_joined
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.session_key = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(session_key)
    .fetch_optional(db)
    .await
}

pub async fn delete_session(db: impl PgExecutor<'_>, session_key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE session_key = $1")
        .bind(session_key)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_sessions(
    db: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= NOW()")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
