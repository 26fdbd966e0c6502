//! Session authentication.
//!
//! A login creates a row in `sessions` keyed by 64 random hex characters. The
//! key travels back either as `Authorization: Bearer <key>` or in the
//! `sessionid` cookie; [`CurrentUser`] accepts both.

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::AppState;
use crate::database::db::queries::users;
use crate::database::models::User;
use crate::error::AppError;

const SESSION_COOKIE: &str = "sessionid";
const SESSION_KEY_LEN: usize = 64;

/// The user behind the request's session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_key: String,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_key = session_key_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = users::find_session_user(&state.db, &session_key)
            .await?
            .ok_or(AppError::Unauthorized)?;
        tracing::Span::current().record("user_id", user.id);
        Ok(Self { user, session_key })
    }
}

fn is_session_key(candidate: &str) -> bool {
    candidate.len() == SESSION_KEY_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Bearer token first, then the session cookie. Malformed keys count as absent.
pub(crate) fn session_key_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("Bearer "))
        .map(str::trim);
    if let Some(key) = bearer {
        return is_session_key(key).then(|| key.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| is_session_key(value))
        .map(str::to_string)
}

pub(crate) fn new_session_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub(crate) fn session_cookie(key: &str, ttl: chrono::Duration) -> String {
    format!(
        "{SESSION_COOKIE}={key}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        ttl.num_seconds()
    )
}

pub(crate) fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Argon2id PHC string for `password`. Hashing is CPU-bound, so it runs off
/// the async workers.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("password hashing failed: {e}"))
    })
    .await
    .map_err(|e| anyhow!("password hashing task failed: {e}"))??;
    Ok(hashed)
}

pub async fn verify_password(password: String, stored: String) -> Result<bool, AppError> {
    let verified = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed =
            PasswordHash::new(&stored).map_err(|e| anyhow!("stored password hash is invalid: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| anyhow!("password verification task failed: {e}"))??;
    Ok(verified)
}
