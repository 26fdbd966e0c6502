use axum::extract::State;
use axum::http::{header::SET_COOKIE, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::backend::auth::{
    clear_cookie, hash_password, new_session_key, session_cookie, verify_password, CurrentUser,
};
use crate::backend::extract::ApiJson;
use crate::backend::AppState;
use crate::database::db::queries::users;
use crate::database::models::{LoginRequest, NewUser};
use crate::error::{AppError, AppResult};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> AppResult<impl IntoResponse> {
    payload.validate().into_result()?;
    let password = payload.password.clone().unwrap_or_default();
    let password_hash = hash_password(password).await?;

    let user = users::create_user(&state.db, &payload, &password_hash).await?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid = || AppError::bad_request("Invalid username or password");

    let user = users::find_user_by_username(&state.db, payload.username.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::info!(username = %user.username, "login rejected");
        return Err(invalid());
    }

    let expired = users::delete_expired_sessions(&state.db, user.id).await?;
    if expired > 0 {
        tracing::debug!(expired, "expired sessions removed");
    }

    let session_key = new_session_key();
    let session = users::create_session(
        &state.db,
        user.id,
        &session_key,
        Utc::now() + state.session_ttl,
    )
    .await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok((
        [(SET_COOKIE, session_cookie(&session.session_key, state.session_ttl))],
        Json(json!({
            "message": "Login successful",
            "user": user,
            "session_key": session.session_key,
            "expires_at": session.expires_at,
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<impl IntoResponse> {
    users::delete_session(&state.db, &current.session_key).await?;
    tracing::info!(user_id = current.id(), "user logged out");
    Ok((
        [(SET_COOKIE, clear_cookie())],
        Json(json!({ "message": "Logout successful" })),
    ))
}

pub async fn check_auth(current: CurrentUser) -> impl IntoResponse {
    Json(current.user)
}
