use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{generate_tokens, verify_token};
use crate::models::*;
use crate::AppState;

const BCRYPT_COST: u32 = 12;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let email = body.email.trim().to_lowercase();
    let name = body.name.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if body.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let password_hash =
        bcrypt::hash(&body.password, BCRYPT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let user = state
        .store
        .create_user(NewUser {
            email,
            name: name.to_string(),
            password_hash,
        })
        .await?
        .ok_or_else(|| AppError::Conflict("Email already registered".into()))?;

    let (token, refresh_token) = generate_tokens(user.id, &user.email, &state.config.jwt)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "refreshToken": refresh_token,
            "user": user,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let user = state
        .store
        .find_user_by_email(body.email.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password".into(),
        ));
    }

    let (token, refresh_token) = generate_tokens(user.id, &user.email, &state.config.jwt)?;

    Ok(Json(json!({
        "token": token,
        "refreshToken": refresh_token,
        "user": user,
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let token = body["refreshToken"]
        .as_str()
        .ok_or_else(|| AppError::BadRequest("refreshToken required".into()))?;

    let claims = verify_token(token, &state.config.jwt.secret)?;
    if claims.token_type.as_deref() != Some("refresh") {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    let (new_token, new_refresh) = generate_tokens(user_id, &claims.email, &state.config.jwt)?;

    Ok(Json(json!({
        "token": new_token,
        "refreshToken": new_refresh,
    })))
}
