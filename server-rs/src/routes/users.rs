use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::services::clubs::{self, UserClubs};
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let profile = state
        .store
        .find_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(json!({ "user": profile })))
}

/// Partial update; absent fields keep their value.
pub async fn update_profile(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Json(body): Json<ProfileUpdateRequest>,
) -> AppResult<Json<Value>> {
    let name = match body.name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::BadRequest("Name cannot be empty".into())),
        other => other.map(String::from),
    };
    let update = ProfileUpdateRequest {
        name,
        bio: body.bio.map(|b| b.trim().to_string()),
        image: body.image.map(|i| i.trim().to_string()),
    };

    let profile = state
        .store
        .update_profile(user.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(json!({ "user": profile })))
}

pub async fn my_clubs(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
) -> AppResult<Json<UserClubs>> {
    let view = clubs::user_clubs(state.store.as_ref(), &user).await?;
    Ok(Json(view))
}
