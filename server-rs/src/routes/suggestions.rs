use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::models::ClubFilter;
use crate::services::suggestion::{required_interest, Suggestion};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub interest: String,
}

/// Anonymous callers only get public clubs as candidates, matching `GET /clubs`.
pub async fn suggest_club(
    State(state): State<AppState>,
    user: Option<axum::Extension<AuthUser>>,
    Json(body): Json<SuggestRequest>,
) -> AppResult<Json<Suggestion>> {
    let interest = required_interest(&body.interest)?;

    let filter = ClubFilter {
        include_private: user.is_some(),
        ..Default::default()
    };
    let clubs = state.store.list_clubs(&filter).await?;
    let suggestion = state.resolver.resolve(interest, &clubs).await?;
    Ok(Json(suggestion))
}
