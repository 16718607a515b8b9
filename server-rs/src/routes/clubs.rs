use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::services::clubs::{self, ClubDetail};
use crate::AppState;

pub async fn list_clubs(
    State(state): State<AppState>,
    Query(filter): Query<ClubFilter>,
) -> AppResult<Json<Value>> {
    let clubs = state.store.list_clubs(&filter).await?;
    Ok(Json(json!({ "clubs": clubs })))
}

pub async fn create_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Json(body): Json<CreateClubRequest>,
) -> AppResult<(StatusCode, Json<Club>)> {
    let club = clubs::create_club(state.store.as_ref(), &user, body).await?;
    Ok((StatusCode::CREATED, Json(club)))
}

pub async fn get_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<ClubDetail>> {
    let detail = clubs::club_detail(state.store.as_ref(), &user, club_id).await?;
    Ok(Json(detail))
}

pub async fn update_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
    Json(body): Json<UpdateClubRequest>,
) -> AppResult<Json<Value>> {
    let club = clubs::update_club(state.store.as_ref(), &user, club_id, body).await?;
    Ok(Json(json!({ "club": club })))
}

pub async fn delete_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    clubs::deactivate_club(state.store.as_ref(), &user, club_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn create_event(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
    Json(body): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let event = clubs::create_event(state.store.as_ref(), &user, club_id, body).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
    Json(body): Json<CreateAnnouncementRequest>,
) -> AppResult<(StatusCode, Json<Announcement>)> {
    let announcement =
        clubs::create_announcement(state.store.as_ref(), &user, club_id, body).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}
