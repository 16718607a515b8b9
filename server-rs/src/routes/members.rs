use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::services::membership::{self, JoinOutcome};
use crate::AppState;

pub async fn join_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
    body: Option<Json<JoinClubRequest>>,
) -> AppResult<(StatusCode, Json<JoinOutcome>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let outcome = membership::join_club(state.store.as_ref(), &user, club_id, body).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn leave_club(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    membership::leave_club(state.store.as_ref(), &user, club_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn add_member(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<MemberWithUser>)> {
    let member = membership::add_member(state.store.as_ref(), &user, club_id, body).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let requests = membership::pending_requests(state.store.as_ref(), &user, club_id).await?;
    Ok(Json(json!({ "requests": requests })))
}

pub async fn approve_request(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path((club_id, request_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Value>> {
    membership::approve_request(state.store.as_ref(), &user, club_id, request_id).await?;
    Ok(Json(json!({
        "message": "Membership request approved",
        "approved": true,
    })))
}

pub async fn reject_request(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Path((club_id, request_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Value>> {
    membership::reject_request(state.store.as_ref(), &user, club_id, request_id).await?;
    Ok(Json(json!({
        "message": "Membership request rejected",
        "rejected": true,
    })))
}
