//! Who belongs to which club: owner-driven additions, join requests and the
//! approve/reject workflow.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::services::clubs::{active_club, ensure_owner};
use crate::store::ClubStore;

const ALREADY_PROCESSED: &str = "Request has already been processed";

/// Owner adds an existing user by email.
pub async fn add_member(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    req: AddMemberRequest,
) -> AppResult<MemberWithUser> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required".into()))?;
    let role = req.role.unwrap_or(MemberRole::Member);
    if role == MemberRole::Owner {
        return Err(AppError::BadRequest("Cannot add a member as owner".into()));
    }

    let club = active_club(store, club_id).await?;
    ensure_owner(&club, caller)?;

    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if store.find_member(club_id, user.id).await?.is_some() {
        return Err(AppError::Conflict("User is already a member of this club".into()));
    }
    if club.is_full(store.count_members(club_id).await?) {
        return Err(AppError::Conflict("Club has reached its member limit".into()));
    }

    // A concurrent insert of the same pair surfaces here as None.
    let member = store
        .insert_member(club_id, user.id, role)
        .await?
        .ok_or_else(|| AppError::Conflict("User is already a member of this club".into()))?;

    tracing::info!(club_id = %club_id, user_id = %user.id, ?role, "member added");
    Ok(MemberWithUser {
        member,
        user: UserSummary::from(&user),
    })
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum JoinOutcome {
    /// Public club: the caller is a member now.
    #[serde(rename = "joined")]
    Joined { membership: ClubMember },
    /// Private club: the owner has to approve.
    #[serde(rename = "pending")]
    Requested { request: MembershipRequest },
}

pub async fn join_club(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    req: JoinClubRequest,
) -> AppResult<JoinOutcome> {
    let club = active_club(store, club_id).await?;

    if store.find_member(club_id, caller.id).await?.is_some() {
        return Err(AppError::Conflict("You are already a member of this club".into()));
    }

    if club.is_public {
        if club.is_full(store.count_members(club_id).await?) {
            return Err(AppError::Conflict("Club has reached its member limit".into()));
        }
        let membership = store
            .insert_member(club_id, caller.id, MemberRole::Member)
            .await?
            .ok_or_else(|| AppError::Conflict("You are already a member of this club".into()))?;
        tracing::info!(club_id = %club_id, user_id = %caller.id, "joined public club");
        return Ok(JoinOutcome::Joined { membership });
    }

    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let request = store
        .create_request(club_id, caller.id, message)
        .await?
        .ok_or_else(|| AppError::Conflict("You already have a pending request for this club".into()))?;
    tracing::info!(club_id = %club_id, request_id = %request.id, "membership requested");
    Ok(JoinOutcome::Requested { request })
}

pub async fn leave_club(store: &dyn ClubStore, caller: &AuthUser, club_id: Uuid) -> AppResult<()> {
    let club = active_club(store, club_id).await?;
    if club.owner_id == caller.id {
        return Err(AppError::BadRequest("The owner cannot leave their own club".into()));
    }
    if !store.remove_member(club_id, caller.id).await? {
        return Err(AppError::NotFound("You are not a member of this club".into()));
    }
    Ok(())
}

pub async fn pending_requests(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
) -> AppResult<Vec<RequestWithUser>> {
    let club = active_club(store, club_id).await?;
    ensure_owner(&club, caller)?;
    store.list_pending_requests(club_id).await
}

/// Shared precondition chain for approve and reject, up to and including
/// the status check.
async fn reviewable(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    request_id: Uuid,
) -> AppResult<(Club, MembershipRequest)> {
    let club = active_club(store, club_id).await?;
    ensure_owner(&club, caller)?;

    let request = store
        .find_request(request_id)
        .await?
        .filter(|r| r.club_id == club_id)
        .ok_or_else(|| AppError::NotFound("Membership request not found".into()))?;
    if request.status != RequestStatus::Pending {
        return Err(AppError::BadRequest(ALREADY_PROCESSED.into()));
    }
    Ok((club, request))
}

pub async fn approve_request(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    request_id: Uuid,
) -> AppResult<()> {
    let (club, request) = reviewable(store, caller, club_id, request_id).await?;

    // An existing member row makes the insert a no-op, so the cap does not apply.
    let already_member = store.find_member(club_id, request.user_id).await?.is_some();
    if !already_member && club.is_full(store.count_members(club_id).await?) {
        return Err(AppError::BadRequest("Club has reached its member limit".into()));
    }

    match store.approve_request(request.id).await? {
        ApprovalOutcome::Approved => {
            tracing::info!(
                club_id = %club_id,
                request_id = %request.id,
                user_id = %request.user_id,
                "membership request approved"
            );
            Ok(())
        }
        ApprovalOutcome::AlreadyProcessed => Err(AppError::BadRequest(ALREADY_PROCESSED.into())),
    }
}

pub async fn reject_request(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    request_id: Uuid,
) -> AppResult<()> {
    let (_, request) = reviewable(store, caller, club_id, request_id).await?;

    if !store.reject_request(request.id).await? {
        return Err(AppError::BadRequest(ALREADY_PROCESSED.into()));
    }
    tracing::info!(club_id = %club_id, request_id = %request.id, "membership request rejected");
    Ok(())
}
