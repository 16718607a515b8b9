use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::store::ClubStore;

const DETAIL_EVENT_LIMIT: i64 = 10;
const DETAIL_ANNOUNCEMENT_LIMIT: i64 = 5;
const USER_CLUB_EVENT_LIMIT: i64 = 3;

/// Loads a club that exists and has not been deactivated.
pub async fn active_club(store: &dyn ClubStore, club_id: Uuid) -> AppResult<Club> {
    store
        .find_club(club_id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::NotFound("Club not found".into()))
}

pub fn ensure_owner(club: &Club, caller: &AuthUser) -> AppResult<()> {
    if club.owner_id != caller.id {
        return Err(AppError::Forbidden(
            "Only the club owner can perform this action".into(),
        ));
    }
    Ok(())
}

/// Owner, or a member holding the `admin` role.
pub async fn ensure_manager(store: &dyn ClubStore, club: &Club, caller: &AuthUser) -> AppResult<()> {
    if club.owner_id == caller.id {
        return Ok(());
    }
    match store.find_member(club.id, caller.id).await? {
        Some(m) if m.role.can_manage() => Ok(()),
        _ => Err(AppError::Forbidden(
            "Only club owners and admins can perform this action".into(),
        )),
    }
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

fn check_cap(max_members: Option<i32>) -> AppResult<()> {
    match max_members {
        Some(cap) if cap < 1 => Err(AppError::BadRequest(
            "maxMembers must be at least 1".into(),
        )),
        _ => Ok(()),
    }
}

pub async fn create_club(
    store: &dyn ClubStore,
    caller: &AuthUser,
    req: CreateClubRequest,
) -> AppResult<Club> {
    check_cap(req.max_members)?;
    let clean = CreateClubRequest {
        name: required(&req.name, "name")?,
        description: required(&req.description, "description")?,
        category: required(&req.category, "category")?,
        is_public: req.is_public,
        max_members: req.max_members,
        tags: clean_tags(&req.tags),
    };
    let club = store.create_club(caller.id, &clean).await?;
    tracing::info!(club_id = %club.id, owner_id = %caller.id, "club created");
    Ok(club)
}

pub async fn update_club(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    req: UpdateClubRequest,
) -> AppResult<Club> {
    let club = active_club(store, club_id).await?;
    ensure_owner(&club, caller)?;
    check_cap(req.max_members)?;

    let clean = UpdateClubRequest {
        name: req.name.as_deref().map(|v| required(v, "name")).transpose()?,
        description: req
            .description
            .as_deref()
            .map(|v| required(v, "description"))
            .transpose()?,
        category: req
            .category
            .as_deref()
            .map(|v| required(v, "category"))
            .transpose()?,
        is_public: req.is_public,
        max_members: req.max_members,
        tags: req.tags.as_deref().map(clean_tags),
    };
    store
        .update_club(club_id, &clean)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))
}

pub async fn deactivate_club(store: &dyn ClubStore, caller: &AuthUser, club_id: Uuid) -> AppResult<()> {
    let club = active_club(store, club_id).await?;
    ensure_owner(&club, caller)?;
    store.deactivate_club(club_id).await?;
    tracing::info!(club_id = %club_id, "club deactivated");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ClubCounts {
    pub members: i64,
    pub events: i64,
    pub announcements: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubDetail {
    #[serde(flatten)]
    pub club: Club,
    pub owner: UserSummary,
    pub members: Vec<MemberWithUser>,
    pub events: Vec<Event>,
    pub announcements: Vec<Announcement>,
    #[serde(rename = "_count")]
    pub counts: ClubCounts,
    pub is_owner: bool,
    pub is_member: bool,
    pub has_pending_request: bool,
}

pub async fn club_detail(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
) -> AppResult<ClubDetail> {
    let club = active_club(store, club_id).await?;
    let owner = store
        .find_user(club.owner_id)
        .await?
        .map(|u| UserSummary::from(&u))
        .ok_or_else(|| AppError::Internal(format!("owner of club {club_id} is missing")))?;

    let members = store.list_members(club_id).await?;
    let events = store.upcoming_events(club_id, DETAIL_EVENT_LIMIT).await?;
    let announcements = store
        .recent_announcements(club_id, DETAIL_ANNOUNCEMENT_LIMIT)
        .await?;
    let counts = ClubCounts {
        members: members.len() as i64,
        events: store.count_active_events(club_id).await?,
        announcements: store.count_active_announcements(club_id).await?,
    };

    let is_member = members.iter().any(|m| m.member.user_id == caller.id);
    let has_pending_request = !is_member
        && store
            .find_pending_request(club_id, caller.id)
            .await?
            .is_some();

    Ok(ClubDetail {
        is_owner: club.owner_id == caller.id,
        is_member,
        has_pending_request,
        club,
        owner,
        members,
        events,
        announcements,
        counts,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClubView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub is_owner: bool,
    pub member_count: i64,
    pub owner: UserSummary,
    pub upcoming_events: Vec<EventSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClubs {
    pub success: bool,
    pub clubs: Vec<UserClubView>,
    pub total_joined_clubs: usize,
}

pub async fn user_clubs(store: &dyn ClubStore, caller: &AuthUser) -> AppResult<UserClubs> {
    let rows = store.user_memberships(caller.id).await?;

    let mut clubs = Vec::with_capacity(rows.len());
    for row in rows {
        let upcoming_events = store
            .upcoming_events(row.club.id, USER_CLUB_EVENT_LIMIT)
            .await?
            .into_iter()
            .map(|e| EventSummary {
                id: e.id,
                title: e.title,
                event_date: e.event_date,
                location: e.location,
            })
            .collect();
        clubs.push(UserClubView {
            id: row.club.id,
            is_owner: row.club.owner_id == caller.id,
            name: row.club.name,
            description: row.club.description,
            category: row.club.category,
            is_public: row.club.is_public,
            tags: row.club.tags,
            role: row.role,
            joined_at: row.joined_at,
            member_count: row.member_count,
            owner: row.owner,
            upcoming_events,
        });
    }

    Ok(UserClubs {
        success: true,
        total_joined_clubs: clubs.len(),
        clubs,
    })
}

pub async fn create_event(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    req: CreateEventRequest,
) -> AppResult<Event> {
    let club = active_club(store, club_id).await?;
    ensure_manager(store, &club, caller).await?;

    let title = required(&req.title, "title")?;
    let event_date = DateTime::parse_from_rfc3339(req.event_date.trim())
        .map_err(|_| AppError::BadRequest("eventDate must be an RFC 3339 timestamp".into()))?
        .with_timezone(&Utc);
    let new = NewEvent {
        title,
        description: req.description.trim().to_string(),
        location: req
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        event_date,
    };
    store.create_event(club_id, caller.id, &new).await
}

pub async fn create_announcement(
    store: &dyn ClubStore,
    caller: &AuthUser,
    club_id: Uuid,
    req: CreateAnnouncementRequest,
) -> AppResult<Announcement> {
    let club = active_club(store, club_id).await?;
    ensure_manager(store, &club, caller).await?;

    let new = CreateAnnouncementRequest {
        title: required(&req.title, "title")?,
        content: required(&req.content, "content")?,
    };
    store.create_announcement(club_id, caller.id, &new).await
}
