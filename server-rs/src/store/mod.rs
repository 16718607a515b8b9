//! Persistence seam. Handlers and services only see [`ClubStore`]; the
//! Postgres implementation lives in [`postgres`], tests use [`memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::*;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgClubStore;

/// One of a user's memberships joined with its club and the club's owner.
#[derive(Debug, Clone)]
pub struct UserClubRow {
    pub club: Club,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub owner: UserSummary,
    pub member_count: i64,
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    async fn ping(&self) -> bool;

    // --- Users ---

    /// Returns `None` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> AppResult<Option<User>>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdateRequest,
    ) -> AppResult<Option<User>>;

    // --- Clubs ---

    /// Creates the club and its owner membership row in one transaction.
    async fn create_club(&self, owner_id: Uuid, new: &CreateClubRequest) -> AppResult<Club>;
    async fn find_club(&self, id: Uuid) -> AppResult<Option<Club>>;
    async fn update_club(&self, id: Uuid, update: &UpdateClubRequest) -> AppResult<Option<Club>>;
    async fn deactivate_club(&self, id: Uuid) -> AppResult<()>;
    /// Active clubs, oldest first.
    async fn list_clubs(&self, filter: &ClubFilter) -> AppResult<Vec<ClubSummary>>;

    // --- Members ---

    async fn find_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<Option<ClubMember>>;
    async fn count_members(&self, club_id: Uuid) -> AppResult<i64>;
    /// Returns `None` when the (club, user) pair already exists.
    async fn insert_member(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<Option<ClubMember>>;
    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    /// Ordered by join time ascending.
    async fn list_members(&self, club_id: Uuid) -> AppResult<Vec<MemberWithUser>>;
    async fn user_memberships(&self, user_id: Uuid) -> AppResult<Vec<UserClubRow>>;

    // --- Membership requests ---

    /// Returns `None` when the user already has a pending request for the club.
    async fn create_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        message: Option<&str>,
    ) -> AppResult<Option<MembershipRequest>>;
    async fn find_request(&self, id: Uuid) -> AppResult<Option<MembershipRequest>>;
    async fn find_pending_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<MembershipRequest>>;
    async fn list_pending_requests(&self, club_id: Uuid) -> AppResult<Vec<RequestWithUser>>;
    /// Flips `PENDING -> APPROVED` and inserts the member row atomically.
    async fn approve_request(&self, id: Uuid) -> AppResult<ApprovalOutcome>;
    /// Flips `PENDING -> REJECTED`; `false` if the request was not pending.
    async fn reject_request(&self, id: Uuid) -> AppResult<bool>;

    // --- Events and announcements ---

    async fn create_event(&self, club_id: Uuid, created_by: Uuid, new: &NewEvent)
        -> AppResult<Event>;
    /// Active events dated now or later, soonest first.
    async fn upcoming_events(&self, club_id: Uuid, limit: i64) -> AppResult<Vec<Event>>;
    async fn count_active_events(&self, club_id: Uuid) -> AppResult<i64>;
    async fn create_announcement(
        &self,
        club_id: Uuid,
        author_id: Uuid,
        new: &CreateAnnouncementRequest,
    ) -> AppResult<Announcement>;
    /// Active announcements, newest first.
    async fn recent_announcements(&self, club_id: Uuid, limit: i64)
        -> AppResult<Vec<Announcement>>;
    async fn count_active_announcements(&self, club_id: Uuid) -> AppResult<i64>;
}
