//! In-memory [`ClubStore`] used by unit and router tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ClubStore, UserClubRow};
use crate::error::AppResult;
use crate::models::*;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    clubs: Vec<Club>,
    members: Vec<ClubMember>,
    requests: Vec<MembershipRequest>,
    events: Vec<Event>,
    announcements: Vec<Announcement>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn member_rows(&self, club_id: Uuid, user_id: Uuid) -> usize {
        self.tables
            .lock()
            .await
            .members
            .iter()
            .filter(|m| m.club_id == club_id && m.user_id == user_id)
            .count()
    }

    /// Inserts a user directly; tests never need a real password hash.
    pub async fn seed_user(&self, email: &str, name: &str) -> User {
        self.create_user(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            password_hash: String::new(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    pub async fn seed_club(&self, owner: &User, name: &str, description: &str, public: bool) -> Club {
        self.create_club(
            owner.id,
            &CreateClubRequest {
                name: name.to_string(),
                description: description.to_string(),
                category: "General".to_string(),
                is_public: Some(public),
                max_members: None,
                tags: vec![],
            },
        )
        .await
        .unwrap()
    }
}

fn summary_of(t: &Tables, c: &Club) -> ClubSummary {
    ClubSummary {
        id: c.id,
        name: c.name.clone(),
        description: c.description.clone(),
        category: c.category.clone(),
        is_public: c.is_public,
        tags: c.tags.clone(),
        owner_id: c.owner_id,
        member_count: t.members.iter().filter(|m| m.club_id == c.id).count() as i64,
        event_count: t
            .events
            .iter()
            .filter(|e| e.club_id == c.id && e.is_active)
            .count() as i64,
        created_at: c.created_at,
    }
}

fn user_summary(t: &Tables, id: Uuid) -> Option<UserSummary> {
    t.users.iter().find(|u| u.id == id).map(UserSummary::from)
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn ping(&self) -> bool {
        true
    }

    async fn create_user(&self, new: NewUser) -> AppResult<Option<User>> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            return Ok(None);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            bio: None,
            image: None,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdateRequest,
    ) -> AppResult<Option<User>> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(bio) = &update.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(image) = &update.image {
            user.image = Some(image.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn create_club(&self, owner_id: Uuid, new: &CreateClubRequest) -> AppResult<Club> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let club = Club {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            description: new.description.clone(),
            category: new.category.clone(),
            is_public: new.is_public.unwrap_or(true),
            max_members: new.max_members,
            tags: new.tags.clone(),
            owner_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.clubs.push(club.clone());
        t.members.push(ClubMember {
            club_id: club.id,
            user_id: owner_id,
            role: MemberRole::Owner,
            joined_at: now,
        });
        Ok(club)
    }

    async fn find_club(&self, id: Uuid) -> AppResult<Option<Club>> {
        let t = self.tables.lock().await;
        Ok(t.clubs.iter().find(|c| c.id == id).cloned())
    }

    async fn update_club(&self, id: Uuid, update: &UpdateClubRequest) -> AppResult<Option<Club>> {
        let mut t = self.tables.lock().await;
        let Some(club) = t.clubs.iter_mut().find(|c| c.id == id && c.is_active) else {
            return Ok(None);
        };
        if let Some(v) = &update.name {
            club.name = v.clone();
        }
        if let Some(v) = &update.description {
            club.description = v.clone();
        }
        if let Some(v) = &update.category {
            club.category = v.clone();
        }
        if let Some(v) = update.is_public {
            club.is_public = v;
        }
        if let Some(v) = update.max_members {
            club.max_members = Some(v);
        }
        if let Some(v) = &update.tags {
            club.tags = v.clone();
        }
        club.updated_at = Utc::now();
        Ok(Some(club.clone()))
    }

    async fn deactivate_club(&self, id: Uuid) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        if let Some(club) = t.clubs.iter_mut().find(|c| c.id == id) {
            club.is_active = false;
        }
        Ok(())
    }

    async fn list_clubs(&self, filter: &ClubFilter) -> AppResult<Vec<ClubSummary>> {
        let t = self.tables.lock().await;
        let q = filter
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let category = filter
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut clubs: Vec<&Club> = t
            .clubs
            .iter()
            .filter(|c| c.is_active && (filter.include_private || c.is_public))
            .filter(|c| category.map_or(true, |cat| c.category.eq_ignore_ascii_case(cat)))
            .filter(|c| {
                q.as_deref().map_or(true, |q| {
                    c.name.to_lowercase().contains(q) || c.description.to_lowercase().contains(q)
                })
            })
            .collect();
        clubs.sort_by_key(|c| c.created_at);
        Ok(clubs.into_iter().map(|c| summary_of(&t, c)).collect())
    }

    async fn find_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<Option<ClubMember>> {
        let t = self.tables.lock().await;
        Ok(t.members
            .iter()
            .find(|m| m.club_id == club_id && m.user_id == user_id)
            .cloned())
    }

    async fn count_members(&self, club_id: Uuid) -> AppResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.members.iter().filter(|m| m.club_id == club_id).count() as i64)
    }

    async fn insert_member(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<Option<ClubMember>> {
        let mut t = self.tables.lock().await;
        if t.members
            .iter()
            .any(|m| m.club_id == club_id && m.user_id == user_id)
        {
            return Ok(None);
        }
        let member = ClubMember {
            club_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        t.members.push(member.clone());
        Ok(Some(member))
    }

    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.members.len();
        t.members
            .retain(|m| !(m.club_id == club_id && m.user_id == user_id));
        Ok(t.members.len() < before)
    }

    async fn list_members(&self, club_id: Uuid) -> AppResult<Vec<MemberWithUser>> {
        let t = self.tables.lock().await;
        let mut members: Vec<MemberWithUser> = t
            .members
            .iter()
            .filter(|m| m.club_id == club_id)
            .filter_map(|m| {
                user_summary(&t, m.user_id).map(|user| MemberWithUser {
                    member: m.clone(),
                    user,
                })
            })
            .collect();
        members.sort_by_key(|m| m.member.joined_at);
        Ok(members)
    }

    async fn user_memberships(&self, user_id: Uuid) -> AppResult<Vec<UserClubRow>> {
        let t = self.tables.lock().await;
        let mut rows = Vec::new();
        for m in t.members.iter().filter(|m| m.user_id == user_id) {
            let Some(club) = t.clubs.iter().find(|c| c.id == m.club_id && c.is_active) else {
                continue;
            };
            let Some(owner) = user_summary(&t, club.owner_id) else {
                continue;
            };
            rows.push(UserClubRow {
                club: club.clone(),
                role: m.role,
                joined_at: m.joined_at,
                owner,
                member_count: t.members.iter().filter(|x| x.club_id == club.id).count() as i64,
            });
        }
        rows.sort_by_key(|r| r.joined_at);
        Ok(rows)
    }

    async fn create_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        message: Option<&str>,
    ) -> AppResult<Option<MembershipRequest>> {
        let mut t = self.tables.lock().await;
        if t.requests.iter().any(|r| {
            r.club_id == club_id && r.user_id == user_id && r.status == RequestStatus::Pending
        }) {
            return Ok(None);
        }
        let now = Utc::now();
        let request = MembershipRequest {
            id: Uuid::new_v4(),
            club_id,
            user_id,
            message: message.map(String::from),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.requests.push(request.clone());
        Ok(Some(request))
    }

    async fn find_request(&self, id: Uuid) -> AppResult<Option<MembershipRequest>> {
        let t = self.tables.lock().await;
        Ok(t.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn find_pending_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<MembershipRequest>> {
        let t = self.tables.lock().await;
        Ok(t.requests
            .iter()
            .find(|r| {
                r.club_id == club_id && r.user_id == user_id && r.status == RequestStatus::Pending
            })
            .cloned())
    }

    async fn list_pending_requests(&self, club_id: Uuid) -> AppResult<Vec<RequestWithUser>> {
        let t = self.tables.lock().await;
        Ok(t.requests
            .iter()
            .filter(|r| r.club_id == club_id && r.status == RequestStatus::Pending)
            .filter_map(|r| {
                user_summary(&t, r.user_id).map(|user| RequestWithUser {
                    request: r.clone(),
                    user,
                })
            })
            .collect())
    }

    async fn approve_request(&self, id: Uuid) -> AppResult<ApprovalOutcome> {
        // Holding the lock across both writes stands in for the transaction.
        let mut t = self.tables.lock().await;
        let Some(request) = t
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Pending)
        else {
            return Ok(ApprovalOutcome::AlreadyProcessed);
        };
        request.status = RequestStatus::Approved;
        request.updated_at = Utc::now();
        let (club_id, user_id) = (request.club_id, request.user_id);

        if !t
            .members
            .iter()
            .any(|m| m.club_id == club_id && m.user_id == user_id)
        {
            t.members.push(ClubMember {
                club_id,
                user_id,
                role: MemberRole::Member,
                joined_at: Utc::now(),
            });
        }
        Ok(ApprovalOutcome::Approved)
    }

    async fn reject_request(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.lock().await;
        match t
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Pending)
        {
            Some(request) => {
                request.status = RequestStatus::Rejected;
                request.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_event(
        &self,
        club_id: Uuid,
        created_by: Uuid,
        new: &NewEvent,
    ) -> AppResult<Event> {
        let mut t = self.tables.lock().await;
        let event = Event {
            id: Uuid::new_v4(),
            club_id,
            title: new.title.clone(),
            description: new.description.clone(),
            location: new.location.clone(),
            event_date: new.event_date,
            is_active: true,
            created_by,
            created_at: Utc::now(),
        };
        t.events.push(event.clone());
        Ok(event)
    }

    async fn upcoming_events(&self, club_id: Uuid, limit: i64) -> AppResult<Vec<Event>> {
        let t = self.tables.lock().await;
        let now = Utc::now();
        let mut events: Vec<Event> = t
            .events
            .iter()
            .filter(|e| e.club_id == club_id && e.is_active && e.event_date >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn count_active_events(&self, club_id: Uuid) -> AppResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.events
            .iter()
            .filter(|e| e.club_id == club_id && e.is_active)
            .count() as i64)
    }

    async fn create_announcement(
        &self,
        club_id: Uuid,
        author_id: Uuid,
        new: &CreateAnnouncementRequest,
    ) -> AppResult<Announcement> {
        let mut t = self.tables.lock().await;
        let announcement = Announcement {
            id: Uuid::new_v4(),
            club_id,
            title: new.title.clone(),
            content: new.content.clone(),
            is_active: true,
            author_id,
            created_at: Utc::now(),
        };
        t.announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn recent_announcements(
        &self,
        club_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Announcement>> {
        let t = self.tables.lock().await;
        let mut announcements: Vec<Announcement> = t
            .announcements
            .iter()
            .filter(|a| a.club_id == club_id && a.is_active)
            .cloned()
            .collect();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        announcements.truncate(limit.max(0) as usize);
        Ok(announcements)
    }

    async fn count_active_announcements(&self, club_id: Uuid) -> AppResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.announcements
            .iter()
            .filter(|a| a.club_id == club_id && a.is_active)
            .count() as i64)
    }
}
