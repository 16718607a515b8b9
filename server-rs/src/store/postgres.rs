use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{ClubStore, UserClubRow};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::*;

#[derive(Clone)]
pub struct PgClubStore {
    pool: PgPool,
}

impl PgClubStore {
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(config.db.pool_min)
            .max_connections(config.db.pool_max)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&config.database_url())
            .await?;
        Ok(Self { pool })
    }
}

const CLUB_SUMMARY_SELECT: &str = r#"SELECT c.id, c.name, c.description, c.category, c.is_public, c.tags, c.owner_id, c.created_at,
    (SELECT COUNT(*) FROM club_members m WHERE m.club_id = c.id)::bigint AS member_count,
    (SELECT COUNT(*) FROM events e WHERE e.club_id = c.id AND e.is_active)::bigint AS event_count
FROM clubs c"#;

#[derive(sqlx::FromRow)]
struct MemberRow {
    #[sqlx(flatten)]
    member: ClubMember,
    name: String,
    email: String,
    image: Option<String>,
}

impl From<MemberRow> for MemberWithUser {
    fn from(row: MemberRow) -> Self {
        let user = UserSummary {
            id: row.member.user_id,
            name: row.name,
            email: row.email,
            image: row.image,
        };
        Self {
            member: row.member,
            user,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    #[sqlx(flatten)]
    request: MembershipRequest,
    name: String,
    email: String,
    image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    #[sqlx(flatten)]
    club: Club,
    role: MemberRole,
    joined_at: DateTime<Utc>,
    owner_name: String,
    owner_email: String,
    owner_image: Option<String>,
    member_count: i64,
}

#[async_trait]
impl ClubStore for PgClubStore {
    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    async fn create_user(&self, new: NewUser) -> AppResult<Option<User>> {
        let user = sqlx::query_as(
            r#"INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (email) DO NOTHING
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdateRequest,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as(
            r#"UPDATE users SET
                name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                image = COALESCE($4, image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.bio)
        .bind(&update.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_club(&self, owner_id: Uuid, new: &CreateClubRequest) -> AppResult<Club> {
        let mut tx = self.pool.begin().await?;

        let club: Club = sqlx::query_as(
            r#"INSERT INTO clubs (id, name, description, category, is_public, max_members, tags, owner_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.is_public.unwrap_or(true))
        .bind(new.max_members)
        .bind(&new.tags)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO club_members (club_id, user_id, role, joined_at) VALUES ($1, $2, 'owner', NOW())",
        )
        .bind(club.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(club)
    }

    async fn find_club(&self, id: Uuid) -> AppResult<Option<Club>> {
        let club = sqlx::query_as("SELECT * FROM clubs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(club)
    }

    async fn update_club(&self, id: Uuid, update: &UpdateClubRequest) -> AppResult<Option<Club>> {
        let club = sqlx::query_as(
            r#"UPDATE clubs SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                is_public = COALESCE($5, is_public),
                max_members = COALESCE($6, max_members),
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING *"#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.category)
        .bind(update.is_public)
        .bind(update.max_members)
        .bind(&update.tags)
        .fetch_optional(&self.pool)
        .await?;
        Ok(club)
    }

    async fn deactivate_club(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE clubs SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_clubs(&self, filter: &ClubFilter) -> AppResult<Vec<ClubSummary>> {
        let search = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{q}%"));
        let category = filter
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let sql = format!(
            r#"{CLUB_SUMMARY_SELECT}
            WHERE c.is_active
                AND ($1 OR c.is_public)
                AND ($2::text IS NULL OR LOWER(c.category) = LOWER($2))
                AND ($3::text IS NULL OR c.name ILIKE $3 OR c.description ILIKE $3)
            ORDER BY c.created_at ASC"#
        );
        let clubs = sqlx::query_as(&sql)
            .bind(filter.include_private)
            .bind(category)
            .bind(search)
            .fetch_all(&self.pool)
            .await?;
        Ok(clubs)
    }

    async fn find_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<Option<ClubMember>> {
        let member = sqlx::query_as(
            "SELECT club_id, user_id, role, joined_at FROM club_members WHERE club_id = $1 AND user_id = $2",
        )
        .bind(club_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn count_members(&self, club_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM club_members WHERE club_id = $1",
        )
        .bind(club_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_member(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<Option<ClubMember>> {
        let member = sqlx::query_as(
            r#"INSERT INTO club_members (club_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (club_id, user_id) DO NOTHING
            RETURNING club_id, user_id, role, joined_at"#,
        )
        .bind(club_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM club_members WHERE club_id = $1 AND user_id = $2")
            .bind(club_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, club_id: Uuid) -> AppResult<Vec<MemberWithUser>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"SELECT m.club_id, m.user_id, m.role, m.joined_at, u.name, u.email, u.image
            FROM club_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.club_id = $1
            ORDER BY m.joined_at ASC"#,
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MemberWithUser::from).collect())
    }

    async fn user_memberships(&self, user_id: Uuid) -> AppResult<Vec<UserClubRow>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"SELECT c.*, m.role, m.joined_at,
                u.name AS owner_name, u.email AS owner_email, u.image AS owner_image,
                (SELECT COUNT(*) FROM club_members cm WHERE cm.club_id = c.id)::bigint AS member_count
            FROM club_members m
            JOIN clubs c ON c.id = m.club_id
            JOIN users u ON u.id = c.owner_id
            WHERE m.user_id = $1 AND c.is_active
            ORDER BY m.joined_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserClubRow {
                owner: UserSummary {
                    id: row.club.owner_id,
                    name: row.owner_name,
                    email: row.owner_email,
                    image: row.owner_image,
                },
                club: row.club,
                role: row.role,
                joined_at: row.joined_at,
                member_count: row.member_count,
            })
            .collect())
    }

    async fn create_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
        message: Option<&str>,
    ) -> AppResult<Option<MembershipRequest>> {
        let request = sqlx::query_as(
            r#"INSERT INTO membership_requests (id, club_id, user_id, message, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'PENDING', NOW(), NOW())
            ON CONFLICT DO NOTHING
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(club_id)
        .bind(user_id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> AppResult<Option<MembershipRequest>> {
        let request = sqlx::query_as("SELECT * FROM membership_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn find_pending_request(
        &self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<MembershipRequest>> {
        let request = sqlx::query_as(
            "SELECT * FROM membership_requests WHERE club_id = $1 AND user_id = $2 AND status = 'PENDING'",
        )
        .bind(club_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn list_pending_requests(&self, club_id: Uuid) -> AppResult<Vec<RequestWithUser>> {
        let rows: Vec<RequestRow> = sqlx::query_as(
            r#"SELECT r.*, u.name, u.email, u.image
            FROM membership_requests r
            JOIN users u ON u.id = r.user_id
            WHERE r.club_id = $1 AND r.status = 'PENDING'
            ORDER BY r.created_at ASC"#,
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RequestWithUser {
                user: UserSummary {
                    id: row.request.user_id,
                    name: row.name,
                    email: row.email,
                    image: row.image,
                },
                request: row.request,
            })
            .collect())
    }

    async fn approve_request(&self, id: Uuid) -> AppResult<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        // The status guard makes a concurrent second approval update zero rows
        // once the first commits.
        let flipped: Option<(Uuid, Uuid)> = sqlx::query_as(
            r#"UPDATE membership_requests SET status = 'APPROVED', updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING club_id, user_id"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((club_id, user_id)) = flipped else {
            return Ok(ApprovalOutcome::AlreadyProcessed);
        };

        sqlx::query(
            r#"INSERT INTO club_members (club_id, user_id, role, joined_at)
            VALUES ($1, $2, 'member', NOW())
            ON CONFLICT (club_id, user_id) DO NOTHING"#,
        )
        .bind(club_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ApprovalOutcome::Approved)
    }

    async fn reject_request(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE membership_requests SET status = 'REJECTED', updated_at = NOW() WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_event(
        &self,
        club_id: Uuid,
        created_by: Uuid,
        new: &NewEvent,
    ) -> AppResult<Event> {
        let event = sqlx::query_as(
            r#"INSERT INTO events (id, club_id, title, description, location, event_date, is_active, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, true, $7, NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(club_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.event_date)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn upcoming_events(&self, club_id: Uuid, limit: i64) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as(
            r#"SELECT * FROM events
            WHERE club_id = $1 AND is_active AND event_date >= NOW()
            ORDER BY event_date ASC
            LIMIT $2"#,
        )
        .bind(club_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn count_active_events(&self, club_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM events WHERE club_id = $1 AND is_active",
        )
        .bind(club_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_announcement(
        &self,
        club_id: Uuid,
        author_id: Uuid,
        new: &CreateAnnouncementRequest,
    ) -> AppResult<Announcement> {
        let announcement = sqlx::query_as(
            r#"INSERT INTO announcements (id, club_id, title, content, is_active, author_id, created_at)
            VALUES ($1, $2, $3, $4, true, $5, NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(club_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(announcement)
    }

    async fn recent_announcements(
        &self,
        club_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Announcement>> {
        let announcements = sqlx::query_as(
            r#"SELECT * FROM announcements
            WHERE club_id = $1 AND is_active
            ORDER BY created_at DESC
            LIMIT $2"#,
        )
        .bind(club_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(announcements)
    }

    async fn count_active_announcements(&self, club_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM announcements WHERE club_id = $1 AND is_active",
        )
        .bind(club_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
