use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: bool,
    pub max_members: Option<i32>,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Club {
    pub fn is_full(&self, member_count: i64) -> bool {
        self.max_members
            .map(|cap| member_count >= i64::from(cap))
            .unwrap_or(false)
    }
}

/// Listing row: an active club with aggregate counts. Also the input to the
/// suggestion resolver.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClubSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub member_count: i64,
    pub event_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClubFilter {
    pub category: Option<String>,
    pub q: Option<String>,
    /// Include private clubs. Never set from query strings.
    #[serde(skip)]
    pub include_private: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClubRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: Option<bool>,
    pub max_members: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
    pub max_members: Option<i32>,
    pub tags: Option<Vec<String>>,
}
