use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Badge slugs that would collide with fixed routes.
pub const BADGE_INVALID_SLUGS: &[&str] = &["new"];

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub creator_id: Option<i64>,
    pub team_id: Option<i64>,
    pub is_unique: bool,
    pub nominations_accepted: bool,
    pub nominations_autoapproved: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Badge {
    pub fn url(&self) -> String {
        badge_url(&self.slug)
    }

    pub fn is_created_by(&self, user_id: i64) -> bool {
        self.creator_id == Some(user_id)
    }
}

pub fn badge_url(slug: &str) -> String {
    format!("/badges/{slug}")
}

pub struct NewBadge<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub creator_id: i64,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Award {
    pub id: i64,
    pub badge_id: i64,
    pub user_id: i64,
    pub creator_id: Option<i64>,
    pub description: String,
    pub hidden: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Award joined with badge and usernames.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AwardListing {
    pub id: i64,
    pub badge_title: String,
    pub badge_slug: String,
    pub username: String,
    pub creator_username: Option<String>,
    pub description: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwardOutcome {
    Awarded(Award),
    /// The badge is unique and the user already holds it.
    AlreadyAwarded,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Nomination {
    pub id: i64,
    pub badge_id: i64,
    pub nominee_id: i64,
    pub creator_id: Option<i64>,
    pub approver_id: Option<i64>,
    pub rejected_by_id: Option<i64>,
    pub rejected_reason: String,
    pub accepted: bool,
    pub award_id: Option<i64>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Nomination {
    pub fn is_pending(&self) -> bool {
        !self.accepted && self.rejected_by_id.is_none()
    }
}

/// Nomination joined with usernames.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NominationListing {
    pub id: i64,
    pub nominee_username: String,
    pub creator_username: Option<String>,
    pub accepted: bool,
    pub rejected: bool,
    pub rejected_reason: String,
    pub created_at: i64,
}
