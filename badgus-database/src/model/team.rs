use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use badgus_utils::upload::UploadMeta;

/// Team names that would collide with fixed routes.
pub const BADGETEAM_INVALID_NAMES: &[&str] = &["new"];

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BadgeTeam {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl BadgeTeam {
    pub fn url(&self) -> String {
        team_url(&self.slug)
    }

    pub fn upload_meta(&self) -> UploadMeta {
        UploadMeta::new("team", self.id.to_string())
    }
}

pub fn team_url(slug: &str) -> String {
    format!("/teams/{slug}")
}

pub struct TeamInput<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    pub is_owner: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

/// A team's member joined with their account and profile.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberListing {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub is_owner: bool,
}

/// A user's membership joined with the team.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Membership {
    pub team_id: i64,
    pub team_name: String,
    pub team_slug: String,
    pub team_image: Option<String>,
    pub is_owner: bool,
}

/// Row of the admin team listing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamAdminRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub member_count: i64,
}
