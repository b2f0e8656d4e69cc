use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TeamApplication {
    pub id: i64,
    pub team_id: i64,
    pub creator_id: Option<i64>,
    pub approver_id: Option<i64>,
    pub comment: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl TeamApplication {
    pub fn is_pending(&self) -> bool {
        self.approver_id.is_none()
    }

    pub fn has_owner(&self, user_id: i64) -> bool {
        self.creator_id == Some(user_id)
    }

    pub fn url(&self, team_slug: &str) -> String {
        application_url(team_slug, self.id)
    }
}

pub fn application_url(team_slug: &str, application_id: i64) -> String {
    format!("/teams/{team_slug}/applications/{application_id}")
}

/// Application joined with its team and the usernames involved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApplicationListing {
    pub id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub team_slug: String,
    pub creator_username: Option<String>,
    pub approver_username: Option<String>,
    pub comment: String,
    pub created_at: i64,
}
