pub mod applications;
pub mod detail;
pub mod edit;
pub mod list;
pub mod members;

use badgus_database::Database;
use badgus_database::impls::teams;
use badgus_database::model::team::BadgeTeam;

use crate::error::WebError;

/// Teams listed per page.
pub const TEAMS_PAGE_SIZE: usize = 50;

pub(crate) async fn load_team(db: &Database, slug: &str) -> Result<BadgeTeam, WebError> {
    teams::get_team_by_slug(db, slug)
        .await?
        .ok_or(WebError::NotFound)
}
