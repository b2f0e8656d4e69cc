use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use badgus_utils::formatting;
use badgus_utils::upload::UploadMeta;

use crate::model::user::User;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username_changes: i32,
    pub is_confirmed: bool,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub bio: String,
    pub organization: String,
    pub location: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl UserProfile {
    pub fn display_name<'a>(&'a self, username: &'a str) -> &'a str {
        formatting::display_name(self.display_name.as_deref(), username)
    }

    /// The profile's own user, staff and superusers may edit it.
    pub fn allows_edit(&self, viewer: &User) -> bool {
        viewer.id == self.user_id || viewer.is_staff || viewer.is_superuser
    }

    pub fn username_changes_remaining(&self, max_changes: u32) -> i64 {
        i64::from(max_changes) - i64::from(self.username_changes)
    }

    pub fn can_change_username(&self, max_changes: u32) -> bool {
        self.username_changes_remaining(max_changes) > 0
    }

    pub fn upload_meta(username: &str) -> UploadMeta {
        UploadMeta::new("profile", username)
    }
}

pub struct ProfileUpdate<'a> {
    pub display_name: Option<&'a str>,
    pub bio: &'a str,
    pub organization: &'a str,
    pub location: &'a str,
}

/// Result of a username change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameChange {
    Changed,
    /// The requested name equals the current one.
    Unchanged,
    LimitReached,
    Taken,
}

#[cfg(test)]
mod tests {
    use super::UserProfile;
    use crate::model::user::User;

    fn profile(user_id: i64, changes: i32) -> UserProfile {
        UserProfile {
            user_id,
            username_changes: changes,
            is_confirmed: false,
            display_name: None,
            avatar: None,
            bio: String::new(),
            organization: String::new(),
            location: String::new(),
            created_at: 0,
            modified_at: 0,
        }
    }

    fn user(id: i64, is_staff: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: String::new(),
            is_staff,
            is_superuser: false,
            is_active: true,
            date_joined: 0,
        }
    }

    #[test]
    fn edit_rights() {
        let p = profile(1, 0);
        assert!(p.allows_edit(&user(1, false)));
        assert!(!p.allows_edit(&user(2, false)));
        assert!(p.allows_edit(&user(3, true)));
    }

    #[test]
    fn username_change_allowance() {
        assert_eq!(profile(1, 1).username_changes_remaining(3), 2);
        assert!(profile(1, 2).can_change_username(3));
        assert!(!profile(1, 3).can_change_username(3));
    }

    #[test]
    fn display_name_prefers_profile_value() {
        let mut p = profile(1, 0);
        assert_eq!(p.display_name("user1"), "user1");
        p.display_name = Some("User One".to_owned());
        assert_eq!(p.display_name("user1"), "User One");
    }
}
