use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record. The password hash never leaves `impls::accounts`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: i64,
}

impl User {
    pub fn profile_url(&self) -> String {
        profile_url(&self.username)
    }
}

pub fn profile_url(username: &str) -> String {
    format!("/profiles/{username}")
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl<'a> NewUser<'a> {
    /// Regular account with no administrative flags.
    pub fn regular(username: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            username,
            email,
            password,
            is_staff: false,
            is_superuser: false,
        }
    }
}
