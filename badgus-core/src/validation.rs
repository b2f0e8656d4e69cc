use std::sync::LazyLock;

use badgus_database::model::badge::BADGE_INVALID_SLUGS;
use badgus_database::model::team::BADGETEAM_INVALID_NAMES;
use badgus_utils::slug::slugify;
use regex::Regex;

pub const TEAM_NAME_MAX_CHARS: usize = 128;
pub const BADGE_TITLE_MAX_CHARS: usize = 255;
pub const USERNAME_MAX_CHARS: usize = 30;
pub const DISPLAY_NAME_MAX_CHARS: usize = 64;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const ORGANIZATION_MAX_CHARS: usize = 255;
pub const LOCATION_MAX_CHARS: usize = 255;

/// A user-facing form error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required { field: &'static str },
    #[error("Ensure this value has at most {max} characters.")]
    TooLong { field: &'static str, max: usize },
    #[error("Invalid name")]
    InvalidTeamName,
    #[error("A team with that name already exists.")]
    TeamNameTaken,
    #[error("Cannot process image")]
    CannotProcessImage { field: &'static str },
    #[error("You are already a member of this team.")]
    AlreadyMember,
    #[error(
        "Enter a valid username. This value may contain only letters, numbers and @/./+/-/_ characters."
    )]
    InvalidUsername,
    #[error("A user with that username already exists.")]
    UsernameTaken,
    #[error("You have no username changes remaining.")]
    UsernameChangeLimit,
    #[error("This password is too short. It must contain at least 8 characters.")]
    PasswordTooShort,
    #[error("Please enter a correct username and password.")]
    InvalidCredentials,
    #[error("Invalid title")]
    InvalidBadgeTitle,
    #[error("A badge with that title already exists.")]
    BadgeTitleTaken,
    #[error("You can only create badges for teams you belong to.")]
    NotTeamMember,
    #[error("No user named \"{0}\".")]
    UnknownUser(String),
    #[error("That user already has this badge.")]
    AlreadyAwarded,
    #[error("This badge does not accept nominations.")]
    NominationsClosed,
}

impl ValidationError {
    /// Form field the error is shown next to; `None` for form-wide errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::CannotProcessImage { field } => Some(*field),
            Self::InvalidTeamName | Self::TeamNameTaken => Some("name"),
            Self::InvalidUsername | Self::UsernameTaken | Self::UsernameChangeLimit => {
                Some("username")
            }
            Self::PasswordTooShort => Some("password"),
            Self::InvalidBadgeTitle | Self::BadgeTitleTaken => Some("title"),
            Self::NotTeamMember => Some("team"),
            Self::AlreadyMember
            | Self::InvalidCredentials
            | Self::UnknownUser(_)
            | Self::AlreadyAwarded
            | Self::NominationsClosed => None,
        }
    }
}

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@.+_-]+$").expect("username pattern is valid"));

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(trimmed)
    }
}

/// Whether `slug` would shadow one of the `reserved` route segments or be
/// collapsed as a `.`/`..` path segment.
fn is_reserved_slug(slug: &str, reserved: &[&str]) -> bool {
    matches!(slug, "." | "..") || reserved.iter().any(|word| word.eq_ignore_ascii_case(slug))
}

fn at_most(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

/// Trimmed team name that is not reserved and yields a usable slug.
pub fn clean_team_name(raw: &str) -> Result<String, ValidationError> {
    let name = required("name", raw)?;
    at_most("name", name, TEAM_NAME_MAX_CHARS)?;
    let slug = slugify(name);
    if slug.is_empty()
        || is_reserved_slug(name, BADGETEAM_INVALID_NAMES)
        || is_reserved_slug(&slug, BADGETEAM_INVALID_NAMES)
    {
        return Err(ValidationError::InvalidTeamName);
    }
    Ok(name.to_owned())
}

pub fn clean_comment(raw: &str) -> Result<String, ValidationError> {
    required("comment", raw).map(str::to_owned)
}

pub fn clean_username(raw: &str) -> Result<String, ValidationError> {
    let username = required("username", raw)?;
    at_most("username", username, USERNAME_MAX_CHARS)?;
    // Usernames name the avatar upload directory.
    if !USERNAME_CHARS.is_match(username) || username.chars().all(|c| c == '.') {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(username.to_owned())
}

/// Passwords are checked untrimmed.
pub fn clean_password(raw: &str) -> Result<&str, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }
    if raw.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(raw)
}

pub fn clean_badge_title(raw: &str) -> Result<String, ValidationError> {
    let title = required("title", raw)?;
    at_most("title", title, BADGE_TITLE_MAX_CHARS)?;
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(ValidationError::Required { field: "title" });
    }
    if is_reserved_slug(&slug, BADGE_INVALID_SLUGS) {
        return Err(ValidationError::InvalidBadgeTitle);
    }
    Ok(title.to_owned())
}

/// Blank display names clear the field.
pub fn clean_display_name(raw: &str) -> Result<Option<String>, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Ok(None);
    }
    at_most("display_name", name, DISPLAY_NAME_MAX_CHARS)?;
    Ok(Some(name.to_owned()))
}

pub fn clean_organization(raw: &str) -> Result<String, ValidationError> {
    let organization = raw.trim();
    at_most("organization", organization, ORGANIZATION_MAX_CHARS)?;
    Ok(organization.to_owned())
}

pub fn clean_location(raw: &str) -> Result<String, ValidationError> {
    let location = raw.trim();
    at_most("location", location, LOCATION_MAX_CHARS)?;
    Ok(location.to_owned())
}
