use std::collections::{BTreeMap, HashMap};

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use badgus_core::ValidationError;
use badgus_core::authz;
use badgus_database::model::user::User;
use badgus_utils::imaging::{Dimensions, scale_image};
use badgus_utils::permissions::PermissionSet;

use crate::error::WebError;

/// Errors shown next to form fields, plus form-wide ones.
#[derive(Debug, Default, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<&'static str, Vec<String>>,
    pub form: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, err: &ValidationError) {
        match err.field() {
            Some(field) => self.fields.entry(field).or_default().push(err.to_string()),
            None => self.form.push(err.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    /// Record the error from `result`, if any, and return the value.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.add(&err);
                None
            }
        }
    }
}

impl From<ValidationError> for FormErrors {
    fn from(err: ValidationError) -> Self {
        let mut errors = Self::default();
        errors.add(&err);
        errors
    }
}

/// A form page re-rendered with its errors, answered as 400.
pub fn rejected(page: Html<String>) -> Response {
    (StatusCode::BAD_REQUEST, page).into_response()
}

/// Text fields and non-empty file uploads of a multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<u8>>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if field.file_name().is_some() {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.files.insert(name, bytes.to_vec());
                }
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }
}

/// Scale uploaded image bytes off the async runtime.
pub async fn scale_upload(
    bytes: Vec<u8>,
    max_size: Dimensions,
    field: &'static str,
) -> Result<Result<Vec<u8>, ValidationError>, WebError> {
    let scaled = tokio::task::spawn_blocking(move || scale_image(&bytes, max_size))
        .await
        .map_err(|e| WebError::Internal(anyhow::anyhow!("image scaling task failed: {e}")))?;
    Ok(scaled.map_err(|err| {
        tracing::debug!(?err, field, "rejected uploaded image");
        ValidationError::CannotProcessImage { field }
    }))
}

/// Fail with 403 unless `codename` is held.
pub fn require(perms: &PermissionSet, codename: &str) -> Result<(), WebError> {
    if perms.contains(codename) {
        Ok(())
    } else {
        Err(WebError::PermissionDenied)
    }
}

/// Site-level check for views not tied to an object.
pub fn require_site(viewer: Option<&User>, codename: &str) -> Result<PermissionSet, WebError> {
    let perms = authz::site_permissions_for(viewer);
    require(&perms, codename)?;
    Ok(perms)
}

/// Trimmed optional text; blank becomes `None`.
pub fn optional_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use badgus_core::ValidationError;
    use badgus_utils::permissions::{PermissionSet, VIEW_BADGETEAM};

    use axum::http::StatusCode;
    use axum::response::Html;

    use super::{FormErrors, optional_text, rejected, require, scale_upload};

    #[test]
    fn errors_group_by_field() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());
        errors.add(&ValidationError::TeamNameTaken);
        errors.add(&ValidationError::AlreadyMember);
        assert_eq!(
            errors.fields["name"],
            vec!["A team with that name already exists.".to_owned()]
        );
        assert_eq!(errors.form, vec!["You are already a member of this team.".to_owned()]);
        assert_eq!(errors.check(Ok::<_, ValidationError>(3)), Some(3));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let perms = PermissionSet::from_codenames(&[VIEW_BADGETEAM]);
        assert!(require(&perms, VIEW_BADGETEAM).is_ok());
        assert!(require(&perms, "teams.change_badgeteam").is_err());
    }

    #[test]
    fn rejected_forms_are_bad_requests() {
        let response = rejected(Html("<form></form>".to_owned()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text(" a "), Some("a"));
    }

    #[tokio::test]
    async fn garbage_images_are_validation_errors() {
        let result = scale_upload(b"not an image".to_vec(), (16, 16), "image")
            .await
            .unwrap();
        assert_eq!(
            result,
            Err(ValidationError::CannotProcessImage { field: "image" })
        );
    }
}
