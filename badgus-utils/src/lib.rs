/// Display helpers (names, truncation, redirect targets).
pub mod formatting;
/// Crop-and-scale for uploaded images.
pub mod imaging;
/// Shared pagination helper utilities.
pub mod pagination;
/// Permission codenames and role policies.
pub mod permissions;
/// URL slug generation.
pub mod slug;
/// Shared time helpers.
pub mod time;
/// Upload path construction and storage.
pub mod upload;
