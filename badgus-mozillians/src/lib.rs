//! Vouch-status lookups against the Mozillians directory API.

mod client;

pub use client::VouchService;
