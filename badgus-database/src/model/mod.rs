pub mod application;
pub mod badge;
pub mod profile;
pub mod team;
pub mod user;
