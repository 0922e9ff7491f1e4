pub mod admin;
pub mod auth;
pub mod file;
pub mod health;
pub mod upload;
pub mod user;
pub mod video;
