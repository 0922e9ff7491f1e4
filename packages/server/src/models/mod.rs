pub mod auth;
pub mod health;
pub mod role;
pub mod shared;
pub mod user;
pub mod video;
