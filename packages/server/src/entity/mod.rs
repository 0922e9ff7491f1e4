pub mod follow;
pub mod user;
pub mod video;
pub mod video_like;
pub mod video_save;
