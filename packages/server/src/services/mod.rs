pub mod catalog;
pub mod engagement;
pub mod follow;
pub mod lifecycle;
pub mod policy;
