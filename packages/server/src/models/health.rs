use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `OK` or `ERROR`.
    #[schema(example = "OK")]
    pub status: &'static str,
    pub uptime_secs: u64,
    /// `connected` or `disconnected`.
    #[schema(example = "connected")]
    pub database: &'static str,
    /// Configured object store backend.
    #[schema(example = "filesystem")]
    pub storage: &'static str,
    #[schema(example = "development")]
    pub environment: String,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EndpointGroups {
    pub auth: &'static str,
    pub videos: &'static str,
    pub users: &'static str,
    pub files: &'static str,
    pub health: &'static str,
    pub docs: &'static str,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointGroups,
}
