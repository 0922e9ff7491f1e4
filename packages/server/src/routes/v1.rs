use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{admin, auth, file, upload, user, video};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/videos", video_routes(config))
        .nest("/users", user_routes(config))
        .nest("/files", file_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
}

fn video_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let reads = OpenApiRouter::new()
        .routes(routes!(video::list_videos))
        .routes(routes!(video::get_video, video::delete_video))
        .routes(routes!(video::trending))
        .routes(routes!(video::user_videos))
        .routes(routes!(video::user_replies))
        .routes(routes!(video::toggle_like))
        .routes(routes!(video::toggle_save))
        .routes(routes!(video::record_view))
        .routes(routes!(video::record_share));

    // Video plus optional thumbnail.
    let uploads = OpenApiRouter::new()
        .routes(routes!(video::upload_video))
        .routes(routes!(video::upload_reply))
        .layer(upload::upload_body_limit(config.storage.max_video_size, 2));

    reads.merge(uploads)
}

fn user_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let profile = OpenApiRouter::new()
        .routes(routes!(user::get_me))
        .routes(routes!(user::update_username))
        .routes(routes!(user::update_bio))
        .routes(routes!(user::delete_profile_image))
        .routes(routes!(user::liked_videos))
        .routes(routes!(user::saved_videos))
        .routes(routes!(user::follow_user, user::unfollow_user))
        .routes(routes!(user::list_followers))
        .routes(routes!(user::list_following))
        .routes(routes!(user::get_profile))
        .routes(routes!(user::search_users));

    let avatar = OpenApiRouter::new()
        .routes(routes!(user::update_profile_image))
        .layer(upload::upload_body_limit(config.storage.max_image_size, 1));

    let moderation = OpenApiRouter::new()
        .routes(routes!(admin::list_users))
        .routes(routes!(admin::get_user, admin::delete_user))
        .routes(routes!(admin::update_role))
        .routes(routes!(admin::ban_user))
        .routes(routes!(admin::unban_user))
        .routes(routes!(admin::stats_overview));

    profile.merge(avatar).merge(moderation)
}

fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(file::get_file))
}
