use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;

use otogram_common::storage::filesystem::FilesystemObjectStore;
use otogram_common::storage::{ObjectKey, ObjectStore, StorageError, StoredObject};
use otogram_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, FilesystemStorageConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
use otogram_server::entity::{user, video};
use otogram_server::media::MediaGateway;
use otogram_server::state::AppState;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";
pub const PASSWORD: &str = "secret1";
pub const MAX_VIDEO_SIZE: u64 = 64 * 1024;
pub const MAX_IMAGE_SIZE: u64 = 16 * 1024;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const AUTH_ME: &str = "/api/v1/auth/me";

    pub const VIDEOS: &str = "/api/v1/videos";
    pub const VIDEO_UPLOAD: &str = "/api/v1/videos/upload";
    pub const TRENDING: &str = "/api/v1/videos/trending/popular";

    pub fn video(id: i64) -> String {
        format!("/api/v1/videos/{id}")
    }

    pub fn reply(parent_id: i64) -> String {
        format!("/api/v1/videos/reply/{parent_id}")
    }

    pub fn like(id: i64) -> String {
        format!("/api/v1/videos/{id}/like")
    }

    pub fn save(id: i64) -> String {
        format!("/api/v1/videos/{id}/save")
    }

    pub fn view(id: i64) -> String {
        format!("/api/v1/videos/{id}/view")
    }

    pub fn share(id: i64) -> String {
        format!("/api/v1/videos/{id}/share")
    }

    pub fn user_videos(username: &str) -> String {
        format!("/api/v1/videos/user/{username}")
    }

    pub fn user_replies(username: &str) -> String {
        format!("/api/v1/videos/user/{username}/replies")
    }

    pub const USERS: &str = "/api/v1/users";
    pub const USERS_ME: &str = "/api/v1/users/me";
    pub const UPDATE_USERNAME: &str = "/api/v1/users/me/update-username";
    pub const UPDATE_BIO: &str = "/api/v1/users/me/update-bio";
    pub const UPDATE_PROFILE_IMAGE: &str = "/api/v1/users/me/update-profile-image";
    pub const PROFILE_IMAGE: &str = "/api/v1/users/me/profile-image";
    pub const LIKED_VIDEOS: &str = "/api/v1/users/me/liked-videos";
    pub const SAVED_VIDEOS: &str = "/api/v1/users/me/saved-videos";
    pub const USER_STATS: &str = "/api/v1/users/stats/overview";

    pub fn user(id: i64) -> String {
        format!("/api/v1/users/{id}")
    }

    pub fn follow(id: i64) -> String {
        format!("/api/v1/users/{id}/follow")
    }

    pub fn followers(id: i64) -> String {
        format!("/api/v1/users/{id}/followers")
    }

    pub fn following(id: i64) -> String {
        format!("/api/v1/users/{id}/following")
    }

    pub fn profile(username: &str) -> String {
        format!("/api/v1/users/profile/{username}")
    }

    pub fn search(query: &str) -> String {
        format!("/api/v1/users/search/{query}")
    }

    pub fn role(id: i64) -> String {
        format!("/api/v1/users/role/{id}")
    }

    pub fn ban(id: i64) -> String {
        format!("/api/v1/users/{id}/ban")
    }

    pub fn unban(id: i64) -> String {
        format!("/api/v1/users/{id}/unban")
    }

    pub fn file(folder: &str, file_id: &str) -> String {
        format!("/api/v1/files/{folder}/{file_id}")
    }
}

/// A store operation observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put(String),
    Delete(String),
}

/// Filesystem store that records every put and delete, and can be told to
/// fail all deletes to simulate an unreachable bucket.
pub struct RecordingStore {
    inner: FilesystemObjectStore,
    ops: Mutex<Vec<StoreOp>>,
    fail_deletes: bool,
}

impl RecordingStore {
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::Delete(key) => Some(key),
                StoreOp::Put(_) => None,
            })
            .collect()
    }

    pub async fn contains(&self, key: &str) -> bool {
        let key = ObjectKey::parse(key).expect("valid key");
        self.inner.exists(&key).await.expect("exists check failed")
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.ops.lock().unwrap().push(StoreOp::Put(key.to_string()));
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        self.inner.get(key).await
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        self.ops
            .lock()
            .unwrap()
            .push(StoreOp::Delete(key.to_string()));
        if self.fail_deletes {
            return Err(StorageError::Remote("bucket unreachable".into()));
        }
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// A running test server backed by a throwaway SQLite database and object root.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub store: Arc<RecordingStore>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    /// Spawn a server whose object store rejects every delete.
    pub async fn spawn_with_failing_deletes() -> Self {
        Self::spawn_with(true).await
    }

    async fn spawn_with(fail_deletes: bool) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = otogram_server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        otogram_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let public_base_url = format!("http://{addr}/api/v1/files");

        let objects_root = dir.path().join("objects");
        let store = Arc::new(RecordingStore {
            inner: FilesystemObjectStore::new(objects_root.clone(), MAX_VIDEO_SIZE)
                .await
                .expect("Failed to create object store"),
            ops: Mutex::new(Vec::new()),
            fail_deletes,
        });

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                token_ttl_secs: 3600,
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                public_base_url: public_base_url.clone(),
                filesystem: FilesystemStorageConfig { root: objects_root },
                s3: None,
                max_video_size: MAX_VIDEO_SIZE,
                max_image_size: MAX_IMAGE_SIZE,
            },
            bootstrap_admin: None,
        };

        let state = AppState {
            db: db.clone(),
            config: Arc::new(app_config),
            media: MediaGateway::new(store.clone(), &public_base_url),
        };

        let app = otogram_server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            store,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn multipart_with_token(&self, path: &str, form: Form, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload a root video and return the response.
    pub async fn upload_video(&self, token: &str, description: &str) -> TestResponse {
        self.multipart_with_token(routes::VIDEO_UPLOAD, video_form(description), token)
            .await
    }

    /// Upload a root video, asserting success, and return its `id`.
    pub async fn create_video(&self, token: &str, description: &str) -> i64 {
        let res = self.upload_video(token, description).await;
        assert_eq!(res.status, 201, "create_video failed: {}", res.text);
        res.body["video"]["id"].as_i64().expect("video id")
    }

    /// Upload a reply, asserting success, and return its `id`.
    pub async fn create_reply(&self, token: &str, parent_id: i64, description: &str) -> i64 {
        let res = self
            .multipart_with_token(&routes::reply(parent_id), video_form(description), token)
            .await;
        assert_eq!(res.status, 201, "create_reply failed: {}", res.text);
        res.body["video"]["id"].as_i64().expect("reply id")
    }

    /// Insert `count` root videos owned by `user_id` straight into the
    /// database, oldest first, without touching the object store.
    pub async fn insert_root_videos(&self, user_id: i64, count: usize) {
        let owner = i32::try_from(user_id).expect("user id fits in i32");
        let start = Utc::now() - Duration::seconds(count as i64);
        let rows: Vec<video::ActiveModel> = (0..count)
            .map(|i| {
                let at = start + Duration::seconds(i as i64);
                video::ActiveModel {
                    user_id: Set(owner),
                    video_url: Set(format!("https://cdn.example.com/videos/bulk-{i}.mp4")),
                    video_key: Set(None),
                    thumbnail_url: Set(None),
                    thumbnail_key: Set(None),
                    file_size: Set(1024),
                    mime_type: Set("video/mp4".into()),
                    description: Set(format!("bulk {i}")),
                    hashtags: Set(serde_json::json!([])),
                    is_reply: Set(false),
                    parent_video_id: Set(None),
                    views: Set(0),
                    shares: Set(0),
                    is_public: Set(true),
                    is_active: Set(true),
                    report_count: Set(0),
                    created_at: Set(at),
                    updated_at: Set(at),
                    ..Default::default()
                }
            })
            .collect();

        // Stay under SQLite's bind-parameter limit per statement.
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let batch: Vec<_> = rows.by_ref().take(1000).collect();
            video::Entity::insert_many(batch)
                .exec_without_returning(&self.db)
                .await
                .expect("Failed to insert videos");
        }
    }

    /// Register a user and return `(token, id)`.
    pub async fn create_authenticated_user(&self, username: &str) -> (String, i64) {
        let res = self
            .post_without_token(
                routes::REGISTER,
                &serde_json::json!({
                    "username": username,
                    "email": email_for(username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);

        let token = res.body["token"]
            .as_str()
            .expect("Registration response should contain a token")
            .to_string();
        let id = res.body["user"]["id"].as_i64().expect("user id");
        (token, id)
    }

    /// Register a user, assign `role` directly in the database, then log in.
    pub async fn create_user_with_role(&self, username: &str, role: &str) -> (String, i64) {
        let (_, id) = self.create_authenticated_user(username).await;

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role.to_string());
        active.update(&self.db).await.expect("Failed to update user role");

        (self.login(username).await, id)
    }

    pub async fn login(&self, username: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &serde_json::json!({
                    "email": email_for(username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

pub fn email_for(username: &str) -> String {
    format!("{username}@example.com")
}

pub fn video_part() -> Part {
    Part::bytes(b"\x00\x00\x00\x18ftypmp42fake-video".to_vec())
        .file_name("clip.mp4")
        .mime_str("video/mp4")
        .expect("Failed to set MIME type")
}

pub fn image_part(file_name: &str) -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\nfake-image".to_vec())
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .expect("Failed to set MIME type")
}

pub fn video_form(description: &str) -> Form {
    Form::new()
        .part("video", video_part())
        .text("description", description.to_string())
}
