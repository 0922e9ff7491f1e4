use serde_json::json;

use otogram_server::models::role::Role;
use otogram_server::utils::jwt;

use crate::common::{JWT_SECRET, PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_and_receives_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "email": "Alice@X.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["user"]["username"], "alice");
        assert_eq!(res.body["user"]["email"], "alice@x.com");
        assert_eq!(res.body["user"]["role"], "user");
        assert_eq!(res.body["user"]["profileImage"], "/default-avatar.png");
        assert!(res.body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_username() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "email": "other@x.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn email_uniqueness_ignores_case() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice2", "email": "ALICE@example.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_a_password_that_is_too_short() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "email": "a@x.com", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_with_an_invalid_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "email": "not-an-email", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_with_an_invalid_username() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "no spaces!", "email": "a@x.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn arabic_usernames_are_accepted() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "مريم_1", "email": "m@x.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"username": "alice"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn registered_user_can_login_with_any_email_case() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ALICE@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["user"]["username"], "alice");
        assert!(res.body["user"]["lastLogin"].is_string());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "wrong-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_gets_the_same_error_as_a_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn banned_user_cannot_login() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_authenticated_user("alice").await;

        let ban = app
            .patch_with_token(&routes::ban(alice_id), &json!({"reason": "spam"}), &admin)
            .await;
        assert_eq!(ban.status, 200, "{}", ban.text);

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ACCOUNT_BANNED");
    }
}

mod identity {
    use super::*;

    #[tokio::test]
    async fn me_returns_the_token_owner() {
        let app = TestApp::spawn().await;
        let (token, id) = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::AUTH_ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["user"]["id"], id);
        assert_eq!(res.body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::AUTH_ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::AUTH_ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, id) = app.create_authenticated_user("alice").await;
        let forged = jwt::sign(id as i32, Role::Admin, "some-other-secret", 3600).unwrap();

        let res = app.get_with_token(routes::AUTH_ME, &forged).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, id) = app.create_authenticated_user("alice").await;
        let expired = jwt::sign_at(id as i32, Role::User, JWT_SECRET, 1_000_000, 60).unwrap();

        let res = app.get_with_token(routes::AUTH_ME, &expired).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn token_of_a_deleted_user_is_rejected() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (token, id) = app.create_authenticated_user("alice").await;

        let del = app.delete_with_token(&routes::user(id), &admin).await;
        assert_eq!(del.status, 200, "{}", del.text);

        let res = app.get_with_token(routes::AUTH_ME, &token).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "IDENTITY_NOT_FOUND");
    }

    #[tokio::test]
    async fn role_is_read_from_the_database_not_the_token() {
        let app = TestApp::spawn().await;
        let (token, id) = app.create_authenticated_user("alice").await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;

        let denied = app.upload_video(&token, "first").await;
        assert_eq!(denied.status, 403);

        let promote = app
            .patch_with_token(&routes::role(id), &json!({"role": "creator"}), &admin)
            .await;
        assert_eq!(promote.status, 200, "{}", promote.text);

        let res = app.upload_video(&token, "first").await;
        assert_eq!(res.status, 201, "{}", res.text);
    }
}
