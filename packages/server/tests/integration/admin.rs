use chrono::{Duration, Utc};
use reqwest::multipart::Form;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use otogram_server::entity::user;

use crate::common::{TestApp, image_part, routes};

mod listing {
    use super::*;

    #[tokio::test]
    async fn admin_lists_users_newest_first_with_pagination() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        app.create_authenticated_user("alice").await;
        app.create_authenticated_user("bob").await;

        let res = app
            .get_with_token(&format!("{}?page=1&limit=2", routes::USERS), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let users = res.body["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["username"], "bob");
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["totalPages"], 2);
    }

    #[tokio::test]
    async fn list_filters_by_role_and_search() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        app.create_user_with_role("alice", "creator").await;
        app.create_authenticated_user("bob").await;

        let creators = app
            .get_with_token(&format!("{}?role=creator", routes::USERS), &admin)
            .await;
        assert_eq!(creators.body["pagination"]["total"], 1);
        assert_eq!(creators.body["users"][0]["username"], "alice");

        let by_email = app
            .get_with_token(&format!("{}?search=BOB@EXAMPLE", routes::USERS), &admin)
            .await;
        assert_eq!(by_email.body["pagination"]["total"], 1);
        assert_eq!(by_email.body["users"][0]["username"], "bob");

        let bad_role = app
            .get_with_token(&format!("{}?role=superuser", routes::USERS), &admin)
            .await;
        assert_eq!(bad_role.status, 400);
    }

    #[tokio::test]
    async fn non_admin_cannot_list_users() {
        let app = TestApp::spawn().await;
        let (creator, _) = app.create_user_with_role("alice", "creator").await;

        let res = app.get_with_token(routes::USERS, &creator).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn admin_can_fetch_a_single_user() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(&routes::user(alice_id), &admin).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["email"], "alice@example.com");

        let missing = app.get_with_token(&routes::user(9999), &admin).await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn stats_count_roles_and_recent_signups() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        app.create_user_with_role("alice", "creator").await;
        app.create_authenticated_user("bob").await;

        let res = app.get_with_token(routes::USER_STATS, &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["roles"], json!({"admin": 1, "creator": 1, "user": 1}));
        assert_eq!(res.body["recentUsers"], 3);
        assert_eq!(res.body["banned"], 0);
    }

    #[tokio::test]
    async fn stats_count_bans_and_skip_old_signups() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_user_with_role("alice", "creator").await;
        let (_, bob_id) = app.create_authenticated_user("bob").await;
        app.create_authenticated_user("carol").await;

        let alice = user::Entity::find_by_id(alice_id as i32)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: user::ActiveModel = alice.into();
        active.created_at = Set(Utc::now() - Duration::days(30));
        active.update(&app.db).await.unwrap();

        let ban = app.patch_with_token(&routes::ban(bob_id), &json!({}), &admin).await;
        assert_eq!(ban.status, 200, "{}", ban.text);

        let res = app.get_with_token(routes::USER_STATS, &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total"], 4);
        assert_eq!(res.body["roles"], json!({"admin": 1, "creator": 1, "user": 2}));
        assert_eq!(res.body["banned"], 1);
        assert_eq!(res.body["recentUsers"], 3);
    }
}

mod roles {
    use super::*;

    #[tokio::test]
    async fn admin_changes_another_users_role() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_authenticated_user("alice").await;

        let res = app
            .patch_with_token(&routes::role(alice_id), &json!({"role": "creator"}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["role"], "creator");
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() {
        let app = TestApp::spawn().await;
        let (admin, admin_id) = app.create_user_with_role("admin", "admin").await;

        let res = app
            .patch_with_token(&routes::role(admin_id), &json!({"role": "user"}), &admin)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_authenticated_user("alice").await;

        let res = app
            .patch_with_token(&routes::role(alice_id), &json!({"role": "owner"}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod bans {
    use super::*;

    #[tokio::test]
    async fn banned_users_tokens_stop_working_until_unbanned() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (alice, alice_id) = app.create_authenticated_user("alice").await;

        let ban = app
            .patch_with_token(&routes::ban(alice_id), &json!({"reason": "spam"}), &admin)
            .await;
        assert_eq!(ban.status, 200, "{}", ban.text);
        assert_eq!(ban.body["user"]["isBanned"], true);
        assert_eq!(ban.body["user"]["banReason"], "spam");

        let denied = app.get_with_token(routes::AUTH_ME, &alice).await;
        assert_eq!(denied.status, 403);
        assert_eq!(denied.body["code"], "ACCOUNT_BANNED");

        let unban = app.patch_with_token(&routes::unban(alice_id), &json!({}), &admin).await;
        assert_eq!(unban.status, 200, "{}", unban.text);
        assert_eq!(unban.body["user"]["isBanned"], false);
        assert!(unban.body["user"]["banReason"].is_null());

        let allowed = app.get_with_token(routes::AUTH_ME, &alice).await;
        assert_eq!(allowed.status, 200);
    }

    #[tokio::test]
    async fn ban_reason_is_optional() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (_, alice_id) = app.create_authenticated_user("alice").await;

        let res = app
            .client
            .patch(format!("http://{}{}", app.addr, routes::ban(alice_id)))
            .header("Authorization", format!("Bearer {admin}"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn admin_cannot_ban_themselves() {
        let app = TestApp::spawn().await;
        let (admin, admin_id) = app.create_user_with_role("admin", "admin").await;

        let res = app.patch_with_token(&routes::ban(admin_id), &json!({}), &admin).await;

        assert_eq!(res.status, 403);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleting_a_user_removes_their_content_and_edges() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;
        let (alice, alice_id) = app.create_user_with_role("alice", "creator").await;
        let (bob, bob_id) = app.create_user_with_role("bob", "creator").await;

        app.multipart_with_token(
            routes::UPDATE_PROFILE_IMAGE,
            Form::new().part("profileImage", image_part("me.png")),
            &alice,
        )
        .await;
        let alices_root = app.create_video(&alice, "mine").await;
        let bobs_reply_on_alice = app.create_reply(&bob, alices_root, "on alice").await;
        let bobs_root = app.create_video(&bob, "bob's").await;
        let alices_reply_on_bob = app.create_reply(&alice, bobs_root, "on bob").await;
        app.post_with_token(&routes::like(bobs_root), &json!({}), &alice).await;
        app.post_with_token(&routes::follow(bob_id), &json!({}), &alice).await;
        app.post_with_token(&routes::follow(alice_id), &json!({}), &bob).await;

        let res = app.delete_with_token(&routes::user(alice_id), &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deletedUserId"], alice_id);
        assert_eq!(res.body["deletedVideosCount"], 3);

        for id in [alices_root, bobs_reply_on_alice, alices_reply_on_bob] {
            assert_eq!(app.get_without_token(&routes::video(id)).await.status, 404);
        }
        let bobs = app.get_without_token(&routes::video(bobs_root)).await;
        assert_eq!(bobs.status, 200);
        assert_eq!(bobs.body["likesCount"], 0);
        assert_eq!(bobs.body["repliesCount"], 0);

        let followers = app.get_without_token(&routes::followers(bob_id)).await;
        assert_eq!(followers.body["count"], 0);
        let following = app.get_without_token(&routes::following(bob_id)).await;
        assert_eq!(following.body["count"], 0);

        let deleted = app.store.deleted_keys();
        assert!(deleted.iter().any(|k| k.starts_with("profiles/")));
        assert_eq!(deleted.len(), 4);

        let gone = app.get_with_token(&routes::user(alice_id), &admin).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn admin_cannot_delete_themselves() {
        let app = TestApp::spawn().await;
        let (admin, admin_id) = app.create_user_with_role("admin", "admin").await;

        let res = app.delete_with_token(&routes::user(admin_id), &admin).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn deleting_a_missing_user_is_not_found() {
        let app = TestApp::spawn().await;
        let (admin, _) = app.create_user_with_role("admin", "admin").await;

        let res = app.delete_with_token(&routes::user(9999), &admin).await;

        assert_eq!(res.status, 404);
    }
}
