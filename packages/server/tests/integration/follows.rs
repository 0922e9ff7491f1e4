use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn following_twice_is_a_no_op() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_authenticated_user("alice").await;
    let (_, bob_id) = app.create_authenticated_user("bob").await;

    let first = app.post_with_token(&routes::follow(bob_id), &json!({}), &alice).await;
    assert_eq!(first.status, 200, "{}", first.text);
    assert_eq!(first.body["followed"], true);

    let second = app.post_with_token(&routes::follow(bob_id), &json!({}), &alice).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.body["followed"], false);

    let followers = app.get_without_token(&routes::followers(bob_id)).await;
    assert_eq!(followers.body["count"], 1);
    assert_eq!(followers.body["users"][0]["id"], alice_id);

    let following = app.get_without_token(&routes::following(alice_id)).await;
    assert_eq!(following.body["count"], 1);
    assert_eq!(following.body["users"][0]["id"], bob_id);
}

#[tokio::test]
async fn unfollowing_a_non_followed_user_is_not_an_error() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_authenticated_user("alice").await;
    let (_, bob_id) = app.create_authenticated_user("bob").await;

    let res = app.delete_with_token(&routes::follow(bob_id), &alice).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["unfollowed"], false);
}

#[tokio::test]
async fn unfollow_removes_both_sides() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_authenticated_user("alice").await;
    let (_, bob_id) = app.create_authenticated_user("bob").await;
    app.post_with_token(&routes::follow(bob_id), &json!({}), &alice).await;

    let res = app.delete_with_token(&routes::follow(bob_id), &alice).await;
    assert_eq!(res.body["unfollowed"], true);

    let followers = app.get_without_token(&routes::followers(bob_id)).await;
    assert_eq!(followers.body["count"], 0);
    let following = app.get_without_token(&routes::following(alice_id)).await;
    assert_eq!(following.body["count"], 0);
}

#[tokio::test]
async fn cannot_follow_yourself() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_authenticated_user("alice").await;

    let res = app.post_with_token(&routes::follow(alice_id), &json!({}), &alice).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn following_a_missing_user_is_not_found() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_authenticated_user("alice").await;

    let res = app.post_with_token(&routes::follow(9999), &json!({}), &alice).await;

    assert_eq!(res.status, 404);
}
