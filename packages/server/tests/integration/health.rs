use crate::common::TestApp;

#[tokio::test]
async fn health_reports_database_and_storage() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token("/health").await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "OK");
    assert_eq!(res.body["database"], "connected");
    assert_eq!(res.body["storage"], "recording");
    assert!(res.body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn root_lists_endpoint_groups() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token("/").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["endpoints"]["videos"], "/api/v1/videos");
}

#[tokio::test]
async fn unknown_routes_return_json_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token("/api/v1/nope").await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}
