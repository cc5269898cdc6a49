//! `MediaWiki` client contract tests against a mock `api.php`.

#![allow(clippy::unwrap_used, clippy::panic)]

use attu_core::platform::{WikiClient, WikiError};
use attu_wiki::MediaWikiClient;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_tokens(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("meta", "tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": { "tokens": { "logintoken": "lt123+\\", "csrftoken": "csrf456+\\" } }
        })))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> MediaWikiClient {
    MediaWikiClient::new(format!("{}/api.php", server.uri())).unwrap()
}

#[tokio::test]
async fn login_posts_credentials_with_login_token() {
    let server = MockServer::start().await;
    mount_tokens(&server).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .and(body_string_contains("action=login"))
        .and(body_string_contains("lgname=AttuBot"))
        .and(body_string_contains("lgpassword=bot-key"))
        .and(body_string_contains("lgtoken=lt123%2B%5C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": { "result": "Success", "lguserid": 7, "lgusername": "AttuBot" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server).login("AttuBot", "bot-key").await.unwrap();
    assert_eq!(token, "csrf456+\\");
}

#[tokio::test]
async fn refused_login_is_an_auth_error() {
    let server = MockServer::start().await;
    mount_tokens(&server).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .and(body_string_contains("action=login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": { "result": "Failed", "reason": "Incorrect username or password entered." }
        })))
        .mount(&server)
        .await;

    let err = client(&server).login("AttuBot", "wrong").await.unwrap_err();
    match err {
        WikiError::Auth { reason } => assert!(reason.contains("Incorrect")),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn page_text_comes_from_parse_wikitext() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("action", "parse"))
        .and(query_param("page", "Timeline"))
        .and(query_param("prop", "wikitext"))
        .and(query_param("formatversion", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "parse": { "title": "Timeline", "pageid": 12, "wikitext": "Current Year: 9 PC" }
        })))
        .mount(&server)
        .await;

    let text = client(&server).get_page_text("Timeline").await.unwrap();
    assert_eq!(text, "Current Year: 9 PC");
}

#[tokio::test]
async fn api_error_body_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("action", "parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": "missingtitle", "info": "The page you specified doesn't exist." }
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_page_text("Nope").await.unwrap_err();
    match err {
        WikiError::Api { code, .. } => assert_eq!(code, "missingtitle"),
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn edit_sends_bot_minor_edit_with_csrf_token() {
    let server = MockServer::start().await;
    mount_tokens(&server).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .and(body_string_contains("action=edit"))
        .and(body_string_contains("title=Timeline"))
        .and(body_string_contains("summary=Bumped+to+Year+10+PC"))
        .and(body_string_contains("bot=1"))
        .and(body_string_contains("minor=1"))
        .and(body_string_contains("token=csrf456%2B%5C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "edit": { "result": "Success", "pageid": 12, "title": "Timeline" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .edit_page("Timeline", "Current Year: 10 PC", "Bumped to Year 10 PC")
        .await
        .unwrap();
}

#[tokio::test]
async fn block_is_indefinite() {
    let server = MockServer::start().await;
    mount_tokens(&server).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .and(body_string_contains("action=block"))
        .and(body_string_contains("user=Spammer"))
        .and(body_string_contains("expiry=infinite"))
        .and(body_string_contains("reason=link+spam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "block": { "user": "Spammer", "expiry": "infinite", "id": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).block_user("Spammer", "link spam").await.unwrap();
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api.php"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server).get_page_text("Timeline").await.unwrap_err();
    match err {
        WikiError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}
