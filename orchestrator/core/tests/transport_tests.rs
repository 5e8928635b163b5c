// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP adapters against a mock platform: the reqwest transport and the
//! UAA token service.

use cfpush_core::application::commands::GetApplication;
use cfpush_core::application::{CredentialRetry, Operation, OperationContext};
use cfpush_core::domain::auth::{AccessToken, TokenError, TokenService};
use cfpush_core::domain::session::{OrgRef, Session, SpaceRef};
use cfpush_core::domain::transport::{
    HttpMethod, HttpRequest, MultipartField, RequestBody, Transport, TransportError,
};
use cfpush_core::infrastructure::{ReqwestTransport, UaaTokenService, ZipArchiver};
use mockito::Matcher;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5)).unwrap()
}

fn url(server: &mockito::ServerGuard, path: &str) -> Url {
    Url::parse(&format!("{}{}", server.url(), path)).unwrap()
}

#[tokio::test]
async fn test_json_response_is_parsed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/apps")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total_results": 0, "resources": []}"#)
        .create_async()
        .await;

    let request = HttpRequest::new(HttpMethod::Get, url(&server, "/v2/apps"))
        .header("Accept", "application/json");
    let response = transport().execute(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.unwrap()["total_results"], 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_and_plain_text_bodies() {
    let mut server = mockito::Server::new_async().await;
    let _deleted = server
        .mock("DELETE", "/v2/apps/app-1")
        .with_status(204)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/v2/info")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let deleted = transport()
        .execute(HttpRequest::new(HttpMethod::Delete, url(&server, "/v2/apps/app-1")))
        .await
        .unwrap();
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_none());

    let broken = transport()
        .execute(HttpRequest::new(HttpMethod::Get, url(&server, "/v2/info")))
        .await
        .unwrap();
    assert_eq!(broken.status, 502);
    assert_eq!(broken.body.unwrap(), json!({"response": "Bad Gateway"}));
}

#[tokio::test]
async fn test_json_body_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/routes")
        .match_body(Matcher::Json(json!({"host": "demo", "domain_guid": "dom-1"})))
        .with_status(201)
        .with_body(r#"{"metadata": {"guid": "route-1"}}"#)
        .create_async()
        .await;

    let request = HttpRequest::new(HttpMethod::Post, url(&server, "/v2/routes"))
        .header("Content-Type", "application/json")
        .body(RequestBody::Json(json!({"host": "demo", "domain_guid": "dom-1"})));
    let response = transport().execute(request).await.unwrap();

    assert_eq!(response.status, 201);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_upload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/v2/apps/app-1/bits")
        .match_query(Matcher::UrlEncoded("async".into(), "true".into()))
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="resources""#.into()),
            Matcher::Regex(r#"name="application"; filename="application.zip""#.into()),
        ]))
        .with_status(201)
        .with_body(r#"{"metadata": {"guid": "job-1", "url": "/v2/jobs/job-1"}, "entity": {"status": "queued"}}"#)
        .create_async()
        .await;

    let mut archive = tempfile::NamedTempFile::new().unwrap();
    archive.write_all(b"PK\x05\x06").unwrap();

    let request = HttpRequest::new(HttpMethod::Put, url(&server, "/v2/apps/app-1/bits?async=true"))
        .header("Content-Type", "application/json")
        .body(RequestBody::Multipart(vec![
            MultipartField::Text {
                name: "resources".into(),
                value: "[]".into(),
            },
            MultipartField::File {
                name: "application".into(),
                path: archive.path().to_path_buf(),
                file_name: "application.zip".into(),
            },
        ]));
    let response = transport().execute(request).await.unwrap();

    assert_eq!(response.status, 201);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_upload_file_is_io_error() {
    let server = mockito::Server::new_async().await;
    let request = HttpRequest::new(HttpMethod::Put, url(&server, "/v2/apps/app-1/bits"))
        .body(RequestBody::Multipart(vec![MultipartField::File {
            name: "application".into(),
            path: "/nonexistent/cfpush.zip".into(),
            file_name: "application.zip".into(),
        }]));

    let result = transport().execute(request).await;

    assert!(matches!(result, Err(TransportError::Io(_))));
}

#[tokio::test]
async fn test_discover_authorization_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let _info = server
        .mock("GET", "/v2/info")
        .with_status(200)
        .with_body(r#"{"name": "vcap", "authorization_endpoint": "https://login.example.com"}"#)
        .create_async()
        .await;

    let endpoint = UaaTokenService::discover(&reqwest::Client::new(), &url(&server, "/"))
        .await
        .unwrap();

    assert_eq!(endpoint.as_str(), "https://login.example.com/");
}

#[tokio::test]
async fn test_password_login() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth/token")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "password".into()),
            Matcher::UrlEncoded("username".into(), "dev@example.com".into()),
            Matcher::UrlEncoded("password".into(), "s3cret".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token": "abc", "refresh_token": "def", "token_type": "bearer"}"#)
        .create_async()
        .await;

    let uaa = UaaTokenService::new(reqwest::Client::new(), &url(&server, "/"), "cf", "").unwrap();
    let token = uaa.login("dev@example.com", "s3cret").await.unwrap();

    assert_eq!(token.access_token, "abc");
    assert_eq!(token.refresh_token.as_deref(), Some("def"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_keeps_unrotated_refresh_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "def".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token": "xyz"}"#)
        .create_async()
        .await;

    let uaa = UaaTokenService::new(reqwest::Client::new(), &url(&server, "/"), "cf", "").unwrap();
    let token = uaa
        .refresh(&AccessToken::new("abc").with_refresh_token("def"))
        .await
        .unwrap();

    assert_eq!(token.access_token, "xyz");
    assert_eq!(token.refresh_token.as_deref(), Some("def"));
    assert_eq!(token.authorization_header(), "bearer xyz");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_rejections() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"error": "invalid_token"}"#)
        .create_async()
        .await;
    let uaa = UaaTokenService::new(reqwest::Client::new(), &url(&server, "/"), "cf", "").unwrap();

    let rejected = uaa
        .refresh(&AccessToken::new("abc").with_refresh_token("def"))
        .await;
    assert!(matches!(rejected, Err(TokenError::Rejected(_))));

    let missing = uaa.refresh(&AccessToken::new("abc")).await;
    assert!(matches!(missing, Err(TokenError::NoRefreshToken)));
}

#[tokio::test]
async fn test_expired_token_refreshed_against_live_endpoints() {
    let mut server = mockito::Server::new_async().await;
    let expired = server
        .mock("GET", "/v2/spaces/space-1/apps")
        .match_header("authorization", "bearer stale")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"code": 1000, "description": "Invalid Auth Token", "error_code": "CF-InvalidAuthToken"}"#)
        .create_async()
        .await;
    let refreshed = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_body(r#"{"access_token": "fresh", "token_type": "bearer"}"#)
        .create_async()
        .await;
    let found = server
        .mock("GET", "/v2/spaces/space-1/apps")
        .match_header("authorization", "bearer fresh")
        .match_query(Matcher::UrlEncoded("q".into(), "name:demo".into()))
        .with_status(200)
        .with_body(
            r#"{"total_results": 1, "resources": [{"metadata": {"guid": "app-1"}, "entity": {"name": "demo"}}]}"#,
        )
        .create_async()
        .await;

    let session = Session::new(url(&server, "/"))
        .with_credential(AccessToken::new("stale").with_refresh_token("def"))
        .with_target(
            OrgRef { guid: "org-1".into(), name: "acme".into() },
            SpaceRef { guid: "space-1".into(), name: "dev".into() },
        );
    let uaa = UaaTokenService::new(reqwest::Client::new(), &url(&server, "/"), "cf", "").unwrap();
    let ctx = OperationContext::new(
        Arc::new(session),
        Arc::new(transport()),
        Arc::new(ZipArchiver::new()),
    )
    .with_token_service(Arc::new(uaa));

    let outcome = CredentialRetry::new(GetApplication::new("demo")).run(&ctx).await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.payload().unwrap()["metadata"]["guid"], "app-1");
    assert_eq!(ctx.session().credential().unwrap().token.access_token, "fresh");
    expired.assert_async().await;
    refreshed.assert_async().await;
    found.assert_async().await;
}
