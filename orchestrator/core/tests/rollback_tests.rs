// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Compensating rollback of a create-and-route pairing.

mod common;

use cfpush_core::application::commands::CreateApplicationWithRoute;
use cfpush_core::application::{CompensatingRollback, Operation};
use cfpush_core::domain::transport::HttpMethod;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_route_failure_rolls_back_routes_then_app() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![]))
        // compensation: delete routes (domain lookup fails again, ignored)
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![]))
        // compensation: delete application
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 200, page(vec![app_resource("app-1", "demo")]))
        .expect(HttpMethod::Delete, "/v2/apps/app-1", 204, json!(null));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    assert!(!outcome.is_ok());
    let failure = outcome.first_failure().unwrap();
    assert_eq!(failure.status, 400);
    assert_eq!(failure.message, "Failed to find available domains in target");
    // the original aggregate, untouched by compensation outcomes
    assert_eq!(outcome.len(), 3);
    assert_eq!(h.transport.remaining(), 0);

    let delete = h.transport.calls().pop().unwrap();
    assert_eq!(delete.query("recursive").as_deref(), Some("true"));
}

#[tokio::test]
async fn test_taken_host_rolls_back_and_returns_conflict() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![route("route-9", "demo", "dom-1")]))
        .expect(
            HttpMethod::Put,
            "/v2/apps/app-1/routes/route-9",
            400,
            json!({"description": "route belongs to another space", "error_code": "CF-InvalidRelation"}),
        )
        // compensation: routes of this app in this space
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![]))
        // compensation: the application
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 200, page(vec![app_resource("app-1", "demo")]))
        .expect(HttpMethod::Delete, "/v2/apps/app-1", 204, json!(null));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    let failure = outcome.first_failure().unwrap();
    assert_eq!(failure.status, 409);
    assert_eq!(failure.message, "The host demo is already used in another space.");
    assert_eq!(h.transport.remaining(), 0);
}

#[tokio::test]
async fn test_compensation_failures_are_ignored() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect_transport_error(HttpMethod::Get, "/v2/domains")
        .expect_transport_error(HttpMethod::Get, "/v2/domains")
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 500, json!({"description": "db down"}));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    let failure = outcome.first_failure().unwrap();
    assert_eq!(failure.status, 502);
    assert_eq!(h.transport.remaining(), 0);
}

#[tokio::test]
async fn test_failed_create_triggers_no_compensation() {
    let transport = ScriptedTransport::new().expect(
        HttpMethod::Post,
        "/v2/apps",
        400,
        json!({"description": "name taken", "error_code": "CF-AppNameTaken"}),
    );
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    assert_eq!(outcome.first_failure().unwrap().message, "name taken");
    assert_eq!(h.transport.calls().len(), 1);
}

#[tokio::test]
async fn test_success_keeps_everything() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![]))
        .expect(HttpMethod::Post, "/v2/routes", 201, route("route-1", "demo", "dom-1"))
        .expect(HttpMethod::Put, "/v2/apps/app-1/routes/route-1", 201, app_resource("app-1", "demo"));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.transport.count(HttpMethod::Delete, "/v2/"), 0);
}

#[tokio::test]
async fn test_attach_failure_deletes_created_route_before_app() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![]))
        .expect(HttpMethod::Post, "/v2/routes", 201, route("route-1", "demo", "dom-1"))
        .expect(
            HttpMethod::Put,
            "/v2/apps/app-1/routes/route-1",
            500,
            json!({"description": "attach exploded", "error_code": "UnknownError"}),
        )
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![route("route-1", "demo", "dom-1")]))
        .expect(HttpMethod::Delete, "/v2/routes/route-1", 204, json!(null))
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 200, page(vec![app_resource("app-1", "demo")]))
        .expect(HttpMethod::Delete, "/v2/apps/app-1", 204, json!(null));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    let failure = outcome.first_failure().unwrap();
    assert_eq!(failure.status, 500);
    assert_eq!(failure.message, "attach exploded");
    assert_eq!(h.transport.remaining(), 0);

    let calls = h.transport.calls();
    let deleted = |path: &str| {
        calls
            .iter()
            .position(|c| c.method == HttpMethod::Delete && c.path == path)
            .unwrap()
    };
    let route_delete = deleted("/v2/routes/route-1");
    assert!(route_delete < deleted("/v2/apps/app-1"));
    assert_eq!(calls[route_delete].query("recursive").as_deref(), Some("true"));
    assert_eq!(h.transport.count(HttpMethod::Delete, "/v2/"), 2);
}

#[tokio::test]
async fn test_rollback_leaves_routes_outside_the_space() {
    let mut unowned = route("route-7", "demo", "dom-1");
    unowned["entity"]["space_guid"] = serde_json::Value::Null;
    let mut foreign = route("route-8", "demo", "dom-1");
    foreign["entity"]["space_guid"] = json!("space-2");

    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![]))
        .expect(
            HttpMethod::Post,
            "/v2/routes",
            400,
            json!({"description": "route quota exceeded", "error_code": "CF-SpaceQuotaTotalRoutesExceeded"}),
        )
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![domain("dom-1", "apps.example.com")]))
        .expect(HttpMethod::Get, "/v2/routes", 200, page(vec![unowned, foreign]))
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 200, page(vec![app_resource("app-1", "demo")]))
        .expect(HttpMethod::Delete, "/v2/apps/app-1", 204, json!(null));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    assert_eq!(outcome.first_failure().unwrap().message, "route quota exceeded");
    assert_eq!(h.transport.count(HttpMethod::Delete, "/v2/routes"), 0);
    assert_eq!(h.transport.count(HttpMethod::Delete, "/v2/apps/app-1"), 1);
    assert_eq!(h.transport.remaining(), 0);
}

#[tokio::test]
async fn test_expired_credential_mid_route_refreshes_instead_of_recreating() {
    let expired = json!({"description": "Invalid Auth Token", "error_code": "CF-InvalidAuthToken"});
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Post, "/v2/apps", 201, app_resource("app-1", "demo"))
        .expect(HttpMethod::Get, "/v2/domains", 401, expired.clone())
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![]))
        // compensation: the token expires again while listing routes
        .expect(HttpMethod::Get, "/v2/domains", 401, expired)
        .expect(HttpMethod::Get, "/v2/domains", 200, page(vec![]))
        .expect(HttpMethod::Get, "/v2/spaces/space-1/apps", 200, page(vec![app_resource("app-1", "demo")]))
        .expect(HttpMethod::Delete, "/v2/apps/app-1", 204, json!(null));
    let h = harness(transport);
    let app = application("applications:\n  - name: demo\n");

    let outcome = CompensatingRollback::new(CreateApplicationWithRoute::new(&app))
        .run(&h.ctx)
        .await;

    assert_eq!(
        outcome.first_failure().unwrap().message,
        "Failed to find available domains in target"
    );
    assert_eq!(h.transport.count(HttpMethod::Post, "/v2/apps"), 1);
    assert_eq!(h.transport.remaining(), 0);
    assert_eq!(h.tokens.calls(), 2);

    let delete = h.transport.calls().pop().unwrap();
    assert_eq!(delete.method, HttpMethod::Delete);
    assert_eq!(delete.authorization.as_deref(), Some("bearer fresh-2"));
}
