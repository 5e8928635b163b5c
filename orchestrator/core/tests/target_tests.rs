// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Organization and space targeting.

mod common;

use cfpush_core::application::commands::{ResolveTarget, SetSpace};
use cfpush_core::application::Operation;
use cfpush_core::domain::auth::AccessToken;
use cfpush_core::domain::session::Session;
use cfpush_core::domain::transport::HttpMethod;
use common::*;
use serde_json::json;
use url::Url;

fn untargeted() -> Session {
    Session::new(Url::parse("https://api.example.com").unwrap())
        .with_credential(AccessToken::new("initial").with_refresh_token("refresh"))
}

fn named(guid: &str, name: &str) -> serde_json::Value {
    resource(guid, json!({ "name": name }))
}

#[tokio::test]
async fn test_named_org_and_space_across_pages() {
    let mut first = page(vec![named("org-a", "alpha")]);
    first["next_url"] = json!("/v2/organizations?page=2&inline-relations-depth=1");
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Get, "/v2/organizations", 200, first)
        .expect(HttpMethod::Get, "/v2/organizations", 200, page(vec![named("org-b", "beta")]))
        .expect(
            HttpMethod::Get,
            "/v2/organizations/org-b/spaces",
            200,
            page(vec![named("sp-1", "dev"), named("sp-2", "prod")]),
        );
    let h = harness_with(transport, untargeted(), CountingTokenService::default());

    let outcome = ResolveTarget::new(Some("beta"), Some("prod")).run(&h.ctx).await;

    assert!(outcome.is_ok());
    assert_eq!(h.transport.calls()[1].query("page").as_deref(), Some("2"));
    let session = h.ctx.session();
    assert_eq!(session.org().unwrap().guid, "org-b");
    assert_eq!(session.space().unwrap().name, "prod");
}

#[tokio::test]
async fn test_defaults_to_first_org_and_space() {
    let transport = ScriptedTransport::new()
        .expect(HttpMethod::Get, "/v2/organizations", 200, page(vec![named("org-a", "alpha")]))
        .expect(
            HttpMethod::Get,
            "/v2/organizations/org-a/spaces",
            200,
            page(vec![named("sp-1", "dev")]),
        );
    let h = harness_with(transport, untargeted(), CountingTokenService::default());

    let outcome = ResolveTarget::new(None, None).run(&h.ctx).await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.len(), 2);
    assert_eq!(h.ctx.session().space().unwrap().guid, "sp-1");
}

#[tokio::test]
async fn test_unknown_org_stops_before_spaces() {
    let transport = ScriptedTransport::new().expect(
        HttpMethod::Get,
        "/v2/organizations",
        200,
        page(vec![named("org-a", "alpha")]),
    );
    let h = harness_with(transport, untargeted(), CountingTokenService::default());

    let outcome = ResolveTarget::new(Some("gamma"), None).run(&h.ctx).await;

    let failure = outcome.first_failure().unwrap();
    assert_eq!(failure.status, 404);
    assert_eq!(failure.message, "Organization not found");
    assert_eq!(h.transport.calls().len(), 1);
    assert!(h.ctx.session().org().is_none());
}

#[tokio::test]
async fn test_space_requires_an_org() {
    let h = harness_with(ScriptedTransport::new(), untargeted(), CountingTokenService::default());

    let outcome = SetSpace::new(Some("dev")).run(&h.ctx).await;

    assert_eq!(outcome.error().unwrap().message, "No organization targeted");
    assert!(h.transport.calls().is_empty());
}
