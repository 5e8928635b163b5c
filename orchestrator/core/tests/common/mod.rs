// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for integration tests: a scripted platform transport,
//! a recording sleeper, a counting token service and a fake archiver.

#![allow(dead_code)]

use async_trait::async_trait;
use cfpush_core::application::{OperationContext, Sleeper};
use cfpush_core::domain::archive::{Archive, ArchiveError, Archiver};
use cfpush_core::domain::auth::{AccessToken, TokenError, TokenService};
use cfpush_core::domain::config::PollSettings;
use cfpush_core::domain::manifest::{Application, Manifest};
use cfpush_core::domain::session::{OrgRef, Session, SpaceRef};
use cfpush_core::domain::transport::{
    HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport, TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const ORG_GUID: &str = "org-1";
pub const SPACE_GUID: &str = "space-1";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub url: Url,
    pub body: RequestBody,
    pub authorization: Option<String>,
}

impl RecordedCall {
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn json(&self) -> Value {
        match &self.body {
            RequestBody::Json(value) => value.clone(),
            other => panic!("expected JSON body, got {:?}", other),
        }
    }
}

struct Expectation {
    method: HttpMethod,
    path: String,
    response: Result<HttpResponse, String>,
}

/// Replays an ordered script of expected requests.
///
/// Every request must match the next expectation's method and path.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(self, method: HttpMethod, path: &str, status: u16, body: Value) -> Self {
        let body = if body.is_null() { None } else { Some(body) };
        self.script.lock().push_back(Expectation {
            method,
            path: path.to_string(),
            response: Ok(HttpResponse::new(status, body)),
        });
        self
    }

    pub fn expect_transport_error(self, method: HttpMethod, path: &str) -> Self {
        self.script.lock().push_back(Expectation {
            method,
            path: path.to_string(),
            response: Err("connection reset".to_string()),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    pub fn count(&self, method: HttpMethod, path_prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path.starts_with(path_prefix))
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        self.calls.lock().push(RecordedCall {
            method: request.method,
            path: path.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            authorization: request.header_value("Authorization").map(str::to_string),
        });

        let expected = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request.method, path));
        assert_eq!(
            (expected.method, expected.path.as_str()),
            (request.method, path.as_str()),
            "request out of script order"
        );

        expected.response.map_err(TransportError::Connect)
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn naps(&self) -> usize {
        self.naps.lock().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps.lock().push(duration);
    }
}

/// Issues `fresh-N` tokens and counts refreshes.
#[derive(Default)]
pub struct CountingTokenService {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingTokenService {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenService for CountingTokenService {
    async fn refresh(&self, current: &AccessToken) -> Result<AccessToken, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(TokenError::Rejected("invalid_grant".into()));
        }
        let mut token = AccessToken::new(format!("fresh-{}", n));
        token.refresh_token = current.refresh_token.clone();
        Ok(token)
    }
}

/// Writes a small placeholder archive and remembers where.
#[derive(Default)]
pub struct FakeArchiver {
    last: Mutex<Option<PathBuf>>,
}

impl FakeArchiver {
    pub fn last_archive(&self) -> Option<PathBuf> {
        self.last.lock().clone()
    }
}

impl Archiver for FakeArchiver {
    fn archive(&self, _content_root: &Path) -> Result<Archive, ArchiveError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"PK\x05\x06")?;
        let path = file.into_temp_path();
        *self.last.lock() = Some(path.to_path_buf());
        Ok(Archive::new(path))
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub sleeper: Arc<RecordingSleeper>,
    pub tokens: Arc<CountingTokenService>,
    pub archiver: Arc<FakeArchiver>,
    pub ctx: OperationContext,
}

pub fn session() -> Session {
    Session::new(Url::parse("https://api.example.com").unwrap())
        .with_manage_url(Url::parse("https://console.example.com").unwrap())
        .with_credential(AccessToken::new("initial").with_refresh_token("refresh"))
        .with_target(
            OrgRef {
                guid: ORG_GUID.into(),
                name: "acme".into(),
            },
            SpaceRef {
                guid: SPACE_GUID.into(),
                name: "dev".into(),
            },
        )
}

pub fn harness(transport: ScriptedTransport) -> Harness {
    harness_with(transport, session(), CountingTokenService::default())
}

pub fn harness_with(
    transport: ScriptedTransport,
    session: Session,
    tokens: CountingTokenService,
) -> Harness {
    let transport = Arc::new(transport);
    let sleeper = Arc::new(RecordingSleeper::default());
    let tokens = Arc::new(tokens);
    let archiver = Arc::new(FakeArchiver::default());

    let ctx = OperationContext::new(Arc::new(session), transport.clone(), archiver.clone())
        .with_token_service(tokens.clone())
        .with_sleeper(sleeper.clone())
        .with_poll_settings(PollSettings {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        });

    Harness {
        transport,
        sleeper,
        tokens,
        archiver,
        ctx,
    }
}

pub fn application(yaml: &str) -> Application {
    let manifest = Manifest::from_yaml_str(yaml).unwrap();
    Application::from_manifest(&manifest, Some(PathBuf::from("."))).unwrap()
}

pub fn resource(guid: &str, entity: Value) -> Value {
    json!({
        "metadata": { "guid": guid, "url": format!("/v2/things/{}", guid) },
        "entity": entity,
    })
}

pub fn page(resources: Vec<Value>) -> Value {
    json!({
        "total_results": resources.len(),
        "next_url": null,
        "resources": resources,
    })
}

pub fn app_resource(guid: &str, name: &str) -> Value {
    resource(guid, json!({ "name": name, "state": "STOPPED" }))
}

pub fn domain(guid: &str, name: &str) -> Value {
    resource(guid, json!({ "name": name }))
}

pub fn route(guid: &str, host: &str, domain_guid: &str) -> Value {
    resource(
        guid,
        json!({ "host": host, "domain_guid": domain_guid, "space_guid": SPACE_GUID }),
    )
}

pub fn job(status: &str) -> Value {
    json!({
        "metadata": { "guid": "job-1", "url": "/v2/jobs/job-1" },
        "entity": { "status": status },
    })
}
