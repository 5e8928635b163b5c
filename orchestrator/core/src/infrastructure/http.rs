// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reqwest transport
//!
//! Anti-corruption layer between the platform API and the operations:
//! bodies are sent as JSON or multipart and every response body is parsed
//! into a JSON document before it leaves this module.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::domain::transport::{
    HttpMethod, HttpRequest, HttpResponse, MultipartField, RequestBody, Transport, TransportError,
};

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

async fn multipart_form(fields: Vec<MultipartField>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            MultipartField::Text { name, value } => form.text(name, value),
            MultipartField::File {
                name,
                path,
                file_name,
            } => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| TransportError::Io(format!("{}: {}", path.display(), e)))?;
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/zip")
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

/// Parse a response body; non-JSON text is wrapped as `{"response": ...}`.
fn parse_body(text: String) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(_) => Some(json!({ "response": text })),
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(method(request.method), request.url);
        for (name, value) in &request.headers {
            // reqwest sets its own multipart content type
            if matches!(request.body, RequestBody::Multipart(_))
                && name.eq_ignore_ascii_case("content-type")
            {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(fields) => builder.multipart(multipart_form(fields).await?),
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_error)?;
        debug!("Platform responded with HTTP {}", status);

        Ok(HttpResponse::new(status, parse_body(text)))
    }
}
