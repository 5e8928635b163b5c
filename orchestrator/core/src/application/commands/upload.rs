// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Bits Upload
//!
//! Packages the application content, submits it as an asynchronous upload
//! job and waits for the job to settle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Archive, multipart submit, poll
//! - **Related:** `application::poller`

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::application::context::OperationContext;
use crate::application::operation::Operation;
use crate::application::poller::{JobPhase, JobProbe, Poller};
use crate::domain::archive::Archive;
use crate::domain::manifest::Application;
use crate::domain::outcome::{AggregateOutcome, OperationError, Outcome};
use crate::domain::transport::MultipartField;

pub struct UploadParams {
    app_guid: String,
    content_root: PathBuf,
}

pub struct UploadBits<'a> {
    app: &'a Application,
}

impl<'a> UploadBits<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<'a> Operation for UploadBits<'a> {
    type Params = UploadParams;
    type Output = AggregateOutcome;

    fn name(&self) -> String {
        format!("Upload bits of {}", self.app.name)
    }

    fn validate(&self, _ctx: &OperationContext) -> Result<UploadParams, OperationError> {
        let app_guid = self.app.require_guid()?.to_string();
        let content_root = self.app.content_root.clone().ok_or_else(|| {
            OperationError::bad_request(format!("No content to upload for {}", self.app.name))
        })?;
        Ok(UploadParams {
            app_guid,
            content_root,
        })
    }

    async fn execute(&self, ctx: &OperationContext, params: UploadParams) -> AggregateOutcome {
        let mut aggregate = AggregateOutcome::new();

        let archive = match ctx.archiver().archive(&params.content_root) {
            Ok(archive) => archive,
            Err(e) => {
                aggregate.push(
                    OperationError::internal("Failed to package application content")
                        .with_cause(e.to_string())
                        .into(),
                );
                return aggregate;
            }
        };

        let fields = vec![
            MultipartField::Text {
                name: "resources".to_string(),
                value: "[]".to_string(),
            },
            MultipartField::File {
                name: "application".to_string(),
                path: archive.path().to_path_buf(),
                file_name: archive.file_name(),
            },
        ];

        let submitted = ctx
            .api()
            .put_multipart(
                &format!("/v2/apps/{}/bits", params.app_guid),
                &[("async", "true")],
                fields,
            )
            .await;
        let job = JobProbe::observe(&submitted);
        if !aggregate.absorb(submitted) {
            discard(archive);
            return aggregate;
        }

        let (initial, mut probe) = match job {
            Ok(job) => job,
            Err(e) => {
                discard(archive);
                aggregate.push(e.into());
                return aggregate;
            }
        };

        let polled = Poller::new(ctx).run(initial, &mut probe).await;
        discard(archive);

        let final_outcome = match polled {
            Ok(state) => match state.phase {
                JobPhase::Finished => {
                    info!("Uploaded bits of {}", self.app.name);
                    Outcome::success(200, state.last_payload)
                }
                JobPhase::TimedOut => OperationError::bad_request("Upload timeout exceeded").into(),
                JobPhase::Failed | JobPhase::Running => {
                    OperationError::internal("Failed to upload application bits").into()
                }
            },
            Err(e) => e.into(),
        };
        aggregate.push(final_outcome);
        aggregate
    }
}

fn discard(archive: Archive) {
    let path = archive.path().display().to_string();
    if let Err(e) = archive.discard() {
        warn!("Failed to remove temporary archive {}: {}", path, e);
    }
}
