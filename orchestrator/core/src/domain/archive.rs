// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application content packaging.

use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;

/// Temporary archive of application content.
///
/// The backing file is removed when the archive is discarded or dropped.
#[derive(Debug)]
pub struct Archive {
    path: TempPath,
}

impl Archive {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "application.zip".to_string())
    }

    pub fn discard(self) -> std::io::Result<()> {
        self.path.close()
    }
}

pub trait Archiver: Send + Sync {
    fn archive(&self, content_root: &Path) -> Result<Archive, ArchiveError>;
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Content root not found: {0}")]
    MissingRoot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write archive: {0}")]
    Write(String),
}
