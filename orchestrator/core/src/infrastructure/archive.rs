// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Zip packaging of application content into a temporary file.

use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::archive::{Archive, ArchiveError, Archiver};

/// Directories never shipped to the platform.
const IGNORED: &[&str] = &[".git"];

#[derive(Debug, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

fn zip_error(e: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Write(e.to_string())
}

impl Archiver for ZipArchiver {
    fn archive(&self, content_root: &Path) -> Result<Archive, ArchiveError> {
        if !content_root.is_dir() {
            return Err(ArchiveError::MissingRoot(content_root.display().to_string()));
        }

        let mut temp = tempfile::Builder::new()
            .prefix("cfpush-")
            .suffix(".zip")
            .tempfile()?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(temp.as_file_mut());
        let mut files = 0usize;

        let walker = WalkDir::new(content_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !IGNORED.iter().any(|ignored| entry.file_name() == *ignored)
            });

        for entry in walker {
            let entry = entry.map_err(|e| ArchiveError::Io(io::Error::other(e.to_string())))?;
            let relative = entry
                .path()
                .strip_prefix(content_root)
                .map_err(|e| ArchiveError::Write(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                writer.add_directory(name, options).map_err(zip_error)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options).map_err(zip_error)?;
                let mut source = File::open(entry.path())?;
                io::copy(&mut source, &mut writer)?;
                files += 1;
            }
        }

        writer.finish().map_err(zip_error)?;
        debug!("Packaged {} files from {}", files, content_root.display());
        Ok(Archive::new(temp.into_temp_path()))
    }
}
