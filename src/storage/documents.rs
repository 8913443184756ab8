// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault documents and audit lines on the local filesystem.
//!
//! A vault is one pretty-printed JSON file, replaced whole on every save
//! through a `.tmp` sibling and a rename. Audit events are appended one JSON
//! line at a time and never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("vault storage used before initialize()")]
    NotInitialized,

    #[error("{user} cannot access {resource}")]
    PermissionDenied { user: String, resource: String },
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            _ => StorageError::Io(e),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Data directory holding `vaults/` and `audit/`.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl DocumentStorage {
    /// Storage rooted at `paths`. Nothing is touched on disk until
    /// [`initialize`](Self::initialize).
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Create `vaults/` and `audit/` if missing.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.vaults_dir())?;
        fs::create_dir_all(self.paths.audit_dir())?;
        self.initialized = true;
        Ok(())
    }

    fn ready(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    /// Check that the data directory is still writable.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ready()?;
        let marker = self.paths.root().join(".health_check");
        fs::write(&marker, b"ok")?;
        fs::remove_file(&marker)?;
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ready()?;
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Replace the document at `path`. Readers see either the old or the new
    /// document, never a partial one.
    pub fn save<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ready()?;
        let path = path.as_ref();
        let staged = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&staged)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(&staged, path)?;
        Ok(())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ready()?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Ids of the `{id}.json` documents in `dir`, sorted. Staged `.tmp` files
    /// are skipped.
    pub fn document_ids(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        self.ready()?;
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Append `value` as one JSON line, creating the file and its parent
    /// directory on first use.
    pub fn append_line<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ready()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?
            .write_all(&line)?;
        Ok(())
    }

    /// Every JSON line in `path`. A missing file has no lines.
    pub fn read_lines<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<Vec<T>> {
        self.ready()?;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StorageError::from))
            .collect()
    }
}
