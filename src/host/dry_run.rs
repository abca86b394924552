// src/host/dry_run.rs

//! A host wrapper that answers every query from the real host but never mutates it.
//!
//! Ensure operations report the change they would make. Ownership and mode drift
//! on existing paths is not detected, so those report `Unchanged`.

use super::{AccountSpec, Change, DirectorySpec, FileSpec, HostProvider};
use crate::core::errors::HostError;
use std::path::Path;
use tracing::info;

pub struct DryRunHost<H> {
    inner: H,
}

impl<H: HostProvider> DryRunHost<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    fn would_create(&self, path: &Path, what: &str) -> Result<Change, HostError> {
        if self.inner.file_exists(path)? {
            return Ok(Change::Unchanged);
        }
        info!("[dry-run] would create {} {}", what, path.display());
        Ok(Change::Created)
    }
}

impl<H: HostProvider> HostProvider for DryRunHost<H> {
    fn ensure_user(&self, account: &AccountSpec) -> Result<Change, HostError> {
        if self.inner.account_exists(&account.user)? {
            return Ok(Change::Unchanged);
        }
        info!("[dry-run] would create account {}", account.user);
        Ok(Change::Created)
    }

    fn account_exists(&self, user: &str) -> Result<bool, HostError> {
        self.inner.account_exists(user)
    }

    fn ensure_directory(&self, dir: &DirectorySpec) -> Result<Change, HostError> {
        self.would_create(&dir.path, "directory")
    }

    fn ensure_file_touched(&self, file: &FileSpec) -> Result<Change, HostError> {
        self.would_create(&file.path, "file")
    }

    fn write_file(&self, file: &FileSpec, content: &str) -> Result<Change, HostError> {
        match self.inner.read_file(&file.path)? {
            None => self.would_create(&file.path, "file"),
            Some(existing) if existing == content => Ok(Change::Unchanged),
            Some(_) => {
                info!("[dry-run] would rewrite {}", file.path.display());
                Ok(Change::Updated)
            }
        }
    }

    fn write_file_if_absent(&self, file: &FileSpec, _content: &str) -> Result<Change, HostError> {
        self.would_create(&file.path, "file")
    }

    fn file_exists(&self, path: &Path) -> Result<bool, HostError> {
        self.inner.file_exists(path)
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, HostError> {
        self.inner.read_file(path)
    }
}
