// src/host/mod.rs

//! The boundary between the convergence engine and the machine it converges.
//!
//! Every mutating operation is an "ensure": it reports whether it had to change
//! anything and is safe to call again with the same arguments.

use crate::core::errors::HostError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use strum_macros::Display;

pub mod accounts;
pub mod dry_run;
pub mod local;

pub use dry_run::DryRunHost;
pub use local::LocalHost;

/// What an ensure operation did to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Change {
    Created,
    Updated,
    Unchanged,
}

/// A service account the Sentinel process runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub user: String,
    pub group: String,
    pub home: PathBuf,
    pub shell: PathBuf,
    pub uid: Option<u32>,
    pub system: bool,
    pub comment: String,
    pub manage_home: bool,
}

/// A directory with its ownership and permission bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    pub path: PathBuf,
    pub owner: String,
    pub group: String,
    pub mode: u32,
    /// Create missing parents too. Only the leaf receives owner and mode.
    pub recursive: bool,
}

/// A regular file with its ownership and permission bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

/// Account and filesystem primitives the apply engine delegates to.
pub trait HostProvider {
    /// Creates the account unless a user with that name already exists.
    fn ensure_user(&self, account: &AccountSpec) -> Result<Change, HostError>;

    fn account_exists(&self, user: &str) -> Result<bool, HostError>;

    fn ensure_directory(&self, dir: &DirectorySpec) -> Result<Change, HostError>;

    /// Creates an empty file if missing; never alters existing content.
    fn ensure_file_touched(&self, file: &FileSpec) -> Result<Change, HostError>;

    /// Makes the file hold exactly `content`.
    fn write_file(&self, file: &FileSpec, content: &str) -> Result<Change, HostError>;

    /// Writes `content` only if the file does not exist yet.
    fn write_file_if_absent(&self, file: &FileSpec, content: &str) -> Result<Change, HostError>;

    /// Whether anything, a dangling symlink included, exists at `path`.
    ///
    /// Only a missing path counts as absent; any other lookup failure is an error.
    fn file_exists(&self, path: &Path) -> Result<bool, HostError>;

    /// Returns the file's content, or `None` if it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<String>, HostError>;
}
