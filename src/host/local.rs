// src/host/local.rs

//! The real host: the local filesystem plus `useradd` for service accounts.

use super::accounts::AccountDb;
use super::{AccountSpec, Change, DirectorySpec, FileSpec, HostProvider};
use crate::core::errors::HostError;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info};

/// A `HostProvider` that mutates the machine it runs on.
#[derive(Debug, Clone)]
pub struct LocalHost {
    accounts: AccountDb,
    useradd: PathBuf,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new(AccountDb::default())
    }
}

impl LocalHost {
    pub fn new(accounts: AccountDb) -> Self {
        Self {
            accounts,
            useradd: PathBuf::from("useradd"),
        }
    }

    /// Overrides the command used to create accounts.
    pub fn with_useradd(mut self, useradd: impl Into<PathBuf>) -> Self {
        self.useradd = useradd.into();
        self
    }

    fn useradd_args(&self, account: &AccountSpec) -> Result<Vec<String>, HostError> {
        let mut args = vec![
            "--comment".to_string(),
            account.comment.clone(),
            "--home-dir".to_string(),
            account.home.display().to_string(),
            "--shell".to_string(),
            account.shell.display().to_string(),
        ];
        if account.system {
            args.push("--system".to_string());
        }
        if account.manage_home {
            args.push("--create-home".to_string());
        }
        if let Some(uid) = account.uid {
            args.push("--uid".to_string());
            args.push(uid.to_string());
        }
        // A group named after the user is created along with it; any other group must exist.
        if account.group == account.user && !self.accounts.group_exists(&account.group)? {
            args.push("--user-group".to_string());
        } else {
            args.push("--gid".to_string());
            args.push(account.group.clone());
        }
        args.push(account.user.clone());
        Ok(args)
    }

    /// Brings owner, group and mode of `path` in line; returns true if anything changed.
    fn apply_attributes(
        &self,
        path: &Path,
        owner: &str,
        group: &str,
        mode: u32,
    ) -> Result<bool, HostError> {
        let uid = self.accounts.uid(owner)?;
        let gid = self.accounts.gid(group)?;
        let metadata = fs::metadata(path).map_err(|e| HostError::io(path, e))?;
        let mut changed = false;

        if metadata.uid() != uid || metadata.gid() != gid {
            std::os::unix::fs::chown(path, Some(uid), Some(gid))
                .map_err(|e| HostError::io(path, e))?;
            changed = true;
        }
        if metadata.permissions().mode() & 0o7777 != mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .map_err(|e| HostError::io(path, e))?;
            changed = true;
        }
        Ok(changed)
    }

    /// Returns whether `path` exists, failing if it exists as something other than expected.
    fn inspect(path: &Path, want_dir: bool) -> Result<bool, HostError> {
        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() == want_dir => Ok(true),
            Ok(_) => Err(HostError::Conflict {
                path: path.to_path_buf(),
                expected: if want_dir { "directory" } else { "regular file" },
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HostError::io(path, e)),
        }
    }

    fn settle(
        &self,
        path: &Path,
        owner: &str,
        group: &str,
        mode: u32,
        existed: bool,
    ) -> Result<Change, HostError> {
        let changed = self.apply_attributes(path, owner, group, mode)?;
        Ok(match (existed, changed) {
            (false, _) => Change::Created,
            (true, true) => Change::Updated,
            (true, false) => Change::Unchanged,
        })
    }
}

impl HostProvider for LocalHost {
    fn ensure_user(&self, account: &AccountSpec) -> Result<Change, HostError> {
        if self.accounts.user_exists(&account.user)? {
            debug!("Account '{}' already exists.", account.user);
            return Ok(Change::Unchanged);
        }

        let args = self.useradd_args(account)?;
        info!("Creating service account '{}'.", account.user);
        let output = Command::new(&self.useradd)
            .args(&args)
            .output()
            .map_err(|e| HostError::io(&self.useradd, e))?;

        if !output.status.success() {
            return Err(HostError::CommandFailed {
                command: format!("{} {}", self.useradd.display(), args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(Change::Created)
    }

    fn account_exists(&self, user: &str) -> Result<bool, HostError> {
        self.accounts.user_exists(user)
    }

    fn ensure_directory(&self, dir: &DirectorySpec) -> Result<Change, HostError> {
        let existed = Self::inspect(&dir.path, true)?;
        if !existed {
            let created = if dir.recursive {
                fs::create_dir_all(&dir.path)
            } else {
                fs::create_dir(&dir.path)
            };
            created.map_err(|e| HostError::io(&dir.path, e))?;
        }
        self.settle(&dir.path, &dir.owner, &dir.group, dir.mode, existed)
    }

    fn ensure_file_touched(&self, file: &FileSpec) -> Result<Change, HostError> {
        let existed = Self::inspect(&file.path, false)?;
        if !existed {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file.path)
                .map_err(|e| HostError::io(&file.path, e))?;
        }
        self.settle(&file.path, &file.owner, &file.group, file.mode, existed)
    }

    fn write_file(&self, file: &FileSpec, content: &str) -> Result<Change, HostError> {
        let existed = Self::inspect(&file.path, false)?;
        let mut rewritten = false;
        if !existed || self.read_file(&file.path)?.as_deref() != Some(content) {
            replace_file(&file.path, content).map_err(|e| HostError::io(&file.path, e))?;
            rewritten = true;
        }
        let change = self.settle(&file.path, &file.owner, &file.group, file.mode, existed)?;
        Ok(if rewritten && existed {
            Change::Updated
        } else {
            change
        })
    }

    fn write_file_if_absent(&self, file: &FileSpec, content: &str) -> Result<Change, HostError> {
        let created = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file.path);
        let mut handle = match created {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Self::inspect(&file.path, false)?;
                return Ok(Change::Unchanged);
            }
            Err(e) => return Err(HostError::io(&file.path, e)),
        };
        handle
            .write_all(content.as_bytes())
            .map_err(|e| HostError::io(&file.path, e))?;
        self.settle(&file.path, &file.owner, &file.group, file.mode, false)
    }

    fn file_exists(&self, path: &Path) -> Result<bool, HostError> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HostError::io(path, e)),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, HostError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HostError::io(path, e)),
        }
    }
}

/// Replaces `path` with `content` through a sibling temp file and a rename.
///
/// The temp file is removed again if either step fails.
pub fn replace_file(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = PathBuf::from(format!("{}.tmp.{}", path.display(), rand::random::<u32>()));
    let result = fs::write(&temp_path, content).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        if let Err(remove_err) = fs::remove_file(&temp_path)
            && remove_err.kind() != ErrorKind::NotFound
        {
            error!(
                "Additionally failed to remove temporary file '{}': {remove_err}",
                temp_path.display()
            );
        }
    }
    result
}
