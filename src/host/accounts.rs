// src/host/accounts.rs

//! Read-only lookups in the passwd and group databases.

use crate::core::errors::HostError;
use std::fs;
use std::path::{Path, PathBuf};

/// The account databases of a host, read fresh on every lookup so that accounts
/// created earlier in the same run are visible.
#[derive(Debug, Clone)]
pub struct AccountDb {
    passwd: PathBuf,
    group: PathBuf,
}

impl Default for AccountDb {
    fn default() -> Self {
        Self::new("/etc/passwd", "/etc/group")
    }
}

impl AccountDb {
    pub fn new(passwd: impl Into<PathBuf>, group: impl Into<PathBuf>) -> Self {
        Self {
            passwd: passwd.into(),
            group: group.into(),
        }
    }

    pub fn user_exists(&self, user: &str) -> Result<bool, HostError> {
        Ok(lookup_id(&self.passwd, user)?.is_some())
    }

    /// Resolves a user name (or a numeric uid) to a uid.
    pub fn uid(&self, user: &str) -> Result<u32, HostError> {
        if let Ok(uid) = user.parse::<u32>() {
            return Ok(uid);
        }
        lookup_id(&self.passwd, user)?.ok_or_else(|| HostError::UnknownUser(user.to_string()))
    }

    /// Resolves a group name (or a numeric gid) to a gid.
    pub fn gid(&self, group: &str) -> Result<u32, HostError> {
        if let Ok(gid) = group.parse::<u32>() {
            return Ok(gid);
        }
        lookup_id(&self.group, group)?.ok_or_else(|| HostError::UnknownGroup(group.to_string()))
    }

    pub fn group_exists(&self, group: &str) -> Result<bool, HostError> {
        Ok(lookup_id(&self.group, group)?.is_some())
    }
}

/// Finds `name` in a colon-separated database and returns its third field.
fn lookup_id(database: &Path, name: &str) -> Result<Option<u32>, HostError> {
    let contents = fs::read_to_string(database).map_err(|e| HostError::io(database, e))?;
    Ok(contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&name))
        .and_then(|fields| fields.get(2).and_then(|id| id.parse().ok())))
}
