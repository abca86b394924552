// src/core/effective.rs

//! Fully resolved records: what the planner and the renderers work from.

use super::desired::InstanceOptions;
use super::errors::ValidationError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Content of the marker file that guards the main config against re-rendering.
pub const MARKER_CONTENT: &str =
    "This file prevents the provisioner from overwriting the sentinel config more than once\n";

/// Instance-level options after defaults were merged and required fields checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstance {
    /// `sentinel_<name>`, or `sentinel_<port>` when no name is given.
    pub sentinel_name: String,
    pub sentinel_port: u16,
    pub user: String,
    pub group: String,
    pub uid: Option<u32>,
    pub homedir: PathBuf,
    pub shell: PathBuf,
    pub systemuser: bool,
    pub configdir: PathBuf,
    pub base_piddir: PathBuf,
    pub logfile: Option<String>,
    pub syslogenabled: bool,
    pub syslogfacility: String,
    pub loglevel: String,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingInstanceField { field })
}

impl TryFrom<InstanceOptions> for ResolvedInstance {
    type Error = ValidationError;

    fn try_from(options: InstanceOptions) -> Result<Self, Self::Error> {
        let identity = match (options.name, options.port) {
            (Some(name), _) if !name.trim().is_empty() => name,
            (_, Some(port)) => port.to_string(),
            _ => return Err(ValidationError::MissingInstanceField { field: "port" }),
        };

        Ok(Self {
            sentinel_name: format!("sentinel_{identity}"),
            sentinel_port: required(options.sentinel_port, "sentinel_port")?,
            user: required(options.user, "user")?,
            group: required(options.group, "group")?,
            uid: options.uid,
            homedir: required(options.homedir, "homedir")?,
            shell: required(options.shell, "shell")?,
            systemuser: options.systemuser.unwrap_or(true),
            configdir: required(options.configdir, "configdir")?,
            base_piddir: required(options.base_piddir, "base_piddir")?,
            logfile: options.logfile,
            syslogenabled: options.syslogenabled.unwrap_or(false),
            syslogfacility: required(options.syslogfacility, "syslogfacility")?,
            loglevel: required(options.loglevel, "loglevel")?,
        })
    }
}

impl ResolvedInstance {
    /// The log file to create on disk, if any. Syslog and `stdout` logging need none.
    pub fn managed_logfile(&self) -> Option<&Path> {
        match self.logfile.as_deref() {
            Some(path) if path != "stdout" && !path.is_empty() && !self.syslogenabled => {
                Some(Path::new(path))
            }
            _ => None,
        }
    }
}

/// A monitored master that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Master {
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub quorum: u32,
    pub auth_pass: Option<String>,
    pub down_after_milliseconds: Option<u64>,
    pub parallel_syncs: Option<u32>,
    pub failover_timeout: Option<u64>,
}

/// Everything needed to converge one instance. Only built from validated masters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub instance: ResolvedInstance,
    pub masters: Vec<Master>,
}

impl EffectiveConfig {
    pub fn new(instance: ResolvedInstance, masters: Vec<Master>) -> Self {
        Self { instance, masters }
    }

    pub fn sentinel_name(&self) -> &str {
        &self.instance.sentinel_name
    }

    pub fn config_path(&self) -> PathBuf {
        self.instance
            .configdir
            .join(format!("{}.conf", self.instance.sentinel_name))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.instance
            .configdir
            .join(format!("{}.conf.breadcrumb", self.instance.sentinel_name))
    }

    pub fn pid_dir(&self) -> PathBuf {
        self.instance.base_piddir.join(&self.instance.sentinel_name)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.pid_dir()
            .join(format!("{}.pid", self.instance.sentinel_name))
    }
}
