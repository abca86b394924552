// src/core/environment.rs

//! Host-wide settings consulted by the planner and the renderers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum_macros::Display;

/// The process-supervision style in use on this host.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobControl {
    /// SysV-style scripts under `init_dir`.
    #[default]
    Initd,
    /// Upstart job definitions under `upstart_dir`.
    Upstart,
}

/// Host-level inputs to a convergence run. Passed explicitly; nothing in the
/// engine reads host settings from anywhere else.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HostEnvironment {
    pub job_control: JobControl,
    /// Directory holding `redis-server`, used when `install_dir` is unset.
    pub bin_path: PathBuf,
    /// Prefix of a source install; its `bin` directory takes precedence over `bin_path`.
    pub install_dir: Option<PathBuf>,
    /// Platform name, used to pick init-script conventions.
    pub platform: String,
    pub init_dir: PathBuf,
    pub upstart_dir: PathBuf,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            job_control: JobControl::default(),
            bin_path: PathBuf::from("/usr/local/bin"),
            install_dir: None,
            platform: "debian".to_string(),
            init_dir: PathBuf::from("/etc/init.d"),
            upstart_dir: PathBuf::from("/etc/init"),
        }
    }
}

impl HostEnvironment {
    /// The directory the supervision unit should execute binaries from.
    pub fn resolved_bin_path(&self) -> PathBuf {
        match &self.install_dir {
            Some(dir) => dir.join("bin"),
            None => self.bin_path.clone(),
        }
    }

    /// Where the supervision unit for `sentinel_name` lives under the active job control.
    pub fn unit_path(&self, sentinel_name: &str) -> PathBuf {
        match self.job_control {
            JobControl::Initd => self.init_dir.join(format!("redis_{sentinel_name}")),
            JobControl::Upstart => self.upstart_dir.join(format!("redis_{sentinel_name}.conf")),
        }
    }

    /// True for platforms whose init scripts use `chkconfig` headers.
    pub fn is_rhel_family(&self) -> bool {
        matches!(
            self.platform.as_str(),
            "redhat" | "centos" | "fedora" | "amazon" | "scientific" | "rocky" | "almalinux"
        )
    }
}
