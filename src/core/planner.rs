// src/core/planner.rs

//! The convergence planner: turns an `EffectiveConfig` into the ordered list of
//! guarded actions that bring the host in line with it.

use super::effective::{EffectiveConfig, MARKER_CONTENT};
use super::environment::{HostEnvironment, JobControl};
use crate::host::{AccountSpec, DirectorySpec, FileSpec};
use crate::render::{SentinelConfVars, ServiceUnitVars, TemplateId, TemplateVars};
use serde::Serialize;
use std::path::{Path, PathBuf};
use strum_macros::Display;

/// Which step of the convergence sequence an action implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    ServiceAccount,
    ConfigDir,
    PidDir,
    LogDir,
    LogFile,
    MainConfig,
    Marker,
    SupervisionUnit,
}

/// A precondition evaluated by the apply engine right before an action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Always,
    /// Skip the action if the path already exists on the host.
    UnlessExists(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EnsureAccount(AccountSpec),
    EnsureDirectory(DirectorySpec),
    TouchFile(FileSpec),
    Render {
        template: TemplateId,
        vars: TemplateVars,
        file: FileSpec,
    },
    WriteIfAbsent {
        file: FileSpec,
        content: String,
    },
}

impl Action {
    /// The account name or path the action operates on.
    pub fn target(&self) -> String {
        match self {
            Action::EnsureAccount(account) => account.user.clone(),
            Action::EnsureDirectory(dir) => dir.path.display().to_string(),
            Action::TouchFile(file)
            | Action::Render { file, .. }
            | Action::WriteIfAbsent { file, .. } => file.path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub step: Step,
    pub action: Action,
    pub guard: Guard,
}

impl PlannedAction {
    fn always(step: Step, action: Action) -> Self {
        Self {
            step,
            action,
            guard: Guard::Always,
        }
    }
}

/// The ordered actions for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub sentinel_name: String,
    pub actions: Vec<PlannedAction>,
}

impl Plan {
    pub fn find(&self, step: Step) -> Option<&PlannedAction> {
        self.actions.iter().find(|planned| planned.step == step)
    }
}

/// Builds the plan for one instance.
///
/// The account and directories precede every file owned by them. The main
/// config is guarded by the marker, so an existing marker skips the render.
/// The directory holding a managed log file. A bare file name lives in `.`.
fn log_dir(logfile: &Path) -> &Path {
    match logfile.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => Path::new("/"),
    }
}

pub fn plan(effective: &EffectiveConfig, env: &HostEnvironment) -> Plan {
    let instance = &effective.instance;
    let name = effective.sentinel_name();
    let pid_dir = effective.pid_dir();
    let mut actions = Vec::with_capacity(8);

    actions.push(PlannedAction::always(
        Step::ServiceAccount,
        Action::EnsureAccount(AccountSpec {
            user: instance.user.clone(),
            group: instance.group.clone(),
            home: instance.homedir.clone(),
            shell: instance.shell.clone(),
            uid: instance.uid,
            system: instance.systemuser,
            comment: "Redis service account".to_string(),
            manage_home: true,
        }),
    ));

    actions.push(PlannedAction::always(
        Step::ConfigDir,
        Action::EnsureDirectory(DirectorySpec {
            path: instance.configdir.clone(),
            owner: "root".to_string(),
            group: "root".to_string(),
            mode: 0o755,
            recursive: true,
        }),
    ));

    actions.push(PlannedAction::always(
        Step::PidDir,
        Action::EnsureDirectory(DirectorySpec {
            path: pid_dir.clone(),
            owner: instance.user.clone(),
            group: instance.group.clone(),
            mode: 0o755,
            recursive: true,
        }),
    ));

    if let Some(logfile) = instance.managed_logfile() {
        actions.push(PlannedAction::always(
            Step::LogDir,
            Action::EnsureDirectory(DirectorySpec {
                path: log_dir(logfile).to_path_buf(),
                owner: instance.user.clone(),
                group: instance.group.clone(),
                mode: 0o755,
                recursive: true,
            }),
        ));
        actions.push(PlannedAction::always(
            Step::LogFile,
            Action::TouchFile(FileSpec {
                path: logfile.to_path_buf(),
                owner: instance.user.clone(),
                group: instance.group.clone(),
                mode: 0o644,
            }),
        ));
    }

    let marker = effective.marker_path();
    actions.push(PlannedAction {
        step: Step::MainConfig,
        action: Action::Render {
            template: TemplateId::SentinelConf,
            vars: TemplateVars::SentinelConf(SentinelConfVars {
                name: name.to_string(),
                pidfile: effective.pid_file(),
                job_control: env.job_control,
                sentinel_port: instance.sentinel_port,
                loglevel: instance.loglevel.clone(),
                logfile: instance.logfile.clone(),
                syslogenabled: instance.syslogenabled,
                syslogfacility: instance.syslogfacility.clone(),
                masters: effective.masters.clone(),
            }),
            file: FileSpec {
                path: effective.config_path(),
                owner: instance.user.clone(),
                group: instance.group.clone(),
                mode: 0o644,
            },
        },
        guard: Guard::UnlessExists(marker.clone()),
    });

    actions.push(PlannedAction::always(
        Step::Marker,
        Action::WriteIfAbsent {
            file: FileSpec {
                path: marker,
                owner: "root".to_string(),
                group: "root".to_string(),
                mode: 0o644,
            },
            content: MARKER_CONTENT.to_string(),
        },
    ));

    actions.push(PlannedAction::always(
        Step::SupervisionUnit,
        supervision_unit(effective, env),
    ));

    Plan {
        sentinel_name: name.to_string(),
        actions,
    }
}

/// The one unit definition matching the host's job control.
fn supervision_unit(effective: &EffectiveConfig, env: &HostEnvironment) -> Action {
    let instance = &effective.instance;
    let name = effective.sentinel_name();
    let vars = TemplateVars::ServiceUnit(ServiceUnitVars {
        name: name.to_string(),
        bin_path: env.resolved_bin_path(),
        job_control: env.job_control,
        user: instance.user.clone(),
        group: instance.group.clone(),
        configdir: instance.configdir.clone(),
        piddir: effective.pid_dir(),
        pidfile: effective.pid_file(),
        platform: env.platform.clone(),
        rhel_family: env.is_rhel_family(),
    });

    let (template, owner, group, mode) = match env.job_control {
        JobControl::Initd => (
            TemplateId::InitScript,
            "root".to_string(),
            "root".to_string(),
            0o755,
        ),
        JobControl::Upstart => (
            TemplateId::UpstartJob,
            instance.user.clone(),
            instance.group.clone(),
            0o644,
        ),
    };

    Action::Render {
        template,
        vars,
        file: FileSpec {
            path: env.unit_path(name),
            owner,
            group,
            mode,
        },
    }
}
