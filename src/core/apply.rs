// src/core/apply.rs

//! The apply engine: executes a plan action by action against the host,
//! evaluating each guard right before its action and stopping at the first
//! failure.

use super::environment::HostEnvironment;
use super::errors::{HostError, ProvisionError};
use super::planner::{Action, Guard, Plan, PlannedAction, Step};
use super::schema::SchemaWarning;
use crate::host::{Change, HostProvider};
use crate::render::TemplateRenderer;
use chrono::{DateTime, Utc};
use std::path::Path;
use serde::{Serialize, Serializer};
use strum_macros::Display;
use tracing::{debug, error, info};

/// What happened to one planned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ActionOutcome {
    Created,
    Updated,
    AlreadySatisfied,
    Skipped,
    Failed,
}

impl From<Change> for ActionOutcome {
    fn from(change: Change) -> Self {
        match change {
            Change::Created => ActionOutcome::Created,
            Change::Updated => ActionOutcome::Updated,
            Change::Unchanged => ActionOutcome::AlreadySatisfied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub step: Step,
    pub target: String,
    pub outcome: ActionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InstanceStatus {
    Converged,
    Failed,
}

/// The result of converging one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceReport {
    pub sentinel: String,
    pub status: InstanceStatus,
    pub warnings: Vec<SchemaWarning>,
    pub actions: Vec<ActionRecord>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProvisionError>,
    pub finished_at: DateTime<Utc>,
}

fn serialize_error<S: Serializer>(
    error: &Option<ProvisionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl InstanceReport {
    /// A report for an instance rejected before any action ran.
    pub fn rejected(sentinel: String, warnings: Vec<SchemaWarning>, error: ProvisionError) -> Self {
        Self {
            sentinel,
            status: InstanceStatus::Failed,
            warnings,
            actions: Vec::new(),
            error: Some(error),
            finished_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == InstanceStatus::Converged
    }

    pub fn outcome_of(&self, step: Step) -> Option<ActionOutcome> {
        self.actions
            .iter()
            .find(|record| record.step == step)
            .map(|record| record.outcome)
    }
}

/// Executes plans against a host with a given renderer.
pub struct ApplyEngine<'a> {
    host: &'a dyn HostProvider,
    renderer: &'a dyn TemplateRenderer,
    env: &'a HostEnvironment,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(
        host: &'a dyn HostProvider,
        renderer: &'a dyn TemplateRenderer,
        env: &'a HostEnvironment,
    ) -> Self {
        Self {
            host,
            renderer,
            env,
        }
    }

    /// Runs every action of the plan in order.
    ///
    /// After a failure, the remaining actions are recorded as skipped and not attempted.
    pub fn apply(&self, plan: &Plan) -> InstanceReport {
        debug!(
            "Applying {} action(s) for {} (job control: {}).",
            plan.actions.len(),
            plan.sentinel_name,
            self.env.job_control
        );
        let mut actions = Vec::with_capacity(plan.actions.len());
        let mut failure = None;

        for planned in &plan.actions {
            let target = planned.action.target();

            if failure.is_some() {
                actions.push(ActionRecord {
                    step: planned.step,
                    target,
                    outcome: ActionOutcome::Skipped,
                    detail: Some("not attempted after an earlier failure".to_string()),
                });
                continue;
            }

            let result = match self.guard_holds(planned) {
                Ok(Some(path)) => {
                    info!(
                        "{}: skipping {} for {}, {} exists.",
                        plan.sentinel_name,
                        planned.step,
                        target,
                        path.display()
                    );
                    actions.push(ActionRecord {
                        step: planned.step,
                        target,
                        outcome: ActionOutcome::Skipped,
                        detail: Some(format!("{} exists", path.display())),
                    });
                    continue;
                }
                Ok(None) => self.execute(planned),
                Err(e) => Err(e),
            };

            match result {
                Ok(change) => {
                    let outcome = ActionOutcome::from(change);
                    debug!("{}: {} {} -> {}", plan.sentinel_name, planned.step, target, outcome);
                    actions.push(ActionRecord {
                        step: planned.step,
                        target,
                        outcome,
                        detail: None,
                    });
                }
                Err(e) => {
                    error!("{}: {}", plan.sentinel_name, e);
                    actions.push(ActionRecord {
                        step: planned.step,
                        target,
                        outcome: ActionOutcome::Failed,
                        detail: Some(e.to_string()),
                    });
                    failure = Some(e);
                }
            }
        }

        InstanceReport {
            sentinel: plan.sentinel_name.clone(),
            status: if failure.is_some() {
                InstanceStatus::Failed
            } else {
                InstanceStatus::Converged
            },
            warnings: Vec::new(),
            actions,
            error: failure,
            finished_at: Utc::now(),
        }
    }

    /// Returns the path that makes the guard skip the action, if any.
    ///
    /// A path whose existence cannot be determined fails the action.
    fn guard_holds<'p>(
        &self,
        planned: &'p PlannedAction,
    ) -> Result<Option<&'p Path>, ProvisionError> {
        match &planned.guard {
            Guard::Always => Ok(None),
            Guard::UnlessExists(path) => self
                .host
                .file_exists(path)
                .map(|exists| exists.then_some(path.as_path()))
                .map_err(|source| ProvisionError::Host {
                    action: format!("{} guard on {}", planned.step, path.display()),
                    source,
                }),
        }
    }

    fn execute(&self, planned: &PlannedAction) -> Result<Change, ProvisionError> {
        let host_error = |source: HostError| ProvisionError::Host {
            action: format!("{} {}", planned.step, planned.action.target()),
            source,
        };

        match &planned.action {
            Action::EnsureAccount(account) => self.host.ensure_user(account).map_err(host_error),
            Action::EnsureDirectory(dir) => self.host.ensure_directory(dir).map_err(host_error),
            Action::TouchFile(file) => self.host.ensure_file_touched(file).map_err(host_error),
            Action::Render {
                template,
                vars,
                file,
            } => {
                let content = self.renderer.render(*template, vars).map_err(|source| {
                    ProvisionError::Render {
                        action: format!("{} {}", planned.step, planned.action.target()),
                        source,
                    }
                })?;
                self.host.write_file(file, &content).map_err(host_error)
            }
            Action::WriteIfAbsent { file, content } => {
                self.host.write_file_if_absent(file, content).map_err(host_error)
            }
        }
    }
}
