// src/core/orchestrator.rs

//! Runs the resolve → normalize → validate → plan → apply pipeline once per
//! desired instance and collects the results.
//!
//! Instances are processed one at a time. A failing instance is reported and
//! the run moves on; the run as a whole succeeds only if every instance did.

use super::apply::{ApplyEngine, InstanceReport};
use super::desired::{
    DefaultsRecord, InstanceOptions, InstanceSpec, MalformedInstance, SentinelEntry,
};
use super::effective::{EffectiveConfig, ResolvedInstance};
use super::environment::HostEnvironment;
use super::errors::{ProvisionError, ValidationError};
use super::planner;
use super::resolver::Merge;
use super::schema::{self, SchemaWarning};
use super::validator;
use crate::host::HostProvider;
use crate::render::TemplateRenderer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// The aggregated result of one convergence run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub instances: Vec<InstanceReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.instances.iter().all(InstanceReport::succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.instances.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn instance(&self, sentinel: &str) -> Option<&InstanceReport> {
        self.instances.iter().find(|r| r.sentinel == sentinel)
    }
}

/// Resolves an instance's desired state into an `EffectiveConfig`, without touching the host.
///
/// Returns the schema warnings alongside, so callers can report them even when
/// validation fails afterwards.
pub fn resolve(
    spec: &InstanceSpec,
    defaults: &DefaultsRecord,
) -> (Vec<SchemaWarning>, Result<EffectiveConfig, ValidationError>) {
    let normalized = schema::normalize(spec, &defaults.master);
    let effective = ResolvedInstance::try_from(InstanceOptions::merge(
        &defaults.instance,
        &spec.options,
    ))
    .and_then(|instance| {
        let masters = validator::validate(&normalized.masters)?;
        Ok(EffectiveConfig::new(instance, masters))
    });
    (normalized.warnings, effective)
}

pub struct Orchestrator<'a> {
    host: &'a dyn HostProvider,
    renderer: &'a dyn TemplateRenderer,
    env: &'a HostEnvironment,
}

impl<'a> Orchestrator<'a> {
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

    /// Converges every desired instance in order.
    pub fn run(&self, desired: &[InstanceSpec], defaults: &DefaultsRecord) -> RunReport {
        self.converge(desired.iter().map(Ok), defaults)
    }

    /// Converges the entries of a provisioning file in order. Entries that could
    /// not be read are reported as rejected without touching the host.
    pub fn run_entries(&self, entries: &[SentinelEntry], defaults: &DefaultsRecord) -> RunReport {
        self.converge(entries.iter().map(Result::as_ref), defaults)
    }

    fn converge<'s>(
        &self,
        entries: impl ExactSizeIterator<Item = Result<&'s InstanceSpec, &'s MalformedInstance>>,
        defaults: &DefaultsRecord,
    ) -> RunReport {
        let started_at = Utc::now();
        info!(
            "Converging {} sentinel instance(s) with {} job control.",
            entries.len(),
            self.env.job_control
        );

        let engine = ApplyEngine::new(self.host, self.renderer, self.env);
        let mut seen = HashSet::new();
        let mut instances = Vec::with_capacity(entries.len());

        for (index, entry) in entries.enumerate() {
            let spec = match entry {
                Ok(spec) => spec,
                Err(malformed) => {
                    error!("{}: {}", malformed.label, malformed.error);
                    instances.push(InstanceReport::rejected(
                        malformed.label.clone(),
                        Vec::new(),
                        malformed.error.clone().into(),
                    ));
                    continue;
                }
            };

            let label = spec.label(index);
            let (warnings, resolved) = resolve(spec, defaults);
            for warning in &warnings {
                warn!("{}: {}", label, warning);
            }

            let effective = match resolved {
                Ok(effective) => effective,
                Err(e) => {
                    error!("{}: {}", label, e);
                    instances.push(InstanceReport::rejected(label, warnings, e.into()));
                    continue;
                }
            };

            let name = effective.sentinel_name().to_string();
            if !seen.insert(name.clone()) {
                let e = ProvisionError::from(ValidationError::DuplicateInstance { name: name.clone() });
                error!("{}: {}", name, e);
                instances.push(InstanceReport::rejected(name, warnings, e));
                continue;
            }

            let plan = planner::plan(&effective, self.env);
            let mut report = engine.apply(&plan);
            report.warnings = warnings;

            if report.succeeded() {
                info!("{}: converged.", name);
            } else {
                error!("{}: convergence failed.", name);
            }
            instances.push(report);
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            instances,
        };
        info!(
            "Run finished: {} of {} instance(s) converged.",
            report.instances.len() - report.failed_count(),
            report.instances.len()
        );
        report
    }
}
