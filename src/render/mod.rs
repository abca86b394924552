// src/render/mod.rs

//! Turns resolved configuration into file text.
//!
//! The engine only depends on the `TemplateRenderer` trait; `BuiltinRenderer`
//! provides the three templates a Sentinel deployment needs.

use crate::core::effective::Master;
use crate::core::environment::JobControl;
use crate::core::errors::RenderError;
use std::path::PathBuf;
use strum_macros::Display;

mod sentinel_conf;
mod service_unit;

/// The templates a renderer must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TemplateId {
    /// The Sentinel's main configuration file.
    SentinelConf,
    /// An init.d script for `JobControl::Initd`.
    InitScript,
    /// An upstart job for `JobControl::Upstart`.
    UpstartJob,
}

/// Variables of the main configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelConfVars {
    pub name: String,
    pub pidfile: PathBuf,
    pub job_control: JobControl,
    pub sentinel_port: u16,
    pub loglevel: String,
    pub logfile: Option<String>,
    pub syslogenabled: bool,
    pub syslogfacility: String,
    pub masters: Vec<Master>,
}

/// Variables shared by both supervision-unit templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnitVars {
    pub name: String,
    pub bin_path: PathBuf,
    pub job_control: JobControl,
    pub user: String,
    pub group: String,
    pub configdir: PathBuf,
    pub piddir: PathBuf,
    pub pidfile: PathBuf,
    pub platform: String,
    /// Use `chkconfig` headers instead of LSB ones in init scripts.
    pub rhel_family: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateVars {
    SentinelConf(SentinelConfVars),
    ServiceUnit(ServiceUnitVars),
}

pub trait TemplateRenderer {
    fn render(&self, template: TemplateId, vars: &TemplateVars) -> Result<String, RenderError>;
}

/// The renderer shipped with the provisioner.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl TemplateRenderer for BuiltinRenderer {
    fn render(&self, template: TemplateId, vars: &TemplateVars) -> Result<String, RenderError> {
        match (template, vars) {
            (TemplateId::SentinelConf, TemplateVars::SentinelConf(vars)) => {
                Ok(sentinel_conf::render(vars))
            }
            (TemplateId::InitScript, TemplateVars::ServiceUnit(vars)) => {
                Ok(service_unit::render_init_script(vars))
            }
            (TemplateId::UpstartJob, TemplateVars::ServiceUnit(vars)) => {
                Ok(service_unit::render_upstart_job(vars))
            }
            _ => Err(RenderError::VariablesMismatch {
                template: template.to_string(),
            }),
        }
    }
}
