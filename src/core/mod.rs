// src/core/mod.rs

//! The convergence engine: desired-state records, their resolution into an
//! `EffectiveConfig`, and the planning and application of host changes.

pub mod apply;
pub mod desired;
pub mod effective;
pub mod environment;
pub mod errors;
pub mod orchestrator;
pub mod planner;
pub mod resolver;
pub mod schema;
pub mod validator;

pub use apply::{ActionOutcome, ApplyEngine, InstanceReport};
pub use desired::{DefaultsRecord, InstanceSpec, MasterSpec};
pub use environment::{HostEnvironment, JobControl};
pub use errors::{HostError, ProvisionError, ValidationError};
pub use orchestrator::{Orchestrator, RunReport};
