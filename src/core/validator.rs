// src/core/validator.rs

//! Checks that every normalized master carries the settings a Sentinel needs to
//! monitor it. The first gap rejects the whole instance.

use super::desired::MasterSpec;
use super::effective::Master;
use super::errors::{MasterField, ValidationError};

/// Validates masters in declaration order, stopping at the first missing field.
///
/// Fields are checked in the order IP, port, quorum count, name. Empty or
/// whitespace-only strings count as missing.
pub fn validate(masters: &[MasterSpec]) -> Result<Vec<Master>, ValidationError> {
    if masters.is_empty() {
        return Err(ValidationError::NoMasters);
    }

    masters
        .iter()
        .enumerate()
        .map(|(index, spec)| validate_master(index, spec))
        .collect()
}

fn validate_master(index: usize, spec: &MasterSpec) -> Result<Master, ValidationError> {
    let missing = |field: MasterField| ValidationError::MissingMasterField {
        field,
        master_index: index,
        master: format!("{spec:?}"),
    };

    let ip = non_blank(&spec.master_ip).ok_or_else(|| missing(MasterField::MasterIp))?;
    let port = spec
        .master_port
        .ok_or_else(|| missing(MasterField::MasterPort))?;
    let quorum = spec
        .quorum_count
        .ok_or_else(|| missing(MasterField::QuorumCount))?;
    let name = non_blank(&spec.master_name).ok_or_else(|| missing(MasterField::MasterName))?;

    Ok(Master {
        name,
        ip,
        port,
        quorum,
        auth_pass: spec.auth_pass.clone(),
        down_after_milliseconds: spec.down_after_milliseconds,
        parallel_syncs: spec.parallel_syncs,
        failover_timeout: spec.failover_timeout,
    })
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
