// src/core/schema.rs

//! The schema normalizer.
//!
//! Instances declare their masters either through the `masters` key (one table
//! or an array of tables) or through deprecated scalar fields set directly on
//! the instance. Both shapes are reduced to one canonical list of masters with
//! the master-level defaults merged under each entry.

use super::desired::{InstanceSpec, MasterSpec};
use super::resolver::Merge;
use serde::Serialize;
use strum_macros::Display;

/// A non-fatal finding about the shape of an instance's desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaWarning {
    /// Masters were declared through deprecated scalar fields on the instance.
    #[strum(
        to_string = "deprecated single-master sentinel format in use; move master settings into 'masters'"
    )]
    LegacyMasterFormat,
    /// Scalar master fields were set next to a `masters` list and were ignored.
    #[strum(to_string = "scalar master fields are ignored because 'masters' is declared")]
    LegacyFieldsIgnored,
}

/// The output of `normalize`: merged masters in declaration order, plus warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedMasters {
    pub masters: Vec<MasterSpec>,
    pub warnings: Vec<SchemaWarning>,
}

/// Reduces an instance's master declarations to a canonical, defaulted list.
///
/// An instance that declares no masters at all yields an empty list; nothing is
/// synthesized from the defaults alone.
pub fn normalize(spec: &InstanceSpec, master_defaults: &MasterSpec) -> NormalizedMasters {
    let mut warnings = Vec::new();

    let declared = match &spec.masters {
        Some(list) => {
            if spec.legacy.is_declared() {
                warnings.push(SchemaWarning::LegacyFieldsIgnored);
            }
            list.to_vec()
        }
        None if spec.legacy.is_declared() => {
            warnings.push(SchemaWarning::LegacyMasterFormat);
            vec![spec.legacy.to_master()]
        }
        None => Vec::new(),
    };

    let masters = declared
        .iter()
        .map(|master| MasterSpec::merge(master_defaults, master))
        .collect();

    NormalizedMasters { masters, warnings }
}
