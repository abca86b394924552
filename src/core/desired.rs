// src/core/desired.rs

//! Desired-state input records, exactly as they are read from the provisioning file.
//!
//! Every field here is optional: the same record shapes describe global defaults,
//! per-instance overrides and the result of merging the two. Required-ness is only
//! enforced once records are resolved into an `EffectiveConfig`.

use super::errors::ValidationError;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

/// Instance-level options of one Sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstanceOptions {
    pub name: Option<String>,
    pub port: Option<u16>,
    pub sentinel_port: Option<u16>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub uid: Option<u32>,
    pub homedir: Option<PathBuf>,
    pub shell: Option<PathBuf>,
    #[serde(deserialize_with = "yes_no::deserialize")]
    pub systemuser: Option<bool>,
    pub configdir: Option<PathBuf>,
    pub base_piddir: Option<PathBuf>,
    /// Absent or `"stdout"` means the log file is not managed on disk.
    pub logfile: Option<String>,
    #[serde(deserialize_with = "yes_no::deserialize")]
    pub syslogenabled: Option<bool>,
    pub syslogfacility: Option<String>,
    pub loglevel: Option<String>,
}

/// One monitored master, before or after defaults are merged under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MasterSpec {
    pub master_name: Option<String>,
    pub master_ip: Option<String>,
    pub master_port: Option<u16>,
    pub quorum_count: Option<u32>,
    #[serde(rename = "auth-pass")]
    pub auth_pass: Option<String>,
    #[serde(rename = "down-after-milliseconds")]
    pub down_after_milliseconds: Option<u64>,
    #[serde(rename = "parallel-syncs")]
    pub parallel_syncs: Option<u32>,
    #[serde(rename = "failover-timeout")]
    pub failover_timeout: Option<u64>,
}

/// The `masters` key accepts either one table or an array of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterList {
    Many(Vec<MasterSpec>),
    Single(MasterSpec),
}

impl<'de> Deserialize<'de> for MasterList {
    /// Dispatches on the input shape so that an error inside a master (a port
    /// out of range, say) surfaces as itself rather than as a shape mismatch.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MasterListVisitor;

        impl<'de> Visitor<'de> for MasterListVisitor {
            type Value = MasterList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a master table or an array of master tables")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                Vec::<MasterSpec>::deserialize(SeqAccessDeserializer::new(seq)).map(MasterList::Many)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                MasterSpec::deserialize(MapAccessDeserializer::new(map)).map(MasterList::Single)
            }
        }

        deserializer.deserialize_any(MasterListVisitor)
    }
}

impl MasterList {
    /// Returns the declared masters as a list, in declaration order.
    pub fn to_vec(&self) -> Vec<MasterSpec> {
        match self {
            MasterList::Many(masters) => masters.clone(),
            MasterList::Single(master) => vec![master.clone()],
        }
    }
}

/// Deprecated single-master fields set directly on the instance.
///
/// Two generations exist: the current key names (shared with `MasterSpec`) and an
/// older compact naming (`masterip`, `downaftermil`, ...). When both are present
/// the current name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyMasterFields {
    #[serde(flatten)]
    pub current: MasterSpec,
    pub mastername: Option<String>,
    pub masterip: Option<String>,
    pub masterport: Option<u16>,
    pub authpass: Option<String>,
    pub downaftermil: Option<u64>,
    pub parallelsyncs: Option<u32>,
    pub failovertimeout: Option<u64>,
}

impl LegacyMasterFields {
    /// True if any legacy master field was set on the instance.
    pub fn is_declared(&self) -> bool {
        *self != LegacyMasterFields::default()
    }

    /// Collapses both key generations into one `MasterSpec`, preferring current names.
    pub fn to_master(&self) -> MasterSpec {
        let current = &self.current;
        MasterSpec {
            master_name: current.master_name.clone().or_else(|| self.mastername.clone()),
            master_ip: current.master_ip.clone().or_else(|| self.masterip.clone()),
            master_port: current.master_port.or(self.masterport),
            quorum_count: current.quorum_count,
            auth_pass: current.auth_pass.clone().or_else(|| self.authpass.clone()),
            down_after_milliseconds: current.down_after_milliseconds.or(self.downaftermil),
            parallel_syncs: current.parallel_syncs.or(self.parallelsyncs),
            failover_timeout: current.failover_timeout.or(self.failovertimeout),
        }
    }
}

/// One `[[sentinels]]` entry of the provisioning file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstanceSpec {
    #[serde(flatten)]
    pub options: InstanceOptions,
    #[serde(default)]
    pub masters: Option<MasterList>,
    #[serde(flatten)]
    pub legacy: LegacyMasterFields,
}

impl InstanceSpec {
    /// A best-effort label for reports, usable before the instance is resolved.
    pub fn label(&self, index: usize) -> String {
        match (&self.options.name, self.options.port) {
            (Some(name), _) => format!("sentinel_{name}"),
            (None, Some(port)) => format!("sentinel_{port}"),
            (None, None) => format!("sentinels[{index}]"),
        }
    }
}

/// A `[[sentinels]]` entry that could not be read into an `InstanceSpec`.
///
/// It is reported as that instance's rejection; the other entries still run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedInstance {
    /// Same labelling as `InstanceSpec::label`, taken from the raw entry.
    pub label: String,
    pub error: ValidationError,
}

/// One entry of the provisioning file's sentinel list, parsed or not.
pub type SentinelEntry = Result<InstanceSpec, MalformedInstance>;

/// The global defaults record. Its instance half is merged under every instance,
/// its master half under every master of every instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultsRecord {
    #[serde(flatten)]
    pub instance: InstanceOptions,
    #[serde(flatten)]
    pub master: MasterSpec,
}

impl DefaultsRecord {
    /// The defaults that apply when the provisioning file leaves a key unset.
    ///
    /// Master identity and quorum have no built-in value and must be declared.
    pub fn builtin() -> Self {
        Self {
            instance: InstanceOptions {
                name: None,
                port: None,
                sentinel_port: Some(26379),
                user: Some("redis".to_string()),
                group: Some("redis".to_string()),
                uid: None,
                homedir: Some(PathBuf::from("/var/lib/redis")),
                shell: Some(PathBuf::from("/bin/false")),
                systemuser: Some(true),
                configdir: Some(PathBuf::from("/etc/redis")),
                base_piddir: Some(PathBuf::from("/var/run/redis")),
                logfile: None,
                syslogenabled: Some(true),
                syslogfacility: Some("local0".to_string()),
                loglevel: Some("notice".to_string()),
            },
            master: MasterSpec {
                down_after_milliseconds: Some(30000),
                parallel_syncs: Some(1),
                failover_timeout: Some(900000),
                ..MasterSpec::default()
            },
        }
    }
}

/// Accepts booleans as well as the `"yes"`/`"no"` strings older files use.
mod yes_no {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        match Option::<Flag>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Flag::Bool(b)) => Ok(Some(b)),
            Some(Flag::Text(text)) => match text.to_ascii_lowercase().as_str() {
                "yes" | "true" => Ok(Some(true)),
                "no" | "false" => Ok(Some(false)),
                other => Err(D::Error::custom(format!(
                    "expected a boolean or 'yes'/'no', found '{other}'"
                ))),
            },
        }
    }
}
