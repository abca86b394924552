// src/config.rs

//! Loads the provisioning file: host settings, global defaults and the desired
//! Sentinel instances.

use crate::core::desired::{
    DefaultsRecord, InstanceSpec, MalformedInstance, MasterSpec, SentinelEntry,
};
use crate::core::environment::HostEnvironment;
use crate::core::errors::ValidationError;
use crate::core::resolver::Merge;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use tracing::warn;

/// A raw representation of the provisioning file before defaults are layered.
///
/// Sentinel entries stay as raw tables here and are read one by one, so a
/// broken entry only rejects itself.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    host: HostEnvironment,
    #[serde(default)]
    defaults: DefaultsRecord,
    #[serde(default)]
    sentinels: Vec<toml::Table>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The resolved provisioning file.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub host: HostEnvironment,
    /// The file's `[defaults]` layered over the built-in defaults.
    pub defaults: DefaultsRecord,
    /// Every `[[sentinels]]` entry in file order, including unreadable ones.
    pub sentinels: Vec<SentinelEntry>,
}

impl Config {
    /// Creates a new `Config` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read provisioning file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid provisioning file '{path}'"))
    }

    /// Parses and validates provisioning TOML held in memory.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;

        let config = Config {
            log_level: raw.log_level,
            host: raw.host,
            defaults: DefaultsRecord::merge(&DefaultsRecord::builtin(), &raw.defaults),
            sentinels: raw
                .sentinels
                .into_iter()
                .enumerate()
                .map(|(index, table)| parse_sentinel(index, table))
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }

    /// The entries that parsed, in file order.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceSpec> {
        self.sentinels.iter().filter_map(|entry| entry.as_ref().ok())
    }

    /// Validates host settings. Per-instance problems are reported by the run instead.
    fn validate(&self) -> Result<()> {
        if self.host.init_dir.as_os_str().is_empty() {
            return Err(anyhow!("host.init_dir cannot be empty"));
        }
        if self.host.upstart_dir.as_os_str().is_empty() {
            return Err(anyhow!("host.upstart_dir cannot be empty"));
        }
        if self.host.bin_path.as_os_str().is_empty() && self.host.install_dir.is_none() {
            return Err(anyhow!(
                "host.bin_path cannot be empty unless host.install_dir is set"
            ));
        }
        if self.sentinels.is_empty() {
            warn!("No sentinels declared. Nothing will be converged.");
        }
        Ok(())
    }
}

/// Reads one `[[sentinels]]` table.
fn parse_sentinel(index: usize, table: toml::Table) -> SentinelEntry {
    let label = entry_label(index, &table);
    let field = offending_key(&table);
    toml::Value::Table(table)
        .try_into::<InstanceSpec>()
        .map_err(|e| MalformedInstance {
            label,
            error: ValidationError::Malformed {
                field: field.unwrap_or_else(|| "entry".to_string()),
                reason: e.message().trim().to_string(),
            },
        })
}

/// Mirrors `InstanceSpec::label` for an entry that may not parse.
fn entry_label(index: usize, table: &toml::Table) -> String {
    let name = table.get("name").and_then(toml::Value::as_str);
    let port = table.get("port").and_then(toml::Value::as_integer);
    match (name, port) {
        (Some(name), _) => format!("sentinel_{name}"),
        (None, Some(port)) => format!("sentinel_{port}"),
        (None, None) => format!("sentinels[{index}]"),
    }
}

/// Names the first key whose value cannot be read on its own.
///
/// Keys are tried one at a time, and `masters` is descended into so the
/// path ends at the master field, e.g. `masters[1].master_port`.
fn offending_key(table: &toml::Table) -> Option<String> {
    let (key, value) = table
        .iter()
        .find(|(key, value)| fails_alone::<InstanceSpec>(key, value))?;
    let nested = match value {
        toml::Value::Table(master) if key == "masters" => {
            master_key(master).map(|field| format!("masters.{field}"))
        }
        toml::Value::Array(masters) if key == "masters" => {
            masters.iter().enumerate().find_map(|(i, master)| {
                let field = master_key(master.as_table()?)?;
                Some(format!("masters[{i}].{field}"))
            })
        }
        _ => None,
    };
    Some(nested.unwrap_or_else(|| key.clone()))
}

fn master_key(master: &toml::Table) -> Option<&str> {
    master
        .iter()
        .find(|(key, value)| fails_alone::<MasterSpec>(key, value))
        .map(|(key, _)| key.as_str())
}

fn fails_alone<T: serde::de::DeserializeOwned>(key: &str, value: &toml::Value) -> bool {
    let alone = toml::Table::from_iter([(key.to_string(), value.clone())]);
    toml::Value::Table(alone).try_into::<T>().is_err()
}
