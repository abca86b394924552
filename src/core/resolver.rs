// src/core/resolver.rs

//! The defaults resolver: a shallow, field-by-field merge of an override record
//! over a defaults record.

use super::desired::{DefaultsRecord, InstanceOptions, MasterSpec};

/// Records that can be layered: for every field the override wins if it is set,
/// otherwise the default is kept. Fields unset in both stay unset.
pub trait Merge: Sized {
    fn merge(defaults: &Self, overrides: &Self) -> Self;
}

/// Implements `Merge` for a record whose listed fields are all `Option`s.
macro_rules! impl_merge {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl Merge for $ty {
            fn merge(defaults: &Self, overrides: &Self) -> Self {
                Self {
                    $($field: overrides.$field.clone().or_else(|| defaults.$field.clone()),)+
                }
            }
        }
    };
}

impl_merge!(InstanceOptions {
    name,
    port,
    sentinel_port,
    user,
    group,
    uid,
    homedir,
    shell,
    systemuser,
    configdir,
    base_piddir,
    logfile,
    syslogenabled,
    syslogfacility,
    loglevel,
});

impl_merge!(MasterSpec {
    master_name,
    master_ip,
    master_port,
    quorum_count,
    auth_pass,
    down_after_milliseconds,
    parallel_syncs,
    failover_timeout,
});

impl Merge for DefaultsRecord {
    fn merge(defaults: &Self, overrides: &Self) -> Self {
        Self {
            instance: InstanceOptions::merge(&defaults.instance, &overrides.instance),
            master: MasterSpec::merge(&defaults.master, &overrides.master),
        }
    }
}
