// tests/property/merge_test.rs

//! Property-based tests for the defaults merge.

use proptest::prelude::*;
use sentinel_provisioner::core::desired::MasterSpec;
use sentinel_provisioner::core::resolver::Merge;

fn master_spec() -> impl Strategy<Value = MasterSpec> {
    (
        proptest::option::of("[a-z]{1,12}"),
        proptest::option::of("[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"),
        proptest::option::of(any::<u16>()),
        proptest::option::of(1u32..10),
        proptest::option::of("[a-zA-Z0-9]{0,16}"),
        proptest::option::of(any::<u64>()),
        proptest::option::of(any::<u32>()),
        proptest::option::of(any::<u64>()),
    )
        .prop_map(
            |(name, ip, port, quorum, auth, down_after, syncs, failover)| MasterSpec {
                master_name: name,
                master_ip: ip,
                master_port: port,
                quorum_count: quorum,
                auth_pass: auth,
                down_after_milliseconds: down_after,
                parallel_syncs: syncs,
                failover_timeout: failover,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_merge_takes_override_else_default(
        defaults in master_spec(),
        overrides in master_spec(),
    ) {
        let merged = MasterSpec::merge(&defaults, &overrides);

        prop_assert_eq!(
            &merged.master_name,
            if overrides.master_name.is_some() { &overrides.master_name } else { &defaults.master_name }
        );
        prop_assert_eq!(merged.master_port, overrides.master_port.or(defaults.master_port));
        prop_assert_eq!(merged.quorum_count, overrides.quorum_count.or(defaults.quorum_count));
        prop_assert_eq!(
            merged.failover_timeout,
            overrides.failover_timeout.or(defaults.failover_timeout)
        );
    }

    #[test]
    fn test_merge_with_empty_is_identity(spec in master_spec()) {
        prop_assert_eq!(MasterSpec::merge(&MasterSpec::default(), &spec), spec.clone());
        prop_assert_eq!(MasterSpec::merge(&spec, &MasterSpec::default()), spec);
    }

    #[test]
    fn test_merge_is_idempotent(defaults in master_spec(), overrides in master_spec()) {
        let once = MasterSpec::merge(&defaults, &overrides);
        let twice = MasterSpec::merge(&once, &overrides);
        prop_assert_eq!(once, twice);
    }
}
