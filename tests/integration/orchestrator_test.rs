// tests/integration/orchestrator_test.rs

//! End-to-end runs over several instances with the in-memory host.

use super::fixtures::{config_path, defaults, env, instance, marker_path, master};
use super::test_helpers::{CountingRenderer, MemoryHost, init_tracing};
use sentinel_provisioner::config::Config;
use sentinel_provisioner::core::apply::{ActionOutcome, InstanceStatus};
use sentinel_provisioner::core::desired::{InstanceOptions, InstanceSpec, LegacyMasterFields};
use sentinel_provisioner::core::errors::MasterField;
use sentinel_provisioner::core::planner::Step;
use sentinel_provisioner::core::schema::SchemaWarning;
use sentinel_provisioner::core::{JobControl, Orchestrator, ProvisionError, ValidationError};
use sentinel_provisioner::render::TemplateId;

#[test]
fn test_invalid_instance_does_not_stop_the_others() {
    init_tracing();
    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Initd);

    let mut broken = master("broken", "10.0.0.9", 6379);
    broken.master_ip = None;
    let desired = vec![
        instance("a", vec![master("m1", "10.0.0.1", 6379)]),
        instance("b", vec![broken]),
        instance("c", vec![master("m3", "10.0.0.3", 6380)]),
    ];

    let report = Orchestrator::new(&host, &renderer, &env).run(&desired, &defaults());

    assert!(!report.succeeded());
    assert_eq!(report.failed_count(), 1);
    assert!(report.instance("sentinel_a").unwrap().succeeded());
    assert!(report.instance("sentinel_c").unwrap().succeeded());

    let b = report.instance("sentinel_b").unwrap();
    assert_eq!(b.status, InstanceStatus::Failed);
    assert!(b.actions.is_empty());
    assert!(matches!(
        b.error,
        Some(ProvisionError::Validation(ValidationError::MissingMasterField {
            field: MasterField::MasterIp,
            master_index: 0,
            ..
        }))
    ));

    assert!(host.content(config_path("a")).is_some());
    assert!(host.content(config_path("b")).is_none());
    assert!(host.content(config_path("c")).is_some());
}

#[test]
fn test_marker_protects_config_from_changed_desired_state() {
    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Initd);
    let orchestrator = Orchestrator::new(&host, &renderer, &env);

    let first = vec![instance("cache", vec![master("m1", "10.0.0.1", 6379)])];
    assert!(orchestrator.run(&first, &defaults()).succeeded());
    let rendered = host.content(config_path("cache")).unwrap();
    assert!(rendered.contains("sentinel monitor m1 10.0.0.1 6379 2"));

    let mut changed_master = master("m1", "10.0.0.1", 6379);
    changed_master.quorum_count = Some(3);
    let second = vec![instance("cache", vec![changed_master])];

    let report = orchestrator.run(&second, &defaults());
    let cache = report.instance("sentinel_cache").unwrap();
    assert!(cache.succeeded());
    assert_eq!(cache.outcome_of(Step::MainConfig), Some(ActionOutcome::Skipped));
    assert_eq!(host.content(config_path("cache")).unwrap(), rendered);

    host.remove_file(marker_path("cache"));
    let report = orchestrator.run(&second, &defaults());
    assert_eq!(
        report.instance("sentinel_cache").unwrap().outcome_of(Step::MainConfig),
        Some(ActionOutcome::Updated)
    );
    assert!(
        host.content(config_path("cache"))
            .unwrap()
            .contains("sentinel monitor m1 10.0.0.1 6379 3")
    );
    assert_eq!(renderer.count(TemplateId::SentinelConf), 2);
}

#[test]
fn test_duplicate_sentinel_names_are_rejected() {
    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Initd);

    let desired = vec![
        instance("cache", vec![master("m1", "10.0.0.1", 6379)]),
        instance("cache", vec![master("m2", "10.0.0.2", 6379)]),
    ];
    let report = Orchestrator::new(&host, &renderer, &env).run(&desired, &defaults());

    assert_eq!(report.instances.len(), 2);
    assert!(report.instances[0].succeeded());
    assert_eq!(
        report.instances[1].error,
        Some(ProvisionError::Validation(ValidationError::DuplicateInstance {
            name: "sentinel_cache".to_string()
        }))
    );
    let conf = host.content(config_path("cache")).unwrap();
    assert!(conf.contains("sentinel monitor m1 "));
    assert!(!conf.contains("m2"));
}

#[test]
fn test_legacy_instance_converges_with_warning() {
    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Upstart);

    let legacy = InstanceSpec {
        options: InstanceOptions {
            port: Some(26380),
            ..InstanceOptions::default()
        },
        masters: None,
        legacy: LegacyMasterFields {
            mastername: Some("legacy".to_string()),
            masterip: Some("10.1.1.1".to_string()),
            masterport: Some(6379),
            ..LegacyMasterFields::default()
        },
    };

    let report = Orchestrator::new(&host, &renderer, &env).run(&[legacy], &defaults());
    let instance = report.instance("sentinel_26380").unwrap();

    assert!(instance.succeeded());
    assert_eq!(instance.warnings, vec![SchemaWarning::LegacyMasterFormat]);
    assert!(
        host.content(config_path("26380"))
            .unwrap()
            .contains("sentinel monitor legacy 10.1.1.1 6379 2")
    );
}

#[test]
fn test_run_from_provisioning_file() {
    let config = Config::from_toml_str(
        r#"
        [host]
        job_control = "upstart"
        install_dir = "/opt/redis"

        [defaults]
        quorum_count = 2

        [[sentinels]]
        name = "cache"
        masters = { master_name = "cache", master_ip = "10.0.0.10", master_port = 6379 }

        [[sentinels]]
        name = "queue"
        [[sentinels.masters]]
        master_name = "q1"
        master_ip = "10.0.0.11"
        master_port = 6379
        quorum_count = 3
        [[sentinels.masters]]
        master_name = "q2"
        master_ip = "10.0.0.12"
        master_port = 6379
        "#,
    )
    .unwrap();

    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let report = Orchestrator::new(&host, &renderer, &config.host)
        .run_entries(&config.sentinels, &config.defaults);

    assert!(report.succeeded());
    let queue = host.content(config_path("queue")).unwrap();
    assert!(queue.contains("sentinel monitor q1 10.0.0.11 6379 3"));
    assert!(queue.contains("sentinel monitor q2 10.0.0.12 6379 2"));
    assert!(queue.contains("daemonize no"));
    let job = host.content("/etc/init/redis_sentinel_cache.conf").unwrap();
    assert!(job.contains("exec /opt/redis/bin/redis-server /etc/redis/sentinel_cache.conf --sentinel"));
}

#[test]
fn test_missing_instance_identity_is_rejected() {
    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Initd);

    let mut anonymous = instance("ignored", vec![master("m1", "10.0.0.1", 6379)]);
    anonymous.options.name = None;

    let report = Orchestrator::new(&host, &renderer, &env).run(&[anonymous], &defaults());

    assert_eq!(report.instances[0].sentinel, "sentinels[0]");
    assert_eq!(
        report.instances[0].error,
        Some(ProvisionError::Validation(
            ValidationError::MissingInstanceField { field: "port" }
        ))
    );
    assert_eq!(host.writes.get(), 0);
}

#[test]
fn test_malformed_entry_is_rejected_next_to_a_valid_one() {
    let config = Config::from_toml_str(
        r#"
        [[sentinels]]
        name = "broken"
        masters = { master_name = "m", master_ip = "10.0.0.1", master_port = 70000 }

        [[sentinels]]
        name = "cache"
        masters = { master_name = "cache", master_ip = "10.0.0.10", master_port = 6379 }
        "#,
    )
    .unwrap();

    let host = MemoryHost::new();
    let renderer = CountingRenderer::default();
    let env = env(JobControl::Initd);
    let report = Orchestrator::new(&host, &renderer, &env)
        .run_entries(&config.sentinels, &config.defaults);

    assert_eq!(report.failed_count(), 1);
    let broken = report.instance("sentinel_broken").unwrap();
    assert_eq!(broken.status, InstanceStatus::Failed);
    assert!(broken.actions.is_empty());
    assert!(matches!(
        &broken.error,
        Some(ProvisionError::Validation(ValidationError::Malformed { field, .. }))
            if field == "masters.master_port"
    ));
    assert!(report.instance("sentinel_cache").unwrap().succeeded());
    assert!(host.content(config_path("cache")).is_some());
    assert!(host.content(config_path("broken")).is_none());
}
