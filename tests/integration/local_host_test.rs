// tests/integration/local_host_test.rs

//! `LocalHost` and `DryRunHost` against a temporary directory.
//!
//! The account databases are fake files mapping `redis` and `root` to the uid
//! and gid of the user running the tests, so ownership changes are no-ops.

use super::fixtures::{master, instance};
use super::test_helpers::init_tracing;
use sentinel_provisioner::core::apply::ActionOutcome;
use sentinel_provisioner::core::desired::{DefaultsRecord, InstanceOptions, MasterSpec};
use sentinel_provisioner::core::planner::Step;
use sentinel_provisioner::core::resolver::Merge;
use sentinel_provisioner::core::{HostEnvironment, HostError, JobControl, Orchestrator};
use sentinel_provisioner::host::accounts::AccountDb;
use sentinel_provisioner::host::{
    AccountSpec, Change, DirectorySpec, DryRunHost, FileSpec, HostProvider, LocalHost,
};
use sentinel_provisioner::host::local::replace_file;
use sentinel_provisioner::render::BuiltinRenderer;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
    host: LocalHost,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let sample = dir.path().join("sample");
        fs::write(&sample, "").unwrap();
        Self::owned_like(dir, &sample)
    }

    /// Maps `redis` and `root` to the owner and group of `path`.
    fn owned_like(dir: TempDir, path: &Path) -> Self {
        let meta = fs::metadata(path).unwrap();
        let (uid, gid) = (meta.uid(), meta.gid());

        let passwd = dir.path().join("passwd");
        let group = dir.path().join("group");
        fs::write(
            &passwd,
            format!(
                "# fake passwd\nroot:x:{uid}:{gid}:root:/root:/bin/sh\nredis:x:{uid}:{gid}:Redis:/var/lib/redis:/bin/false\n"
            ),
        )
        .unwrap();
        fs::write(&group, format!("root:x:{gid}:\nredis:x:{gid}:\n")).unwrap();

        let host = LocalHost::new(AccountDb::new(passwd, group)).with_useradd("false");
        Self { dir, host }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn file(&self, relative: &str, mode: u32) -> FileSpec {
        FileSpec {
            path: self.path(relative),
            owner: "redis".to_string(),
            group: "redis".to_string(),
            mode,
        }
    }

    fn env(&self) -> HostEnvironment {
        HostEnvironment {
            job_control: JobControl::Initd,
            init_dir: self.path("init.d"),
            upstart_dir: self.path("init"),
            ..HostEnvironment::default()
        }
    }

    fn defaults(&self) -> DefaultsRecord {
        DefaultsRecord::merge(
            &DefaultsRecord::builtin(),
            &DefaultsRecord {
                instance: InstanceOptions {
                    configdir: Some(self.path("etc/redis")),
                    base_piddir: Some(self.path("run/redis")),
                    ..InstanceOptions::default()
                },
                master: MasterSpec {
                    quorum_count: Some(2),
                    ..MasterSpec::default()
                },
            },
        )
    }
}

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[test]
fn test_ensure_directory_creates_then_settles() {
    let sandbox = Sandbox::new();
    let dir = DirectorySpec {
        path: sandbox.path("a/b/c"),
        owner: "redis".to_string(),
        group: "redis".to_string(),
        mode: 0o750,
        recursive: true,
    };

    assert_eq!(sandbox.host.ensure_directory(&dir).unwrap(), Change::Created);
    assert!(dir.path.is_dir());
    assert_eq!(mode_of(&dir.path), 0o750);
    assert_eq!(sandbox.host.ensure_directory(&dir).unwrap(), Change::Unchanged);

    let widened = DirectorySpec {
        mode: 0o755,
        ..dir.clone()
    };
    assert_eq!(sandbox.host.ensure_directory(&widened).unwrap(), Change::Updated);
    assert_eq!(mode_of(&dir.path), 0o755);
}

#[test]
fn test_ensure_directory_rejects_a_file_in_the_way() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("taken"), "x").unwrap();
    let dir = DirectorySpec {
        path: sandbox.path("taken"),
        owner: "redis".to_string(),
        group: "redis".to_string(),
        mode: 0o755,
        recursive: false,
    };

    let err = sandbox.host.ensure_directory(&dir).unwrap_err();
    assert_eq!(
        err,
        HostError::Conflict {
            path: sandbox.path("taken"),
            expected: "directory"
        }
    );
}

#[test]
fn test_write_file_reports_changes_and_leaves_no_temp_file() {
    let sandbox = Sandbox::new();
    let file = sandbox.file("sentinel.conf", 0o644);

    assert_eq!(sandbox.host.write_file(&file, "port 26379\n").unwrap(), Change::Created);
    assert_eq!(sandbox.host.write_file(&file, "port 26379\n").unwrap(), Change::Unchanged);
    assert_eq!(sandbox.host.write_file(&file, "port 26380\n").unwrap(), Change::Updated);

    assert_eq!(fs::read_to_string(&file.path).unwrap(), "port 26380\n");
    assert_eq!(mode_of(&file.path), 0o644);
    let leftovers = fs::read_dir(sandbox.dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_write_file_if_absent_never_overwrites() {
    let sandbox = Sandbox::new();
    let file = sandbox.file("marker", 0o644);
    fs::write(&file.path, "edited by hand").unwrap();

    assert_eq!(
        sandbox.host.write_file_if_absent(&file, "fresh").unwrap(),
        Change::Unchanged
    );
    assert_eq!(fs::read_to_string(&file.path).unwrap(), "edited by hand");
}

#[test]
fn test_write_file_if_absent_creates_with_attributes() {
    let sandbox = Sandbox::new();
    let file = sandbox.file("marker", 0o640);

    assert_eq!(
        sandbox.host.write_file_if_absent(&file, "fresh").unwrap(),
        Change::Created
    );
    assert_eq!(fs::read_to_string(&file.path).unwrap(), "fresh");
    assert_eq!(mode_of(&file.path), 0o640);
    assert_eq!(
        sandbox.host.write_file_if_absent(&file, "again").unwrap(),
        Change::Unchanged
    );
    assert_eq!(fs::read_to_string(&file.path).unwrap(), "fresh");
}

#[test]
fn test_write_file_if_absent_rejects_a_directory_in_the_way() {
    let sandbox = Sandbox::new();
    fs::create_dir(sandbox.path("marker")).unwrap();
    let file = sandbox.file("marker", 0o644);

    let err = sandbox.host.write_file_if_absent(&file, "fresh").unwrap_err();
    assert_eq!(
        err,
        HostError::Conflict {
            path: sandbox.path("marker"),
            expected: "regular file"
        }
    );
}

#[test]
fn test_failed_replace_removes_its_temp_file() {
    let sandbox = Sandbox::new();
    let occupied = sandbox.path("occupied");
    fs::create_dir(&occupied).unwrap();
    fs::write(occupied.join("inside"), "x").unwrap();

    assert!(replace_file(&occupied, "port 26379\n").is_err());

    let leftovers = fs::read_dir(sandbox.dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
        .count();
    assert_eq!(leftovers, 0);
    assert!(occupied.join("inside").is_file());
}

#[test]
fn test_file_exists_only_treats_missing_as_absent() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("plain"), "x").unwrap();
    std::os::unix::fs::symlink(sandbox.path("nowhere"), sandbox.path("dangling")).unwrap();

    assert!(sandbox.host.file_exists(&sandbox.path("plain")).unwrap());
    assert!(sandbox.host.file_exists(&sandbox.path("dangling")).unwrap());
    assert!(!sandbox.host.file_exists(&sandbox.path("missing")).unwrap());

    let err = sandbox
        .host
        .file_exists(&sandbox.path("plain/child"))
        .unwrap_err();
    assert!(matches!(err, HostError::Io { ref path, .. } if *path == sandbox.path("plain/child")));
}

#[test]
fn test_current_dir_is_a_valid_log_dir() {
    let sandbox = Sandbox::owned_like(TempDir::new().unwrap(), Path::new("."));
    let dir = DirectorySpec {
        path: PathBuf::from("."),
        owner: "redis".to_string(),
        group: "redis".to_string(),
        mode: mode_of(Path::new(".")),
        recursive: true,
    };

    assert_eq!(sandbox.host.ensure_directory(&dir).unwrap(), Change::Unchanged);
}

#[test]
fn test_touch_keeps_existing_content() {
    let sandbox = Sandbox::new();
    let file = sandbox.file("sentinel.log", 0o644);

    assert_eq!(sandbox.host.ensure_file_touched(&file).unwrap(), Change::Created);
    assert_eq!(fs::read_to_string(&file.path).unwrap(), "");

    fs::write(&file.path, "line\n").unwrap();
    fs::set_permissions(&file.path, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(sandbox.host.ensure_file_touched(&file).unwrap(), Change::Unchanged);
    assert_eq!(fs::read_to_string(&file.path).unwrap(), "line\n");
}

#[test]
fn test_unknown_owner_is_an_error() {
    let sandbox = Sandbox::new();
    let file = FileSpec {
        owner: "nobody-here".to_string(),
        ..sandbox.file("orphan", 0o644)
    };

    let err = sandbox.host.write_file(&file, "x").unwrap_err();
    assert_eq!(err, HostError::UnknownUser("nobody-here".to_string()));
}

#[test]
fn test_ensure_user_only_runs_useradd_for_missing_accounts() {
    let sandbox = Sandbox::new();
    let mut account = AccountSpec {
        user: "redis".to_string(),
        group: "redis".to_string(),
        home: PathBuf::from("/var/lib/redis"),
        shell: PathBuf::from("/bin/false"),
        uid: None,
        system: true,
        comment: "Redis service account".to_string(),
        manage_home: true,
    };

    assert_eq!(sandbox.host.ensure_user(&account).unwrap(), Change::Unchanged);

    // `false` stands in for useradd and always fails.
    account.user = "sentinel".to_string();
    account.group = "sentinel".to_string();
    match sandbox.host.ensure_user(&account) {
        Err(HostError::CommandFailed { command, .. }) => {
            assert!(command.contains("--user-group"));
            assert!(command.ends_with(" sentinel"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[test]
fn test_orchestrator_converges_on_local_host() {
    init_tracing();
    let sandbox = Sandbox::new();
    let env = sandbox.env();
    fs::create_dir(&env.init_dir).unwrap();
    let desired = vec![instance("cache", vec![master("mymaster", "127.0.0.1", 6379)])];

    let orchestrator = Orchestrator::new(&sandbox.host, &BuiltinRenderer, &env);
    let first = orchestrator.run(&desired, &sandbox.defaults());
    assert!(first.succeeded(), "{first:?}");

    let conf_path = sandbox.path("etc/redis/sentinel_cache.conf");
    let conf = fs::read_to_string(&conf_path).unwrap();
    assert!(conf.contains("sentinel monitor mymaster 127.0.0.1 6379 2"));
    assert!(sandbox.path("etc/redis/sentinel_cache.conf.breadcrumb").is_file());
    assert!(sandbox.path("run/redis/sentinel_cache").is_dir());
    let script = sandbox.path("init.d/redis_sentinel_cache");
    assert_eq!(mode_of(&script), 0o755);

    // Hand edits survive later runs while the marker is in place.
    fs::write(&conf_path, format!("{conf}# tuned by hand\n")).unwrap();
    let second = orchestrator.run(&desired, &sandbox.defaults());
    let cache = second.instance("sentinel_cache").unwrap();
    assert_eq!(cache.outcome_of(Step::MainConfig), Some(ActionOutcome::Skipped));
    assert_eq!(
        cache.outcome_of(Step::SupervisionUnit),
        Some(ActionOutcome::AlreadySatisfied)
    );
    assert!(fs::read_to_string(&conf_path).unwrap().ends_with("# tuned by hand\n"));
}

#[test]
fn test_dry_run_leaves_the_host_untouched() {
    let sandbox = Sandbox::new();
    let env = sandbox.env();
    let dry = DryRunHost::new(sandbox.host.clone());
    let desired = vec![instance("cache", vec![master("mymaster", "127.0.0.1", 6379)])];

    let report = Orchestrator::new(&dry, &BuiltinRenderer, &env).run(&desired, &sandbox.defaults());

    let cache = report.instance("sentinel_cache").unwrap();
    assert!(cache.succeeded());
    assert_eq!(
        cache.outcome_of(Step::ServiceAccount),
        Some(ActionOutcome::AlreadySatisfied)
    );
    assert_eq!(cache.outcome_of(Step::ConfigDir), Some(ActionOutcome::Created));
    assert_eq!(cache.outcome_of(Step::MainConfig), Some(ActionOutcome::Created));
    assert!(!sandbox.path("etc").exists());
    assert!(!sandbox.path("run").exists());
    assert!(!sandbox.path("init.d").exists());
}
