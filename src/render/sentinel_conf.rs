// src/render/sentinel_conf.rs

use super::SentinelConfVars;
use crate::core::environment::JobControl;

pub(super) fn render(vars: &SentinelConfVars) -> String {
    let name = &vars.name;
    let mut lines = vec![
        format!("# {name}: rendered once by sentinel-provisioner {}.", env!("CARGO_PKG_VERSION")),
        format!("# Local changes are kept. Remove {name}.conf.breadcrumb to render it again."),
        String::new(),
        format!("port {}", vars.sentinel_port),
        // Upstart supervises the foreground process; init.d expects a daemon.
        format!(
            "daemonize {}",
            if vars.job_control == JobControl::Upstart { "no" } else { "yes" }
        ),
        format!("pidfile {}", vars.pidfile.display()),
        format!("loglevel {}", vars.loglevel),
    ];

    match vars.logfile.as_deref() {
        Some("stdout") => lines.push("logfile \"\"".to_string()),
        Some(path) => lines.push(format!("logfile {path}")),
        None => {}
    }

    if vars.syslogenabled {
        lines.push("syslog-enabled yes".to_string());
        lines.push(format!("syslog-ident redis-{name}"));
        lines.push(format!("syslog-facility {}", vars.syslogfacility));
    } else {
        lines.push("syslog-enabled no".to_string());
    }

    for master in &vars.masters {
        let master_name = &master.name;
        lines.push(String::new());
        lines.push(format!(
            "sentinel monitor {master_name} {} {} {}",
            master.ip, master.port, master.quorum
        ));
        if let Some(pass) = &master.auth_pass {
            lines.push(format!("sentinel auth-pass {master_name} {pass}"));
        }
        if let Some(ms) = master.down_after_milliseconds {
            lines.push(format!("sentinel down-after-milliseconds {master_name} {ms}"));
        }
        if let Some(syncs) = master.parallel_syncs {
            lines.push(format!("sentinel parallel-syncs {master_name} {syncs}"));
        }
        if let Some(timeout) = master.failover_timeout {
            lines.push(format!("sentinel failover-timeout {master_name} {timeout}"));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
