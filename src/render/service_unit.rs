// src/render/service_unit.rs

//! Supervision-unit templates: a SysV init script and an upstart job.

use super::ServiceUnitVars;

pub(super) fn render_init_script(vars: &ServiceUnitVars) -> String {
    let name = &vars.name;
    let header = if vars.rhel_family {
        format!(
            "# chkconfig: - 85 15\n\
             # description: Redis Sentinel {name}\n\
             # processname: redis_{name}\n"
        )
    } else {
        format!(
            "### BEGIN INIT INFO\n\
             # Provides:          redis_{name}\n\
             # Required-Start:    $network $local_fs $remote_fs\n\
             # Required-Stop:     $network $local_fs $remote_fs\n\
             # Default-Start:     2 3 4 5\n\
             # Default-Stop:      0 1 6\n\
             # Short-Description: Redis Sentinel {name}\n\
             ### END INIT INFO\n"
        )
    };

    let exec = vars.bin_path.join("redis-server");
    let conf = vars.configdir.join(format!("{name}.conf"));

    format!(
        r#"#!/bin/sh
#
# Redis Sentinel {name} ({platform}, job control: {job_control}).
#
{header}
NAME="{name}"
EXEC="{exec}"
CONF="{conf}"
PIDDIR="{piddir}"
PIDFILE="{pidfile}"
RUNAS="{user}"

case "$1" in
    start)
        if [ -f "$PIDFILE" ] && kill -0 "$(cat "$PIDFILE")" 2>/dev/null; then
            echo "$NAME is already running"
        else
            mkdir -p "$PIDDIR"
            chown "$RUNAS:{group}" "$PIDDIR"
            echo "Starting $NAME..."
            su -s /bin/sh "$RUNAS" -c "$EXEC $CONF --sentinel"
        fi
        ;;
    stop)
        if [ ! -f "$PIDFILE" ]; then
            echo "$NAME is not running"
        else
            PID=$(cat "$PIDFILE")
            echo "Stopping $NAME..."
            kill "$PID"
            while [ -x "/proc/$PID" ]; do
                echo "Waiting for $NAME to shut down..."
                sleep 1
            done
            rm -f "$PIDFILE"
            echo "$NAME stopped"
        fi
        ;;
    status)
        if [ -f "$PIDFILE" ] && kill -0 "$(cat "$PIDFILE")" 2>/dev/null; then
            echo "$NAME is running"
        else
            echo "$NAME is not running"
            exit 3
        fi
        ;;
    restart)
        "$0" stop
        "$0" start
        ;;
    *)
        echo "Usage: $0 {{start|stop|status|restart}}" >&2
        exit 1
        ;;
esac
"#,
        platform = vars.platform,
        job_control = vars.job_control,
        exec = exec.display(),
        conf = conf.display(),
        piddir = vars.piddir.display(),
        pidfile = vars.pidfile.display(),
        user = vars.user,
        group = vars.group,
    )
}

pub(super) fn render_upstart_job(vars: &ServiceUnitVars) -> String {
    let name = &vars.name;
    format!(
        r#"# Redis Sentinel {name} ({platform}, job control: {job_control}).

description "Redis Sentinel {name}"

start on runlevel [2345]
stop on runlevel [06]

respawn
setuid {user}
setgid {group}

pre-start script
    mkdir -p {piddir}
end script

exec {exec} {conf} --sentinel
"#,
        platform = vars.platform,
        job_control = vars.job_control,
        user = vars.user,
        group = vars.group,
        piddir = vars.piddir.display(),
        exec = vars.bin_path.join("redis-server").display(),
        conf = vars.configdir.join(format!("{name}.conf")).display(),
    )
}
