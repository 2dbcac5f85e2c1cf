//! Entry point: wires CLI → config → three-stage seccomp staging → the C6
//! accept loop (spec §1, §4.6, §4.7, §6).
//!
//! Startup order matters and is fixed by spec §4.7: the config file is read
//! first (it alone decides whether seccomp runs at all), then the pre-init
//! disallow stage goes on before anything touches the paths the config
//! names (keys, db root, socket), then the startup-union stage while that
//! initialization runs, then the steady-state stage immediately before the
//! accept loop. When `seccomp.enabled` is false, no stage is installed at
//! all — matching the original daemon's own config-gated behavior.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use jald::acceptor::{self, SharedState, ThrottleConfig};
use jald::cli::Cli;
use jald::{config, daemonize, shutdown};
use jald_error::Error;
use jald_sysmeta::{SigningCert, SigningKey};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jald: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> jald_error::Result<()> {
    if jald_seccomp::install_violation_handler().is_err() {
        return Err(Error::startup("installing SIGSYS handler"));
    }

    // Config-file parsing itself doesn't touch anything seccomp's disallow
    // stage is meant to protect (spec §4.7's "before any initialization
    // that touches user-controlled data" is about the db/key/socket paths
    // *named* by the config, not the config read itself) — matches the
    // original's own read-config-then-install-filters ordering.
    let cfg = config::load_config(&cli.config)?;
    let debug = cli.debug || cfg.debug;
    let pid_file = cli.pid.clone().unwrap_or_else(|| cfg.pid_file.clone());

    if !cfg.seccomp.enabled {
        return init_and_run(cli, cfg, debug, pid_file, None);
    }

    // Stage 1: permissive-but-trap-dangerous-syscalls, before config-named
    // paths are touched.
    jald_seccomp::install_disallow_stage()
        .map_err(|_| Error::startup("installing pre-init seccomp stage"))?;

    // Stage 2: default-TRAP, union of both syscall lists, covering the
    // directory creation / key loading / socket bind that follows.
    let startup_nrs = jald_seccomp::resolve_names(&cfg.seccomp.startup_syscalls)?;
    let steady_nrs = jald_seccomp::resolve_names(&cfg.seccomp.steady_state_syscalls)?;
    jald_seccomp::install_startup_stage(&startup_nrs, &steady_nrs)
        .map_err(|_| Error::startup("installing startup-stage seccomp filter"))?;

    init_and_run(cli, cfg, debug, pid_file, Some(steady_nrs))
}

fn init_and_run(
    cli: Cli,
    cfg: jald_record::Config,
    debug: bool,
    pid_file: std::path::PathBuf,
    steady_state_syscalls: Option<Vec<i64>>,
) -> jald_error::Result<()> {
    let signing_key = if cfg.sign_sys_meta {
        let path = cfg.private_key_path.as_ref().ok_or_else(|| {
            Error::startup("sign_sys_meta is enabled but private_key_path is not set")
        })?;
        Some(SigningKey::load_from_pem(path)?)
    } else {
        None
    };
    let signing_cert = match &cfg.public_cert_path {
        Some(path) if cfg.sign_sys_meta => Some(SigningCert::load_from_pem(path)?),
        _ => None,
    };

    let store = jald_store::Store::open(&cfg.db_root, cfg.max_record_bytes)?;

    let listener = acceptor::bind_listener(&cfg.socket_path)
        .map_err(|e| Error::startup(format!("binding socket {}: {e}", cfg.socket_path.display())))?;

    if !cli.no_daemon {
        daemonize::daemonize(&cfg.log_dir, &pid_file)
            .map_err(|e| Error::startup(format!("daemonizing: {e}")))?;
    }

    shutdown::install_handlers().map_err(|e| Error::startup(format!("installing signal handlers: {e}")))?;

    // Stage 3: steady-state-only allow-list, installed immediately before
    // the accept loop.
    if let Some(steady_nrs) = steady_state_syscalls {
        jald_seccomp::install_steady_state_stage(&steady_nrs)
            .map_err(|_| Error::startup("installing steady-state seccomp filter"))?;
    }

    let shared = Arc::new(SharedState {
        store,
        signing_key,
        signing_cert,
        manifest_sys_meta: cfg.manifest_sys_meta,
        sign_sys_meta: cfg.sign_sys_meta,
    });

    let throttle = ThrottleConfig {
        thread_count_threshold: cfg.accept_delay_thread_count,
        delay_increment_us: cfg.accept_delay_increment_us,
        delay_max_us: cfg.accept_delay_max_us,
    };

    let result = acceptor::run(listener, cfg.socket_path.clone(), shared, throttle, debug)
        .map_err(|e| Error::internal(format!("accept loop: {e}")));

    if !cli.no_daemon {
        daemonize::remove_pid_file(&pid_file);
    }

    result
}
