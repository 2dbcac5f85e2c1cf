use std::path::PathBuf;

use serde::Deserialize;

/// Immutable process-wide configuration, parsed once at startup from the
/// file named by `-c/--config` and never touched again (see spec §3,
/// "Configuration snapshot"). Unknown keys are a hard parse error — this
/// mirrors the original's `config_lookup` calls, each of which is fatal on
/// a missing/misnamed key rather than silently defaulting.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub db_root: PathBuf,
    pub schemas_root: PathBuf,
    pub socket_path: PathBuf,
    pub log_dir: PathBuf,
    pub pid_file: PathBuf,

    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub public_cert_path: Option<PathBuf>,

    #[serde(default)]
    pub sign_sys_meta: bool,
    #[serde(default = "default_manifest_sys_meta")]
    pub manifest_sys_meta: bool,

    /// Live-thread-count threshold above which the acceptor throttles.
    /// `<= 0` disables throttling entirely (spec §4.6).
    pub accept_delay_thread_count: i64,
    pub accept_delay_increment_us: u64,
    pub accept_delay_max_us: u64,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub seccomp: SeccompConfig,

    /// Total record size (payload + app-meta + sys-meta) above which C2
    /// rejects the submission with `Error::Reject`. Not named explicitly in
    /// spec §3's option list but required by spec §4.2/§7's `Reject` policy
    /// to have some concrete bound; defaults to 2 GiB.
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: u64,
}

fn default_manifest_sys_meta() -> bool {
    true
}

fn default_max_record_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

/// Two-phase syscall allow-list configuration (spec §4.7).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeccompConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub startup_syscalls: Vec<String>,
    #[serde(default)]
    pub steady_state_syscalls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            db_root = "/var/lib/jald/db"
            schemas_root = "/var/lib/jald/schemas"
            socket_path = "/run/jald/jald.sock"
            log_dir = "/var/log/jald"
            pid_file = "/run/jald/jald.pid"
            accept_delay_thread_count = 50
            accept_delay_increment_us = 100
            accept_delay_max_us = 100000
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert!(cfg.manifest_sys_meta);
        assert!(!cfg.sign_sys_meta);
        assert!(!cfg.seccomp.enabled);
        assert_eq!(cfg.max_record_bytes, 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml = r#"
            db_root = "/var/lib/jald/db"
            schemas_root = "/var/lib/jald/schemas"
            socket_path = "/run/jald/jald.sock"
            log_dir = "/var/log/jald"
            pid_file = "/run/jald/jald.pid"
            accept_delay_thread_count = 50
            accept_delay_increment_us = 100
            accept_delay_max_us = 100000
            bogus_key = true
        "#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn seccomp_section_parses_syscall_lists() {
        let toml = r#"
            db_root = "/var/lib/jald/db"
            schemas_root = "/var/lib/jald/schemas"
            socket_path = "/run/jald/jald.sock"
            log_dir = "/var/log/jald"
            pid_file = "/run/jald/jald.pid"
            accept_delay_thread_count = 50
            accept_delay_increment_us = 100
            accept_delay_max_us = 100000

            [seccomp]
            enabled = true
            startup_syscalls = ["open", "openat"]
            steady_state_syscalls = ["read", "write"]
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert!(cfg.seccomp.enabled);
        assert_eq!(cfg.seccomp.startup_syscalls, vec!["open", "openat"]);
    }
}
