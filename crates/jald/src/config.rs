//! Turns the file named by `-c/--config` into the immutable `Config`
//! snapshot from `jald-record` (spec §3, SPEC_FULL §3a). File-loading
//! mechanics are the only thing this module adds: the recognized keys and
//! the shape of the snapshot live in `jald-record::Config`.

use std::fs;
use std::path::Path;

use jald_error::{Error, Result};
use jald_record::Config;

pub fn load_config(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::startup(format!("reading config file {}: {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| Error::startup(format!("parsing config file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_well_formed_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jald.toml");
        fs::write(
            &path,
            r#"
                db_root = "/tmp/jald/db"
                schemas_root = "/tmp/jald/schemas"
                socket_path = "/tmp/jald/jald.sock"
                log_dir = "/tmp/jald/log"
                pid_file = "/tmp/jald/jald.pid"
                accept_delay_thread_count = 50
                accept_delay_increment_us = 100
                accept_delay_max_us = 100000
            "#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.accept_delay_thread_count, 50);
    }

    #[test]
    fn missing_file_is_a_startup_failure() {
        let err = load_config(Path::new("/nonexistent/jald.toml")).unwrap_err();
        assert!(matches!(err, Error::StartupFailure(_)));
    }

    #[test]
    fn malformed_toml_is_a_startup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jald.toml");
        fs::write(&path, "this is not valid = = toml").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::StartupFailure(_)));
    }
}
