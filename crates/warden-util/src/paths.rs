//! Filesystem locations for the daemon
//!
//! Everything lands in per-user XDG directories so wardend can run
//! unprivileged; the `/tmp` and `/etc` fallbacks only matter on hosts
//! with no usable environment at all. CLI flags and environment
//! overrides are layered on top by the daemon, not here.

use std::path::PathBuf;

const APP_DIR: &str = "wardend";

/// Where the config file is looked for when no `--config` flag is
/// given: `$XDG_CONFIG_HOME/wardend/config.toml`, then
/// `~/.config/wardend/config.toml`, then `/etc/wardend/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }
    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Listen socket location when the config does not name one:
/// `$XDG_RUNTIME_DIR/wardend/wardend.sock`, with a per-user `/tmp`
/// directory as the fallback.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join("wardend.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{APP_DIR}-{user}")).join("wardend.sock")
}

/// Record and audit storage when the config does not name a directory:
/// `$XDG_DATA_HOME/wardend`, then `~/.local/share/wardend`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
