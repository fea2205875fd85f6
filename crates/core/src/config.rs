use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::time::parse_duration_str;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api_addr: SocketAddr,
    pub otlp_grpc_addr: SocketAddr,
    pub otlp_http_addr: SocketAddr,
    pub shutdown_grace: Duration,
    pub debug: bool,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            otlp_grpc_addr: SocketAddr::from(([0, 0, 0, 0], 4317)),
            otlp_http_addr: SocketAddr::from(([0, 0, 0, 0], 4318)),
            shutdown_grace: Duration::from_secs(10),
            debug: false,
            log_json: false,
        }
    }
}

impl Config {
    /// Defaults, then the config file (if present), then `OTELVIEW_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            cfg.apply(file_overrides, "config file")?;
        }
        cfg.apply(load_env_overrides(), "environment")?;
        Ok(cfg)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides, source: &str) -> Result<()> {
        if let Some(v) = overrides.api_addr {
            self.api_addr = parse_addr("api_addr", &v, source)?;
        }
        if let Some(v) = overrides.otlp_grpc_addr {
            self.otlp_grpc_addr = parse_addr("otlp_grpc_addr", &v, source)?;
        }
        if let Some(v) = overrides.otlp_http_addr {
            self.otlp_http_addr = parse_addr("otlp_http_addr", &v, source)?;
        }
        if let Some(v) = overrides.shutdown_grace {
            self.shutdown_grace = parse_duration_str(&v)
                .map_err(|e| ViewError::Config(format!("bad shutdown_grace in {source}: {e}")))?;
        }
        if let Some(v) = overrides.debug {
            self.debug = v;
        }
        if let Some(v) = overrides.log_json {
            self.log_json = v;
        }
        Ok(())
    }
}

/// Partial configuration; every field left `None` keeps the current value.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverrides {
    pub api_addr: Option<String>,
    pub otlp_grpc_addr: Option<String>,
    pub otlp_http_addr: Option<String>,
    pub shutdown_grace: Option<String>,
    pub debug: Option<bool>,
    pub log_json: Option<bool>,
}

fn parse_addr(field: &str, value: &str, source: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|e| ViewError::Config(format!("bad {field} in {source}: {e} (value={value})")))
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("OTELVIEW_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("otelview/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| ViewError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| ViewError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        api_addr: env::var("OTELVIEW_API_ADDR").ok(),
        otlp_grpc_addr: env::var("OTELVIEW_OTLP_GRPC_ADDR").ok(),
        otlp_http_addr: env::var("OTELVIEW_OTLP_HTTP_ADDR").ok(),
        shutdown_grace: env::var("OTELVIEW_SHUTDOWN_GRACE").ok(),
        debug: env_flag("OTELVIEW_DEBUG"),
        log_json: env_flag("OTELVIEW_LOG_JSON"),
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_expected_ports() {
        let cfg = Config::default();
        assert_eq!(cfg.api_addr.port(), 8000);
        assert_eq!(cfg.otlp_grpc_addr.port(), 4317);
        assert_eq!(cfg.otlp_http_addr.port(), 4318);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(10));
    }

    #[test]
    fn apply_file_overrides() {
        let mut cfg = Config::default();
        let file: ConfigOverrides = toml::from_str(
            r#"
            api_addr = "127.0.0.1:9000"
            shutdown_grace = "3s"
            log_json = true
            "#,
        )
        .unwrap();

        cfg.apply(file, "config file").unwrap();

        assert_eq!(cfg.api_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(3));
        assert!(cfg.log_json);
        assert_eq!(cfg.otlp_http_addr.port(), 4318);
    }

    #[test]
    fn bad_values_name_their_source() {
        let mut cfg = Config::default();
        let err = cfg
            .apply(
                ConfigOverrides {
                    otlp_grpc_addr: Some("localhost".to_string()),
                    ..ConfigOverrides::default()
                },
                "environment",
            )
            .unwrap_err();
        assert!(err.to_string().contains("otlp_grpc_addr in environment"));

        let err = cfg
            .apply(
                ConfigOverrides {
                    shutdown_grace: Some("later".to_string()),
                    ..ConfigOverrides::default()
                },
                "config file",
            )
            .unwrap_err();
        assert!(err.to_string().contains("shutdown_grace"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let parsed = load_file_overrides(Path::new("/nonexistent/otelview/config.toml")).unwrap();
        assert!(parsed.is_none());
    }
}
