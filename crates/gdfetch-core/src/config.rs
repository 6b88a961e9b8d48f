use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default download endpoint; `id` and `confirm` are appended as query parameters.
pub const DEFAULT_ENDPOINT: &str = "https://drive.google.com/uc?export=download";

/// Cookie name prefix the host uses to carry the confirmation token.
pub const DEFAULT_WARNING_COOKIE_PREFIX: &str = "download_warning";

/// Body chunk size in bytes; also the threshold above which progress is reported.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Global configuration loaded from `~/.config/gdfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdfetchConfig {
    /// Download endpoint URL (may already carry query parameters).
    pub endpoint: String,
    /// Response cookies whose name starts with this prefix carry the confirmation token.
    pub warning_cookie_prefix: String,
    /// Maximum bytes per body chunk handed to the writer.
    pub chunk_size: usize,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Hard wall-clock limit per request in seconds.
    pub timeout_secs: u64,
    /// Maximum redirects followed per request.
    pub max_redirections: u32,
}

impl Default for GdfetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            warning_cookie_prefix: DEFAULT_WARNING_COOKIE_PREFIX.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
            max_redirections: 10,
        }
    }
}

impl GdfetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gdfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GdfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GdfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: GdfetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = GdfetchConfig::default();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.warning_cookie_prefix, "download_warning");
        assert_eq!(cfg.chunk_size, 32768);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = GdfetchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: GdfetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            endpoint = "http://127.0.0.1:8080/uc"
            chunk_size = 4096
        "#;
        let cfg: GdfetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.endpoint, "http://127.0.0.1:8080/uc");
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.warning_cookie_prefix, DEFAULT_WARNING_COOKIE_PREFIX);
        assert_eq!(cfg.timeout_secs, 3600);
    }
}
