//! Daemon configuration: a TOML file on disk, overlaid by CLI flags (A3).

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Razer Chroma RGB control daemon.
#[derive(Debug, Parser)]
#[command(name = "razerd", version, about)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "RAZERD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `log_level` from the config file.
    #[arg(long, env = "RAZERD_LOG")]
    pub log_level: Option<String>,

    /// Runs in the foreground with verbose logging and fake devices, rather
    /// than touching real hardware (A3, mirrors `dev_mode`).
    #[arg(long)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    /// Directory of `*.yaml` device descriptors (§4.3).
    pub config_dir: PathBuf,
    /// Cap on how fast a client can poll `get_current_frame` (A2).
    pub live_preview_fps: u8,
    pub dev_mode: bool,
    /// USB vendor id hotplug is filtered to (§4.12).
    pub vendor_id: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            config_dir: PathBuf::from("/etc/razerd/devices"),
            live_preview_fps: 10,
            dev_mode: false,
            vendor_id: 0x1532,
        }
    }
}

impl Config {
    /// Loads the TOML file at `path`, falling back to defaults if it is
    /// absent or unparsable, then overlays any CLI flags the caller passed.
    pub fn load(path: Option<&std::path::Path>, cli: &Cli) -> Self {
        let mut config = match path.map(std::fs::read_to_string) {
            Some(Ok(content)) => toml::from_str(&content).unwrap_or_default(),
            _ => Self::default(),
        };
        if let Some(level) = &cli.log_level {
            config.log_level = level.clone();
        }
        if cli.dev_mode {
            config.dev_mode = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cli = Cli { config: None, log_level: None, dev_mode: false };
        let config = Config::load(None, &cli);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.vendor_id, 0x1532);
    }

    #[test]
    fn cli_log_level_overrides_default() {
        let cli = Cli { config: None, log_level: Some("trace".to_string()), dev_mode: false };
        let config = Config::load(None, &cli);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("razerd.toml");
        std::fs::write(&path, "log_level = \"warn\"\nlive_preview_fps = 5\n").unwrap();
        let cli = Cli { config: None, log_level: None, dev_mode: false };
        let config = Config::load(Some(&path), &cli);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.live_preview_fps, 5);
    }
}
