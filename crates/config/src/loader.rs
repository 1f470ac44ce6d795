//! Config discovery and parsing.
//!
//! Hermod reads one config document describing the agents, model defaults,
//! broadcast groups, and session settings. There is no include mechanism
//! and no layering; the first file found wins.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env::expand_env, schema::HermodConfig};

/// Supported config formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    const EXTENSIONS: &[(&str, Self)] = &[
        ("toml", Self::Toml),
        ("yaml", Self::Yaml),
        ("yml", Self::Yaml),
        ("json", Self::Json),
    ];

    fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, format)| *format)
            .ok_or_else(|| anyhow::anyhow!("unsupported config format: {}", path.display()))
    }

    fn parse(self, raw: &str) -> anyhow::Result<HermodConfig> {
        let config = match self {
            Self::Toml => toml::from_str(raw)?,
            Self::Yaml => serde_yaml::from_str(raw)?,
            Self::Json => serde_json::from_str(raw)?,
        };
        Ok(config)
    }
}

/// Load config from an explicit path, expanding `${VAR}` placeholders.
pub fn load_config(path: &Path) -> anyhow::Result<HermodConfig> {
    let format = ConfigFormat::from_path(path)?;
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    format.parse(&expand_env(&raw))
}

/// Discover and load config, falling back to defaults.
///
/// `HERMOD_CONFIG` pins an exact file and skips the search; otherwise each
/// known extension is tried as `hermod.<ext>` in the working directory, then
/// in the user config directory. A file that exists but fails to load is
/// reported and defaults are used, so a typo never takes the gateway down.
pub fn discover_and_load() -> HermodConfig {
    for path in search_paths() {
        if !path.exists() {
            continue;
        }
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(config) => return config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                return HermodConfig::default();
            },
        }
    }
    debug!("no config file found, using defaults");
    HermodConfig::default()
}

fn search_paths() -> Vec<PathBuf> {
    if let Ok(pinned) = std::env::var("HERMOD_CONFIG") {
        return vec![PathBuf::from(pinned)];
    }

    let mut paths: Vec<PathBuf> = ConfigFormat::EXTENSIONS
        .iter()
        .map(|(ext, _)| PathBuf::from(format!("hermod.{ext}")))
        .collect();
    if let Some(dir) = config_dir() {
        paths.extend(
            ConfigFormat::EXTENSIONS
                .iter()
                .map(|(ext, _)| dir.join(format!("hermod.{ext}"))),
        );
    }
    paths
}

/// The user-global config directory (`~/.config/hermod/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hermod").map(|d| d.config_dir().to_path_buf())
}
