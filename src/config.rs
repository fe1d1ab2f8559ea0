use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, info};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub device: Option<PathBuf>,
    pub zoom: Option<u32>,
    pub min_zoom: Option<u32>,
    pub max_zoom: Option<u32>,
    pub rotate: Option<i32>,
    pub window_size: Option<usize>,
    pub page_steps: Option<u32>,
    /// Key rebindings: key spec ("J", "C-f", "space") -> command name.
    pub keys: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub device: Option<PathBuf>,
    pub zoom: u32,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub rotate: i32,
    pub window_size: usize,
    pub page_steps: u32,
    pub keys: HashMap<String, String>,
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, zoom: Option<u32>, rotate: Option<i32>) {
        if let Some(v) = zoom {
            debug!("config: CLI override zoom={v}");
            self.zoom = zoom;
        }
        if let Some(v) = rotate {
            debug!("config: CLI override rotate={v}");
            self.rotate = rotate;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields. The zoom
    /// bounds must be sane (session math divides by zoom), so `min_zoom`
    /// floors at 1 and the initial zoom is clamped between the bounds.
    pub fn resolve(self) -> Config {
        let min_zoom = self.min_zoom.unwrap_or(10).max(1);
        let max_zoom = self.max_zoom.unwrap_or(100).max(min_zoom);
        let config = Config {
            device: self.device,
            zoom: self.zoom.unwrap_or(15).clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            rotate: self.rotate.unwrap_or(0),
            window_size: self.window_size.unwrap_or(2).max(1),
            page_steps: self.page_steps.unwrap_or(8).max(1),
            keys: self.keys,
        };
        info!(
            "config: resolved zoom={}, min_zoom={}, max_zoom={}, rotate={}, \
             window_size={}, page_steps={}, {} key override(s)",
            config.zoom,
            config.min_zoom,
            config.max_zoom,
            config.rotate,
            config.window_size,
            config.page_steps,
            config.keys.len(),
        );
        config
    }
}

/// Resolve the XDG config path for fbview.
fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_dir.join("fbview").join("config.toml"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}
