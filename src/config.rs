use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use weft_scheduler::SchedulerConfig;

/// Filter used when neither `RUST_LOG` nor the config file sets one.
pub const DEFAULT_LOG_FILTER: &str = "weft=info";

/// Contents of the optional CLI config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// `tracing` filter directive, e.g. `"weft=debug"`.
  pub log_filter: Option<String>,
  pub scheduler: SchedulerConfig,
}

impl CliConfig {
  /// Load from `explicit` if given (it must exist), else from
  /// `~/.weft/config.json` if that exists, else defaults.
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    let path = match explicit {
      Some(path) => path.to_path_buf(),
      None => match default_path() {
        Some(path) if path.exists() => path,
        _ => return Ok(Self::default()),
      },
    };

    let content = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display()))
  }

  pub fn log_filter(&self) -> &str {
    self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
  }
}

fn default_path() -> Option<PathBuf> {
  dirs::home_dir().map(|home| home.join(".weft").join("config.json"))
}
