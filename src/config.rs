use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::sheets::parser::SheetFormat;

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub sheet: SheetConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Sheets API key, only ever read from the environment
  #[serde(skip)]
  pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
  #[serde(default)]
  pub spreadsheet_id: String,
  /// Tab name, also used as the top-level key of the response
  #[serde(default)]
  pub tab: String,
  #[serde(default)]
  pub format: SheetFormat,
  #[serde(default = "default_api_base")]
  pub api_base: String,
  #[serde(default)]
  pub columns: ColumnsConfig,
}

impl Default for SheetConfig {
  fn default() -> Self {
    Self {
      spreadsheet_id: String::new(),
      tab: String::new(),
      format: SheetFormat::default(),
      api_base: default_api_base(),
      columns: ColumnsConfig::default(),
    }
  }
}

fn default_api_base() -> String {
  DEFAULT_API_BASE.to_string()
}

/// Header names of the columns the transformer reads
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
  pub name: String,
  pub subheading: String,
  pub compliant: String,
  pub total: String,
  pub missing: String,
  pub percent_compliant: String,
  pub status: Vec<StatusColumn>,
}

impl Default for ColumnsConfig {
  fn default() -> Self {
    Self {
      name: "Service".to_string(),
      subheading: "Subheading".to_string(),
      compliant: "Compliant".to_string(),
      total: "Total".to_string(),
      missing: "Mising".to_string(),
      percent_compliant: "% Compliant".to_string(),
      status: Vec::new(),
    }
  }
}

/// A status column, emitted as `status_<suffix>` when the cell has text
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StatusColumn {
  pub header: String,
  pub suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host: IpAddr,
  pub port: u16,
  pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
      port: 3000,
      rate_limit: RateLimitConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
  /// Requests allowed per client address within one window
  pub max_requests: u32,
  pub window_secs: u64,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      max_requests: 100,
      window_secs: 60,
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_secs: 30 }
  }
}

impl Config {
  /// Load configuration from file and environment.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sheet-relay.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sheet-relay/config.yaml
  ///
  /// With no file, configuration comes from the environment alone. Missing
  /// required settings are an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sheet-relay.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sheet-relay").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Apply environment overrides.
  ///
  /// Reads SHEET_RELAY_SPREADSHEET_ID (or GOOGLE_SHEET_ID), SHEET_RELAY_TAB
  /// (or SHEET_NAME), PORT, and the API key from SHEET_RELAY_API_KEY (or
  /// GOOGLE_API_KEY).
  pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    let first = |keys: &[&str]| {
      keys
        .iter()
        .copied()
        .find_map(|k| lookup(k).filter(|v| !v.is_empty()))
    };

    if let Some(id) = first(&["SHEET_RELAY_SPREADSHEET_ID", "GOOGLE_SHEET_ID"]) {
      self.sheet.spreadsheet_id = id;
    }
    if let Some(tab) = first(&["SHEET_RELAY_TAB", "SHEET_NAME"]) {
      self.sheet.tab = tab;
    }
    if let Some(port) = first(&["PORT"]) {
      self.server.port = port
        .parse()
        .map_err(|e| eyre!("Invalid PORT '{}': {}", port, e))?;
    }
    if let Some(key) = first(&["SHEET_RELAY_API_KEY", "GOOGLE_API_KEY"]) {
      self.api_key = key;
    }

    Ok(())
  }

  /// Reject configurations the server cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.sheet.spreadsheet_id.trim().is_empty() {
      return Err(eyre!(
        "Spreadsheet id not configured. Set sheet.spreadsheet_id or SHEET_RELAY_SPREADSHEET_ID."
      ));
    }
    if self.sheet.tab.trim().is_empty() {
      return Err(eyre!(
        "Sheet tab not configured. Set sheet.tab or SHEET_RELAY_TAB."
      ));
    }
    if self.api_key.is_empty() {
      return Err(eyre!(
        "Sheets API key not found. Set SHEET_RELAY_API_KEY or GOOGLE_API_KEY environment variable."
      ));
    }
    if self.server.rate_limit.window_secs == 0 {
      return Err(eyre!("server.rate_limit.window_secs must be greater than zero"));
    }
    Ok(())
  }
}
