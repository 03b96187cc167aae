use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;

use super::parser::GridParser;
use super::types::RawGrid;

/// Sheets API client wrapper
#[derive(Clone)]
pub struct SheetsClient {
  http: reqwest::Client,
  api_base: Url,
  api_key: String,
  spreadsheet_id: String,
  tab: String,
  parser: Arc<dyn GridParser>,
}

impl SheetsClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_base = Url::parse(&config.sheet.api_base)
      .map_err(|e| eyre!("Invalid Sheets API base URL {}: {}", config.sheet.api_base, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      api_base,
      api_key: config.api_key.clone(),
      spreadsheet_id: config.sheet.spreadsheet_id.clone(),
      tab: config.sheet.tab.clone(),
      parser: config.sheet.format.parser(),
    })
  }

  /// Configured tab name
  pub fn tab(&self) -> &str {
    &self.tab
  }

  /// Fetch the configured tab and decode it into a grid.
  pub async fn fetch_grid(&self) -> Result<RawGrid> {
    let mut url = self
      .parser
      .request_url(&self.api_base, &self.spreadsheet_id, &self.tab)?;
    debug!(url = %url, "requesting sheet");
    url.query_pairs_mut().append_pair("key", &self.api_key);

    let start = Instant::now();
    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach Sheets API: {}", e.without_url()))?;

    let status = response.status();
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read Sheets API response: {}", e.without_url()))?;

    if !status.is_success() {
      return Err(eyre!(
        "Sheets API returned {}: {}",
        status,
        String::from_utf8_lossy(&body)
      ));
    }

    let grid = self.parser.parse(&body, &self.tab)?;
    if grid.is_empty() {
      warn!(tab = %self.tab, "sheet returned no rows");
    }
    info!(
      status = status.as_u16(),
      rows = grid.rows.len(),
      elapsed = ?start.elapsed(),
      "fetched sheet"
    );

    Ok(grid)
  }
}
