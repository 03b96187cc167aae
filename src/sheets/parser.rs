//! Upstream response shapes.
//!
//! The values endpoint and the grid endpoint return incompatible bodies. Each
//! gets a [`GridParser`] that knows its request URL and how to turn the body
//! into a [`RawGrid`]; everything downstream of the grid is shared.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{value_text, ApiSpreadsheet, ApiValueRange};
use super::types::{Cell, RawGrid};

/// Which upstream endpoint to read
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
  /// Cells with formatted text and background colour
  #[default]
  Grid,
  /// Plain matrix of values, no formatting
  Values,
}

impl SheetFormat {
  pub fn parser(self) -> Arc<dyn GridParser> {
    match self {
      SheetFormat::Grid => Arc::new(GridFormatParser),
      SheetFormat::Values => Arc::new(FlatValuesParser),
    }
  }
}

pub trait GridParser: Send + Sync {
  /// Request URL for a tab, without credentials.
  fn request_url(&self, base: &Url, spreadsheet_id: &str, tab: &str) -> Result<Url>;

  /// Decode a response body. A body of the wrong shape is an error; a body
  /// with no rows for the tab is an empty grid.
  fn parse(&self, body: &[u8], tab: &str) -> Result<RawGrid>;
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Sheets API base URL cannot be a base: {}", base))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

/// Sheet title from an A1 range such as `'Q3 Report'!A1:F20`.
fn sheet_title(tab: &str) -> &str {
  let title = tab.split('!').next().unwrap_or(tab).trim();
  title
    .strip_prefix('\'')
    .and_then(|t| t.strip_suffix('\''))
    .unwrap_or(title)
}

/// Reads `spreadsheets/{id}/values/{range}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatValuesParser;

impl GridParser for FlatValuesParser {
  fn request_url(&self, base: &Url, spreadsheet_id: &str, tab: &str) -> Result<Url> {
    endpoint(base, &["spreadsheets", spreadsheet_id, "values", tab])
  }

  fn parse(&self, body: &[u8], _tab: &str) -> Result<RawGrid> {
    let response: ApiValueRange = serde_json::from_slice(body)
      .map_err(|e| eyre!("Unexpected values response: {}", e))?;
    debug!(range = %response.range, rows = response.values.len(), "decoded values range");

    let rows = response
      .values
      .iter()
      .map(|row| row.iter().map(|v| Cell::text(value_text(v))).collect())
      .collect();
    Ok(RawGrid::new(rows))
  }
}

/// Reads `spreadsheets/{id}?includeGridData=true` restricted to one tab.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridFormatParser;

const GRID_FIELDS: &str = "sheets(properties.title,data.rowData.values(formattedValue,\
effectiveFormat.backgroundColor,userEnteredFormat.backgroundColor))";

impl GridParser for GridFormatParser {
  fn request_url(&self, base: &Url, spreadsheet_id: &str, tab: &str) -> Result<Url> {
    let mut url = endpoint(base, &["spreadsheets", spreadsheet_id])?;
    url
      .query_pairs_mut()
      .append_pair("ranges", tab)
      .append_pair("includeGridData", "true")
      .append_pair("fields", GRID_FIELDS);
    Ok(url)
  }

  fn parse(&self, body: &[u8], tab: &str) -> Result<RawGrid> {
    let response: ApiSpreadsheet = serde_json::from_slice(body)
      .map_err(|e| eyre!("Unexpected spreadsheet response: {}", e))?;

    let title = sheet_title(tab);
    let Some(sheet) = response
      .sheets
      .into_iter()
      .find(|sheet| sheet.title() == Some(title))
    else {
      warn!(tab = title, "no sheet with this title in response");
      return Ok(RawGrid::default());
    };

    let rows = sheet
      .data
      .into_iter()
      .flat_map(|grid| grid.row_data)
      .map(|row| row.values.into_iter().map(Cell::from).collect())
      .collect();
    Ok(RawGrid::new(rows))
  }
}
