//! Serde-deserializable types matching Sheets API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use serde_json::Value;

use super::types::{Cell, Rgb};

// ============================================================================
// values endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiValueRange {
  #[serde(default)]
  pub range: String,
  #[serde(default)]
  pub values: Vec<Vec<Value>>,
}

/// Render a scalar from the values matrix as cell text.
pub fn value_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

// ============================================================================
// grid (includeGridData) endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSpreadsheet {
  #[serde(default)]
  pub sheets: Vec<ApiSheet>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSheet {
  pub properties: Option<ApiSheetProperties>,
  #[serde(default)]
  pub data: Vec<ApiGridData>,
}

impl ApiSheet {
  pub fn title(&self) -> Option<&str> {
    self.properties.as_ref().and_then(|p| p.title.as_deref())
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiSheetProperties {
  pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiGridData {
  #[serde(rename = "rowData", default)]
  pub row_data: Vec<ApiRowData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiRowData {
  #[serde(default)]
  pub values: Vec<ApiCellData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiCellData {
  #[serde(rename = "formattedValue")]
  pub formatted_value: Option<String>,
  #[serde(rename = "effectiveFormat")]
  pub effective_format: Option<ApiCellFormat>,
  #[serde(rename = "userEnteredFormat")]
  pub user_entered_format: Option<ApiCellFormat>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCellFormat {
  #[serde(rename = "backgroundColor")]
  pub background_color: Option<ApiColor>,
}

/// Channels omitted by the API are zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiColor {
  #[serde(default)]
  pub red: f64,
  #[serde(default)]
  pub green: f64,
  #[serde(default)]
  pub blue: f64,
}

impl From<ApiColor> for Rgb {
  fn from(color: ApiColor) -> Self {
    Rgb {
      red: color.red,
      green: color.green,
      blue: color.blue,
    }
  }
}

impl From<ApiCellData> for Cell {
  fn from(cell: ApiCellData) -> Self {
    let background = |format: Option<ApiCellFormat>| format.and_then(|f| f.background_color);
    let background_color = background(cell.effective_format)
      .or_else(|| background(cell.user_entered_format))
      .map(Rgb::from);

    Cell {
      formatted_value: cell.formatted_value,
      background_color,
    }
  }
}
