//! Reshapes a formatting-aware grid into per-entity records.
//!
//! Rows with a name start a new entity. Rows without a name but with a
//! subheading attach that subheading to the most recently started entity.
//! Anything before the first named row has no owner and is dropped.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::config::ColumnsConfig;

use super::types::{
  Cell, ColorName, EntityRecord, RawGrid, Rgb, SheetData, StatusObject, SubheadingEntry,
  Subheadings,
};

/// Text the sheet uses for "no data" in name and subheading cells.
const PLACEHOLDER: &str = "-";

/// Classify a background colour into the sheet's status palette.
///
/// Thresholds are fixed to match the palette used in the source sheet.
pub fn classify_color(rgb: Rgb) -> ColorName {
  let Rgb { red, green, blue } = rgb;
  if red > 0.8 && green < 0.2 && blue < 0.2 {
    ColorName::Red
  } else if green > 0.5 && red < 0.5 {
    ColorName::Green
  } else {
    ColorName::Gray
  }
}

/// Parse the compliant column. Empty, placeholder and non-numeric text is null.
pub fn parse_compliant(text: &str) -> Option<serde_json::Number> {
  let value: f64 = text.trim().parse().ok()?;
  if !value.is_finite() {
    return None;
  }
  if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
    Some(serde_json::Number::from(value as i64))
  } else {
    serde_json::Number::from_f64(value)
  }
}

fn is_blank(text: &str) -> bool {
  let text = text.trim();
  text.is_empty() || text == PLACEHOLDER
}

/// Trimmed header name to column position, built from row 0.
#[derive(Debug, Default)]
pub struct HeaderIndex {
  columns: HashMap<String, usize>,
}

/// Text and classified colour of one looked-up cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellView<'a> {
  pub value: &'a str,
  pub color: ColorName,
}

impl HeaderIndex {
  /// Duplicate header names resolve to the last column carrying them.
  pub fn from_header_row(row: &[Cell]) -> Self {
    let columns = row
      .iter()
      .enumerate()
      .filter_map(|(i, cell)| {
        cell
          .formatted_value
          .as_deref()
          .map(|name| (name.trim().to_string(), i))
      })
      .collect();
    Self { columns }
  }

  pub fn position(&self, header: &str) -> Option<usize> {
    self.columns.get(header.trim()).copied()
  }

  /// Look up a cell by header name. Missing columns read as empty Gray cells.
  pub fn cell<'a>(&self, row: &'a [Cell], header: &str) -> CellView<'a> {
    let cell = self.position(header).and_then(|i| row.get(i));
    CellView {
      value: cell
        .and_then(|c| c.formatted_value.as_deref())
        .unwrap_or(""),
      color: cell
        .and_then(|c| c.background_color)
        .map(classify_color)
        .unwrap_or(ColorName::Gray),
    }
  }
}

/// Transform a grid into entity records nested under `sheet`.
pub fn transform(grid: &RawGrid, columns: &ColumnsConfig, sheet: &str) -> SheetData {
  let mut entities: IndexMap<String, EntityRecord> = IndexMap::new();

  let Some((header_row, data_rows)) = grid.rows.split_first() else {
    return SheetData {
      sheet: sheet.to_string(),
      entities,
    };
  };
  let headers = HeaderIndex::from_header_row(header_row);

  let mut groups: IndexMap<String, IndexMap<String, SubheadingEntry>> = IndexMap::new();
  let mut current: Option<String> = None;

  for row in data_rows {
    let name = headers.cell(row, &columns.name).value;
    if !is_blank(name) {
      let name = name.trim().to_string();
      entities.insert(name.clone(), entity_from_row(&headers, row, columns));
      groups.insert(name.clone(), IndexMap::new());
      current = Some(name);
    }

    let subheading = headers.cell(row, &columns.subheading);
    if is_blank(subheading.value) {
      continue;
    }
    if let Some(owner) = current.as_ref().and_then(|name| groups.get_mut(name)) {
      owner.insert(
        subheading.value.trim().to_string(),
        SubheadingEntry {
          colour: subheading.color,
        },
      );
    }
  }

  for (name, record) in entities.iter_mut() {
    record.subheadings = match groups.swap_remove(name) {
      Some(group) if !group.is_empty() => Subheadings::Groups(group),
      _ => Subheadings::None,
    };
  }

  SheetData {
    sheet: sheet.to_string(),
    entities,
  }
}

fn entity_from_row(headers: &HeaderIndex, row: &[Cell], columns: &ColumnsConfig) -> EntityRecord {
  let mut statuses = IndexMap::new();
  for status in &columns.status {
    let cell = headers.cell(row, &status.header);
    if cell.value.is_empty() {
      continue;
    }
    statuses.insert(
      format!("status_{}", status.suffix),
      StatusObject {
        name: cell.value.to_string(),
        colour: cell.color,
      },
    );
  }

  EntityRecord {
    subheadings: Subheadings::None,
    compliant: parse_compliant(headers.cell(row, &columns.compliant).value),
    total: headers.cell(row, &columns.total).value.to_string(),
    missing: headers.cell(row, &columns.missing).value.to_string(),
    percent_compliant: headers
      .cell(row, &columns.percent_compliant)
      .value
      .to_string(),
    statuses,
  }
}
