use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Background colour channels, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rgb {
  pub red: f64,
  pub green: f64,
  pub blue: f64,
}

/// A single grid cell as returned by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
  pub formatted_value: Option<String>,
  pub background_color: Option<Rgb>,
}

impl Cell {
  pub fn text(value: impl Into<String>) -> Self {
    Self {
      formatted_value: Some(value.into()),
      background_color: None,
    }
  }

  #[cfg(test)]
  pub fn with_background(mut self, color: Rgb) -> Self {
    self.background_color = Some(color);
    self
  }
}

/// Header row plus data rows. Row 0 holds the header names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
  pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
  pub fn new(rows: Vec<Vec<Cell>>) -> Self {
    Self { rows }
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

/// Status colour classified from a cell background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorName {
  Red,
  Green,
  Gray,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubheadingEntry {
  pub colour: ColorName,
}

/// Subgroups attached to an entity.
///
/// Serializes as a map when any subheading row was attached, otherwise as the
/// number `0`.
#[derive(Debug, Clone, PartialEq)]
pub enum Subheadings {
  Groups(IndexMap<String, SubheadingEntry>),
  None,
}

impl Serialize for Subheadings {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Subheadings::Groups(groups) => groups.serialize(serializer),
      Subheadings::None => serializer.serialize_u8(0),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusObject {
  pub name: String,
  pub colour: ColorName,
}

/// One entity reshaped from its name row and trailing subheading rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
  #[serde(rename = "Subheading")]
  pub subheadings: Subheadings,
  #[serde(rename = "Compliant")]
  pub compliant: Option<serde_json::Number>,
  #[serde(rename = "Total")]
  pub total: String,
  #[serde(rename = "Mising")]
  pub missing: String,
  #[serde(rename = "%Compliant")]
  pub percent_compliant: String,
  /// Keyed `status_<suffix>`
  #[serde(flatten)]
  pub statuses: IndexMap<String, StatusObject>,
}

/// Transformed sheet: entity records keyed by name, nested under the sheet name.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
  pub sheet: String,
  pub entities: IndexMap<String, EntityRecord>,
}

impl Serialize for SheetData {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(&self.sheet, &self.entities)?;
    map.end()
  }
}
