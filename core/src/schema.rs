//! The project's field schema, cached once at construction.
//!
//! # Design
//! The metadata export carries many keys per field; the client keeps four of
//! them (form, variable, type, label) as an ordered table. The table has no
//! mutating API, so the borrow handed out by `ProjectClient::schema` is a
//! read-only view and a clone is fully detached from the client.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// One row of the schema table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaEntry {
    pub form_name: String,
    pub field_name: String,
    pub field_type: String,
    pub field_label: String,
}

impl SchemaEntry {
    /// The four cells in `Schema::COLUMNS` order.
    pub fn as_row(&self) -> [&str; 4] {
        [
            &self.form_name,
            &self.field_name,
            &self.field_type,
            &self.field_label,
        ]
    }
}

/// Ordered snapshot of the project's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
}

impl Schema {
    /// Column names, in row-tuple order.
    pub const COLUMNS: [&'static str; 4] = ["form_name", "field_name", "field_type", "field_label"];

    /// Build the table from a metadata export body (a JSON array of objects).
    pub fn from_metadata_json(body: &[u8]) -> Result<Self> {
        let rows: Vec<Map<String, Value>> = serde_json::from_slice(body)?;
        let entries = rows
            .iter()
            .enumerate()
            .map(|(row, fields)| {
                Ok(SchemaEntry {
                    form_name: take(fields, row, "form_name")?,
                    field_name: take(fields, row, "field_name")?,
                    field_type: take(fields, row, "field_type")?,
                    field_label: take(fields, row, "field_label")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Detach the rows for caller-side editing.
    pub fn into_entries(self) -> Vec<SchemaEntry> {
        self.entries
    }

    pub fn get(&self, row: usize) -> Option<&SchemaEntry> {
        self.entries.get(row)
    }

    /// All values of one column, or `None` for an unknown column name.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = Self::COLUMNS.iter().position(|c| *c == name)?;
        Some(self.entries.iter().map(|e| e.as_row()[index]).collect())
    }

    /// Row for a variable name.
    pub fn field(&self, field_name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.field_name == field_name)
    }

    /// Distinct form names in first-seen order.
    pub fn forms(&self) -> Vec<&str> {
        let mut forms: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !forms.contains(&entry.form_name.as_str()) {
                forms.push(&entry.form_name);
            }
        }
        forms
    }

    pub fn fields_in_form(&self, form_name: &str) -> Vec<&SchemaEntry> {
        self.entries
            .iter()
            .filter(|e| e.form_name == form_name)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a SchemaEntry;
    type IntoIter = std::slice::Iter<'a, SchemaEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Only an absent key is a parse failure; present values are rendered as text.
fn take(fields: &Map<String, Value>, row: usize, key: &'static str) -> Result<String> {
    match fields.get(key) {
        None => Err(ApiError::SchemaParse { row, key }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
    }
}
