//! JSON archive layouts.
//!
//! An [`ArchiveLayout`] is the configuration document that tells the engine
//! which data files make up an extracted archive and how each one is laid
//! out. It is what a descriptor parser hands over, in serializable form:
//!
//! ```json
//! {
//!   "core": {
//!     "location": "taxa.txt",
//!     "row_type": "http://rs.tdwg.org/dwc/terms/Taxon",
//!     "id_column": 0,
//!     "field_terminator": "\\t",
//!     "header_lines": 1,
//!     "fields": [
//!       { "term": "http://rs.tdwg.org/dwc/terms/scientificName", "column": 1 },
//!       { "term": "http://rs.tdwg.org/dwc/terms/country", "default": "Belgium" }
//!     ]
//!   },
//!   "extensions": [
//!     { "location": "vernacular.txt", "link_key_column": 0, "fields": [] }
//!   ]
//! }
//! ```
//!
//! Terminators are stored escaped and unescaped on conversion. Defaults:
//! encoding `utf-8`, line terminator `\n`, field terminator `,`, no header
//! lines, enclosure `"`. An explicit empty `field_enclosure` disables
//! enclosure handling.

use crate::error::{ArchiveError, Result};
use crate::schema::{DEFAULT_FIELD_ENCLOSURE, FieldSpec, FileRole, Schema, unescape};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Layout of a whole archive: one core file and its extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLayout {
    pub core: FileLayout,
    #[serde(default)]
    pub extensions: Vec<FileLayout>,
}

/// Layout of one data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLayout {
    pub location: PathBuf,
    #[serde(default)]
    pub row_type: Option<String>,
    #[serde(default)]
    pub id_column: Option<usize>,
    #[serde(default, alias = "coreid_column")]
    pub link_key_column: Option<usize>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    #[serde(default = "default_field_terminator")]
    pub field_terminator: String,
    #[serde(default)]
    pub field_enclosure: Option<String>,
    #[serde(default)]
    pub header_lines: usize,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_line_terminator() -> String {
    "\\n".to_string()
}

fn default_field_terminator() -> String {
    ",".to_string()
}

impl ArchiveLayout {
    /// Parse a layout document.
    ///
    /// # Errors
    /// [`ArchiveError::Layout`] when the JSON is malformed or does not match
    /// the layout shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ArchiveError::Layout(e.to_string()))
    }

    /// Read and parse a layout document from `path`.
    ///
    /// # Errors
    /// [`ArchiveError::Io`] when the file cannot be read, otherwise see
    /// [`ArchiveLayout::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Serialize back to pretty JSON.
    ///
    /// # Errors
    /// [`ArchiveError::Layout`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ArchiveError::Layout(e.to_string()))
    }

    /// # Errors
    /// See [`FileLayout::to_schema`].
    pub fn core_schema(&self) -> Result<Schema> {
        self.core.to_schema(FileRole::Core)
    }

    /// # Errors
    /// See [`FileLayout::to_schema`].
    pub fn extension_schemas(&self) -> Result<Vec<Schema>> {
        self.extensions
            .iter()
            .map(|e| e.to_schema(FileRole::Extension))
            .collect()
    }
}

impl FileLayout {
    /// Convert to a validated [`Schema`] playing `role`.
    ///
    /// # Errors
    /// [`ArchiveError::Layout`] when an extension has no link-key column;
    /// schema validation errors otherwise.
    pub fn to_schema(&self, role: FileRole) -> Result<Schema> {
        let builder = match role {
            FileRole::Core => {
                let builder = Schema::core(&self.location);
                match self.id_column {
                    Some(c) => builder.id_column(c),
                    None => builder,
                }
            }
            FileRole::Extension => {
                let column = self.link_key_column.ok_or_else(|| {
                    ArchiveError::Layout(format!(
                        "extension {} has no link_key_column",
                        self.location.display()
                    ))
                })?;
                Schema::extension(&self.location, column)
            }
        };
        let enclosure = self
            .field_enclosure
            .as_deref()
            .map_or_else(|| DEFAULT_FIELD_ENCLOSURE.to_string(), unescape);

        let builder = builder
            .fields(self.fields.iter().cloned())
            .encoding(&self.encoding)
            .line_terminator(unescape(&self.line_terminator))
            .field_terminator(unescape(&self.field_terminator))
            .field_enclosure(enclosure)
            .header_lines(self.header_lines);
        let builder = match &self.row_type {
            Some(row_type) => builder.row_type(row_type),
            None => builder,
        };
        builder.build()
    }
}
