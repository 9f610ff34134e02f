//! Data file schemas.
//!
//! A [`Schema`] describes one delimited data file of an archive: whether it is
//! the core file or an extension, which column carries the row id (core) or the
//! link key (extension), the ordered list of fields and where each field's value
//! comes from, and the text conventions of the file (encoding, terminators,
//! enclosure character, header lines).
//!
//! Schemas are produced by whatever reads the archive descriptor and are
//! immutable afterwards. Build one with [`Schema::core`] or
//! [`Schema::extension`]:
//!
//! ```
//! use dwca_engine::schema::{FieldSpec, Schema};
//!
//! # fn main() -> dwca_engine::Result<()> {
//! let schema = Schema::core("taxa.txt")
//!     .id_column(0)
//!     .field(FieldSpec::column("http://rs.tdwg.org/dwc/terms/scientificName", 1))
//!     .field(FieldSpec::default_value("http://rs.tdwg.org/dwc/terms/country", "Belgium"))
//!     .field_terminator("\t")
//!     .header_lines(1)
//!     .build()?;
//!
//! assert!(schema.is_core());
//! assert_eq!(schema.short_headers(), vec!["id", "scientificName"]);
//! # Ok(())
//! # }
//! ```
//!
//! Terminators given to the builder are literal strings. Descriptors usually
//! store them escaped (`\t`, `\n`); run them through [`unescape`] first.

use crate::error::{ArchiveError, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default enclosure character when a descriptor does not set one.
pub const DEFAULT_FIELD_ENCLOSURE: &str = "\"";

/// Whether a data file is the archive's core file or one of its extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Core,
    Extension,
}

/// One field of a data file: a term and where its value comes from.
///
/// Exactly one of `column` and `default` is set; [`SchemaBuilder::build`]
/// rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Term identifier, usually a URI such as
    /// `http://rs.tdwg.org/dwc/terms/locality`.
    pub term: String,
    /// 0-based column index in the data file.
    #[serde(default, alias = "index")]
    pub column: Option<usize>,
    /// Constant value used for every row.
    #[serde(default)]
    pub default: Option<String>,
}

impl FieldSpec {
    /// A field read from column `column`.
    pub fn column(term: impl Into<String>, column: usize) -> Self {
        Self {
            term: term.into(),
            column: Some(column),
            default: None,
        }
    }

    /// A field with the same constant value on every row.
    pub fn default_value(term: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            column: None,
            default: Some(value.into()),
        }
    }
}

/// Immutable description of one data file.
#[derive(Clone)]
pub struct Schema {
    role: FileRole,
    key_column: Option<usize>,
    fields: Vec<FieldSpec>,
    encoding: &'static Encoding,
    line_terminator: String,
    field_terminator: String,
    field_enclosure: String,
    header_lines: usize,
    location: PathBuf,
    row_type: Option<String>,
}

impl Schema {
    /// Start describing a core file located at `location` (relative to the
    /// archive working directory).
    pub fn core(location: impl Into<PathBuf>) -> SchemaBuilder {
        SchemaBuilder::new(FileRole::Core, location.into(), None)
    }

    /// Start describing an extension file whose link key is in column
    /// `link_key_column`.
    pub fn extension(location: impl Into<PathBuf>, link_key_column: usize) -> SchemaBuilder {
        SchemaBuilder::new(FileRole::Extension, location.into(), Some(link_key_column))
    }

    pub fn role(&self) -> FileRole {
        self.role
    }

    pub fn is_core(&self) -> bool {
        self.role == FileRole::Core
    }

    pub fn is_extension(&self) -> bool {
        self.role == FileRole::Extension
    }

    /// Column of the row id (core files only; may be absent).
    pub fn id_column(&self) -> Option<usize> {
        if self.is_core() { self.key_column } else { None }
    }

    /// Column of the link key (extension files only).
    pub fn link_key_column(&self) -> Option<usize> {
        if self.is_extension() {
            self.key_column
        } else {
            None
        }
    }

    /// The id or link-key column, whichever this file carries.
    pub fn key_column(&self) -> Option<usize> {
        self.key_column
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Resolved encoding (see [`SchemaBuilder::encoding`] for label rules).
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    pub fn field_terminator(&self) -> &str {
        &self.field_terminator
    }

    /// Enclosure character; empty means fields are never unquoted.
    pub fn field_enclosure(&self) -> &str {
        &self.field_enclosure
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    /// Location of the file relative to the archive working directory.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Row type URI from the descriptor, if known.
    pub fn row_type(&self) -> Option<&str> {
        self.row_type.as_deref()
    }

    /// All distinct terms of the file.
    pub fn terms(&self) -> BTreeSet<&str> {
        self.fields.iter().map(|f| f.term.as_str()).collect()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.fields.iter().any(|f| f.term == term)
    }

    /// Column names ordered by column index, suitable for a header line.
    ///
    /// Default-valued fields have no column and are left out. The id column is
    /// named `id`, the link-key column `coreid`.
    pub fn headers(&self) -> Vec<String> {
        let mut columns: BTreeMap<usize, &str> = self
            .fields
            .iter()
            .filter_map(|f| f.column.map(|c| (c, f.term.as_str())))
            .collect();
        if let Some(c) = self.key_column {
            columns.insert(c, if self.is_core() { "id" } else { "coreid" });
        }
        columns.into_values().map(str::to_string).collect()
    }

    /// [`Schema::headers`] with every term shortened to its last path segment.
    pub fn short_headers(&self) -> Vec<String> {
        self.headers()
            .iter()
            .map(|h| shorten_term(h).to_string())
            .collect()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("role", &self.role)
            .field("location", &self.location)
            .field("key_column", &self.key_column)
            .field("fields", &self.fields.len())
            .field("encoding", &self.encoding.name())
            .field("line_terminator", &self.line_terminator)
            .field("field_terminator", &self.field_terminator)
            .field("field_enclosure", &self.field_enclosure)
            .field("header_lines", &self.header_lines)
            .finish()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    role: FileRole,
    key_column: Option<usize>,
    fields: Vec<FieldSpec>,
    encoding: String,
    line_terminator: String,
    field_terminator: String,
    field_enclosure: String,
    header_lines: usize,
    location: PathBuf,
    row_type: Option<String>,
}

impl SchemaBuilder {
    fn new(role: FileRole, location: PathBuf, key_column: Option<usize>) -> Self {
        Self {
            role,
            key_column,
            fields: Vec::new(),
            encoding: "utf-8".to_string(),
            line_terminator: "\n".to_string(),
            field_terminator: ",".to_string(),
            field_enclosure: DEFAULT_FIELD_ENCLOSURE.to_string(),
            header_lines: 0,
            location,
            row_type: None,
        }
    }

    /// Set the id column of a core file.
    #[must_use]
    pub fn id_column(mut self, column: usize) -> Self {
        self.key_column = Some(column);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Encoding label, e.g. `utf-8`, `latin1`, `utf-16le`.
    ///
    /// Labels resolve by WHATWG rules: `latin1` and `iso-8859-1` select
    /// windows-1252, which decodes bytes `0x80..=0x9F` as printable
    /// characters (`0x80` is `€`) instead of C1 control codes. `utf-16`
    /// selects little-endian.
    #[must_use]
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    #[must_use]
    pub fn line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    #[must_use]
    pub fn field_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.field_terminator = terminator.into();
        self
    }

    /// Enclosure character; pass `""` to disable enclosure handling.
    #[must_use]
    pub fn field_enclosure(mut self, enclosure: impl Into<String>) -> Self {
        self.field_enclosure = enclosure.into();
        self
    }

    #[must_use]
    pub fn header_lines(mut self, lines: usize) -> Self {
        self.header_lines = lines;
        self
    }

    #[must_use]
    pub fn row_type(mut self, row_type: impl Into<String>) -> Self {
        self.row_type = Some(row_type.into());
        self
    }

    /// Validate and produce the schema.
    ///
    /// # Errors
    /// [`ArchiveError::InvalidSchema`] when a field has both or neither of a
    /// column and a default, when an extension has no link-key column, when a
    /// terminator is empty, or when the enclosure cannot be honored with the
    /// given field terminator. [`ArchiveError::UnknownEncoding`] for an
    /// unrecognized encoding label.
    pub fn build(self) -> Result<Schema> {
        let encoding = Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| ArchiveError::UnknownEncoding(self.encoding.clone()))?;

        for f in &self.fields {
            match (&f.column, &f.default) {
                (Some(_), Some(_)) => {
                    return Err(ArchiveError::InvalidSchema(format!(
                        "field {} sets both a column and a default",
                        f.term
                    )));
                }
                (None, None) => {
                    return Err(ArchiveError::InvalidSchema(format!(
                        "field {} sets neither a column nor a default",
                        f.term
                    )));
                }
                _ => {}
            }
        }

        if self.role == FileRole::Extension && self.key_column.is_none() {
            return Err(ArchiveError::InvalidSchema(format!(
                "extension file {} has no link-key column",
                self.location.display()
            )));
        }
        if self.line_terminator.is_empty() {
            return Err(ArchiveError::InvalidSchema("empty line terminator".into()));
        }
        if self.field_terminator.is_empty() {
            return Err(ArchiveError::InvalidSchema("empty field terminator".into()));
        }
        if !self.field_enclosure.is_empty() {
            if !is_single_ascii(&self.field_enclosure) {
                return Err(ArchiveError::InvalidSchema(format!(
                    "field enclosure {:?} must be a single ASCII character",
                    self.field_enclosure
                )));
            }
            if !is_single_ascii(&self.field_terminator) {
                return Err(ArchiveError::InvalidSchema(format!(
                    "field terminator {:?} must be a single ASCII character when fields are enclosed",
                    self.field_terminator
                )));
            }
        }

        Ok(Schema {
            role: self.role,
            key_column: self.key_column,
            fields: self.fields,
            encoding,
            line_terminator: self.line_terminator,
            field_terminator: self.field_terminator,
            field_enclosure: self.field_enclosure,
            header_lines: self.header_lines,
            location: self.location,
            row_type: self.row_type,
        })
    }
}

fn is_single_ascii(s: &str) -> bool {
    s.len() == 1 && s.is_ascii()
}

/// Last path segment of a term URI (`.../terms/locality` -> `locality`).
pub fn shorten_term(term: &str) -> &str {
    term.rsplit('/').next().unwrap_or(term)
}

/// Turn a descriptor-style escaped literal into the string it denotes.
///
/// Recognizes `\t`, `\n`, `\r`, `\0`, `\\`, `\"`, `\'` and `\uXXXX`. Any other
/// backslash sequence is kept as written.
///
/// ```
/// use dwca_engine::schema::unescape;
/// assert_eq!(unescape(r"\t"), "\t");
/// assert_eq!(unescape(r"\r\n"), "\r\n");
/// assert_eq!(unescape(","), ",");
/// ```
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('0') => {
                chars.next();
                out.push('\0');
            }
            Some(q @ ('\\' | '"' | '\'')) => {
                chars.next();
                out.push(q);
            }
            Some('u') => {
                let hex: String = chars.clone().skip(1).take(4).collect();
                let valid = hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit());
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if valid => {
                        for _ in 0..5 {
                            chars.next();
                        }
                        out.push(decoded);
                    }
                    _ => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_handles_control_characters() {
        assert_eq!(unescape(r"\t"), "\t");
        assert_eq!(unescape(r"\n"), "\n");
        assert_eq!(unescape(r"a\\b"), "a\\b");
        assert_eq!(unescape(r"\u0009"), "\t");
        assert_eq!(unescape(r"\x"), "\\x");
        assert_eq!(unescape(r"\u00"), "\\u00");
        assert_eq!(unescape("|"), "|");
    }

    #[test]
    fn shorten_term_takes_last_segment() {
        assert_eq!(shorten_term("http://rs.tdwg.org/dwc/terms/locality"), "locality");
        assert_eq!(shorten_term("locality"), "locality");
    }

    #[test]
    fn headers_include_key_columns() -> Result<()> {
        let schema = Schema::extension("vernacular.txt", 0)
            .field(FieldSpec::column("http://rs.gbif.org/terms/1.0/vernacularName", 1))
            .field(FieldSpec::default_value("http://purl.org/dc/terms/language", "en"))
            .build()?;
        assert_eq!(schema.headers(), vec!["coreid", "http://rs.gbif.org/terms/1.0/vernacularName"]);
        assert_eq!(schema.link_key_column(), Some(0));
        assert_eq!(schema.id_column(), None);
        Ok(())
    }
}
