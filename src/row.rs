//! Rows materialized from raw data file lines.
//!
//! [`Row::from_line`] is a pure function of a raw line, its position and the
//! file's [`Schema`]:
//!
//! 1. the schema's line terminator is stripped once from the end of the line;
//! 2. the rest is split on the field terminator. With an enclosure character
//!    configured, splitting is quote-aware (terminators inside enclosed fields
//!    do not split, and one enclosure character is removed from each end
//!    of a field, paired or not). A line break outside an enclosure is an
//!    error rather than a record boundary. With an empty
//!    enclosure the split is literal and quote characters are kept verbatim;
//! 3. every schema field takes its value from its column or its default;
//! 4. the id (core) or link key (extension) column is extracted.
//!
//! The result is a [`Row::Core`] or [`Row::Extension`]; [`Row::join_key`]
//! gives the key either kind is joined on.

use crate::error::{ArchiveError, Result};
use crate::schema::{FileRole, Schema, shorten_term};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A row of a data file, tagged by the kind of file it came from.
#[derive(Clone, PartialEq, Eq)]
pub enum Row {
    Core(CoreRow),
    Extension(ExtensionRow),
}

/// A row of the core file.
#[derive(Clone)]
pub struct CoreRow {
    schema: Arc<Schema>,
    position: usize,
    raw_fields: Vec<String>,
    data: HashMap<String, String>,
    id: Option<String>,
}

/// A row of an extension file.
#[derive(Clone)]
pub struct ExtensionRow {
    schema: Arc<Schema>,
    position: usize,
    raw_fields: Vec<String>,
    data: HashMap<String, String>,
    link_key: String,
}

/// Accessors shared by both row kinds.
macro_rules! row_accessors {
    ($ty:ident) => {
        impl $ty {
            /// 0-based position in the data file, header lines excluded.
            pub fn position(&self) -> usize {
                self.position
            }

            /// Split fields of the line, before schema mapping.
            pub fn raw_fields(&self) -> &[String] {
                &self.raw_fields
            }

            /// Term -> value for every field of the schema.
            pub fn data(&self) -> &HashMap<String, String> {
                &self.data
            }

            /// Value of `term`.
            pub fn get(&self, term: &str) -> Option<&str> {
                self.data.get(term).map(String::as_str)
            }

            /// Value of the term whose last path segment is `name`
            /// (`locality` for `http://rs.tdwg.org/dwc/terms/locality`).
            pub fn get_short(&self, name: &str) -> Option<&str> {
                self.data
                    .iter()
                    .find(|(term, _)| shorten_term(term) == name)
                    .map(|(_, v)| v.as_str())
            }

            /// Schema of the file the row came from.
            pub fn schema(&self) -> &Arc<Schema> {
                &self.schema
            }

            /// Row type URI of the file, if the schema names one.
            pub fn row_type(&self) -> Option<&str> {
                self.schema.row_type()
            }
        }
    };
}

row_accessors!(CoreRow);
row_accessors!(ExtensionRow);

impl CoreRow {
    /// Row id; absent when the core file declares no id column.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl ExtensionRow {
    /// Id of the core row this row augments.
    pub fn link_key(&self) -> &str {
        &self.link_key
    }
}

impl PartialEq for CoreRow {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.position == other.position
            && self.id == other.id
            && self.raw_fields == other.raw_fields
            && self.data == other.data
    }
}

impl Eq for CoreRow {}

impl PartialEq for ExtensionRow {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.position == other.position
            && self.link_key == other.link_key
            && self.raw_fields == other.raw_fields
            && self.data == other.data
    }
}

impl Eq for ExtensionRow {}

impl Row {
    /// Materialize `line` found at data `position` of a file described by
    /// `schema`.
    ///
    /// # Errors
    /// [`ArchiveError::ColumnOutOfRange`] when a field, the id column or the
    /// link-key column points past the fields present on the line;
    /// [`ArchiveError::MalformedLine`] when the splitter rejects the line;
    /// [`ArchiveError::UnenclosedLineBreak`] when an enclosure is configured and
    /// a `\n` appears outside an enclosed field.
    pub fn from_line(line: &str, position: usize, schema: &Arc<Schema>) -> Result<Self> {
        let body = line
            .strip_suffix(schema.line_terminator())
            .unwrap_or(line);
        let raw_fields = split_fields(body, schema, position)?;

        let column = |term: &str, column: usize| -> Result<String> {
            raw_fields
                .get(column)
                .cloned()
                .ok_or_else(|| ArchiveError::ColumnOutOfRange {
                    term: term.to_string(),
                    column,
                    available: raw_fields.len(),
                    position,
                })
        };

        let mut data = HashMap::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let value = match (field.column, &field.default) {
                (Some(c), _) => column(&field.term, c)?,
                (None, Some(default)) => default.clone(),
                (None, None) => String::new(),
            };
            data.insert(field.term.clone(), value);
        }

        let row = match schema.role() {
            FileRole::Core => {
                let id = schema.id_column().map(|c| column("id", c)).transpose()?;
                Row::Core(CoreRow {
                    schema: Arc::clone(schema),
                    position,
                    raw_fields,
                    data,
                    id,
                })
            }
            FileRole::Extension => {
                let link_key = match schema.link_key_column() {
                    Some(c) => column("coreid", c)?,
                    None => {
                        return Err(ArchiveError::InvalidSchema(format!(
                            "extension file {} has no link-key column",
                            schema.location().display()
                        )));
                    }
                };
                Row::Extension(ExtensionRow {
                    schema: Arc::clone(schema),
                    position,
                    raw_fields,
                    data,
                    link_key,
                })
            }
        };
        Ok(row)
    }

    /// The key this row is joined on: its id for a core row, its link key
    /// for an extension row.
    pub fn join_key(&self) -> Option<&str> {
        match self {
            Row::Core(r) => r.id(),
            Row::Extension(r) => Some(r.link_key()),
        }
    }

    /// 0-based data position of the row in its file.
    pub fn position(&self) -> usize {
        match self {
            Row::Core(r) => r.position(),
            Row::Extension(r) => r.position(),
        }
    }

    /// Term -> value for every field of the schema.
    pub fn data(&self) -> &HashMap<String, String> {
        match self {
            Row::Core(r) => r.data(),
            Row::Extension(r) => r.data(),
        }
    }

    /// Split fields of the line, before schema mapping.
    pub fn raw_fields(&self) -> &[String] {
        match self {
            Row::Core(r) => r.raw_fields(),
            Row::Extension(r) => r.raw_fields(),
        }
    }

    /// Value of `term`, if the schema maps it.
    ///
    /// ```
    /// use dwca_engine::testing::*;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let fixture = star_archive()?;
    /// let row = fixture.open_file("taxa.txt")?.row_at(0)?;
    /// assert_eq!(row.get(SCIENTIFIC_NAME), Some("Struthio camelus"));
    /// assert_eq!(row.get(COUNTRY), Some("Belgium"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, term: &str) -> Option<&str> {
        match self {
            Row::Core(r) => r.get(term),
            Row::Extension(r) => r.get(term),
        }
    }

    /// Schema of the file the row came from.
    pub fn schema(&self) -> &Arc<Schema> {
        match self {
            Row::Core(r) => r.schema(),
            Row::Extension(r) => r.schema(),
        }
    }

    /// `true` for a row of the core file.
    pub fn is_core(&self) -> bool {
        matches!(self, Row::Core(_))
    }

    /// Borrow as a core row; `None` for an extension row.
    pub fn as_core(&self) -> Option<&CoreRow> {
        match self {
            Row::Core(r) => Some(r),
            Row::Extension(_) => None,
        }
    }

    /// Borrow as an extension row; `None` for a core row.
    pub fn as_extension(&self) -> Option<&ExtensionRow> {
        match self {
            Row::Extension(r) => Some(r),
            Row::Core(_) => None,
        }
    }

    /// Unwrap into a core row; `None` for an extension row.
    pub fn into_core(self) -> Option<CoreRow> {
        match self {
            Row::Core(r) => Some(r),
            Row::Extension(_) => None,
        }
    }

    /// Unwrap into an extension row; `None` for a core row.
    pub fn into_extension(self) -> Option<ExtensionRow> {
        match self {
            Row::Extension(r) => Some(r),
            Row::Core(_) => None,
        }
    }
}

/// Split the terminator-stripped `body` of a line into raw fields.
///
/// An empty body has no fields. With an enclosure, each field loses at most
/// one enclosure character at either end, balanced or not.
fn split_fields(body: &str, schema: &Schema, position: usize) -> Result<Vec<String>> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let terminator = schema.field_terminator();
    let enclosure = schema.field_enclosure();
    if enclosure.is_empty() {
        return Ok(body.split(terminator).map(str::to_string).collect());
    }

    // Schema validation guarantees single ASCII bytes here.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(terminator.as_bytes()[0])
        .quote(enclosure.as_bytes()[0])
        .quoting(true)
        .double_quote(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .buffer_capacity(body.len().max(64))
        .from_reader(body.as_bytes());
    let mut record = csv::ByteRecord::new();
    let found = reader
        .read_byte_record(&mut record)
        .map_err(|source| ArchiveError::MalformedLine { position, source })?;
    if !found {
        return Ok(Vec::new());
    }

    // A '\n' outside an enclosure ends the csv record early; the rest of the
    // line would be lost.
    let consumed = usize::try_from(reader.position().byte()).unwrap_or(usize::MAX);
    let ended_on_break = body.ends_with('\n')
        && !record.iter().last().is_some_and(|f| f.ends_with(b"\n"));
    if consumed < body.len() || ended_on_break {
        return Err(ArchiveError::UnenclosedLineBreak { position });
    }

    Ok(record
        .iter()
        .map(|field| strip_enclosure(&String::from_utf8_lossy(field), enclosure))
        .collect())
}

/// Remove at most one leading and one trailing `enclosure` from `field`.
fn strip_enclosure(field: &str, enclosure: &str) -> String {
    let field = field.strip_prefix(enclosure).unwrap_or(field);
    field.strip_suffix(enclosure).unwrap_or(field).to_string()
}

fn fmt_row(
    f: &mut fmt::Formatter<'_>,
    source: &str,
    id_line: &str,
    schema: &Schema,
    position: usize,
    data: &HashMap<String, String>,
) -> fmt::Result {
    let mut terms: Vec<_> = data.iter().collect();
    terms.sort();
    writeln!(f, "--")?;
    writeln!(f, "Rowtype: {}", schema.row_type().unwrap_or("-"))?;
    writeln!(f, "Position: {position}")?;
    writeln!(f, "Source: {source}")?;
    writeln!(f, "{id_line}")?;
    writeln!(f, "Data: {terms:?}")?;
    writeln!(f, "--")
}

impl fmt::Display for CoreRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id_line = format!("Row id: {}", self.id.as_deref().unwrap_or("-"));
        fmt_row(f, "Core file", &id_line, &self.schema, self.position, &self.data)
    }
}

impl fmt::Display for ExtensionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id_line = format!("Core row id: {}", self.link_key);
        fmt_row(f, "Extension file", &id_line, &self.schema, self.position, &self.data)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Core(r) => fmt::Display::fmt(r, f),
            Row::Extension(r) => fmt::Display::fmt(r, f),
        }
    }
}

impl fmt::Debug for CoreRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRow")
            .field("location", &self.schema.location())
            .field("position", &self.position)
            .field("id", &self.id)
            .field("data", &self.data)
            .finish()
    }
}

impl fmt::Debug for ExtensionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRow")
            .field("location", &self.schema.location())
            .field("position", &self.position)
            .field("link_key", &self.link_key)
            .field("data", &self.data)
            .finish()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Core(r) => fmt::Debug::fmt(r, f),
            Row::Extension(r) => fmt::Debug::fmt(r, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    fn schema(enclosure: &str) -> Arc<Schema> {
        Arc::new(
            Schema::core("taxa.txt")
                .id_column(0)
                .field(FieldSpec::column("name", 1))
                .field(FieldSpec::column("place", 2))
                .field_enclosure(enclosure)
                .build()
                .expect("schema"),
        )
    }

    #[test]
    fn enclosed_terminator_does_not_split() -> Result<()> {
        let row = Row::from_line("1,\"field 2, with comma\",field 3\n", 0, &schema("\""))?;
        assert_eq!(row.raw_fields(), ["1", "field 2, with comma", "field 3"]);
        Ok(())
    }

    #[test]
    fn empty_enclosure_keeps_quotes() -> Result<()> {
        let row = Row::from_line("1,\"a\",'b'\n", 0, &schema(""))?;
        assert_eq!(row.get("name"), Some("\"a\""));
        assert_eq!(row.get("place"), Some("'b'"));
        Ok(())
    }

    #[test]
    fn terminator_stripped_once() -> Result<()> {
        let row = Row::from_line("1,a,\n", 3, &schema(""))?;
        assert_eq!(row.get("place"), Some(""));
        assert_eq!(row.position(), 3);
        assert_eq!(row.join_key(), Some("1"));
        Ok(())
    }

    #[test]
    fn empty_line_has_no_fields() {
        let err = Row::from_line("\n", 0, &schema("\"")).unwrap_err();
        assert!(err.is_inconsistent());
    }
}
