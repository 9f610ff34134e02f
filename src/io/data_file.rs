//! Random access to one delimited data file.
//!
//! [`IndexedDataFile`] scans its file once on open and records the byte offset
//! at which every physical line starts. Any data row can then be read with a
//! single seek, and sequential cursors ([`Lines`], [`Rows`]) reuse the same
//! handle without disturbing each other: every read seeks to the absolute
//! offset it needs unless the handle already sits there.
//!
//! ```no_run
//! use dwca_engine::io::IndexedDataFile;
//! use dwca_engine::schema::{FieldSpec, Schema};
//! use std::sync::Arc;
//!
//! # fn main() -> dwca_engine::Result<()> {
//! let schema = Schema::extension("vernacular.txt", 0)
//!     .field(FieldSpec::column("http://rs.gbif.org/terms/1.0/vernacularName", 1))
//!     .header_lines(1)
//!     .build()?;
//! let file = IndexedDataFile::open("work/vernacular.txt", Arc::new(schema))?;
//!
//! let third = file.line_at(2)?;
//! for row in file.rows() {
//!     let row = row?;
//!     println!("{} -> {:?}", row.position(), row.join_key());
//! }
//! let positions = file.ensure_link_key_index()?.lookup("1");
//! # let _ = (third, positions);
//! # Ok(())
//! # }
//! ```

use crate::error::{ArchiveError, Result};
use crate::index::LinkKeyIndex;
use crate::io::offsets::scan_line_offsets;
use crate::row::Row;
use crate::schema::Schema;
use log::{debug, warn};
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Handle {
    reader: BufReader<File>,
    /// Byte position the reader will read from next.
    cursor: u64,
}

/// One data file with a line-offset index and a lazily built key index.
pub struct IndexedDataFile {
    path: PathBuf,
    schema: Arc<Schema>,
    offsets: Vec<u64>,
    handle: RefCell<Option<Handle>>,
    link_key_index: OnceCell<LinkKeyIndex>,
    core_id_index: OnceCell<LinkKeyIndex>,
}

impl IndexedDataFile {
    /// Open `path` and index the start of every physical line.
    ///
    /// # Errors
    /// [`ArchiveError::Io`] if the file cannot be opened or read. The handle is
    /// released before returning.
    pub fn open(path: impl AsRef<Path>, schema: Arc<Schema>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ArchiveError::io(&path, e))?;
        let mut reader = BufReader::new(file);
        let offsets = scan_line_offsets(&mut reader, schema.encoding(), schema.line_terminator())
            .map_err(|e| ArchiveError::io(&path, e))?;
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| ArchiveError::io(&path, e))?;

        debug!(
            "indexed {} ({} physical lines, {} header lines, {})",
            path.display(),
            offsets.len(),
            schema.header_lines(),
            schema.encoding().name()
        );

        Ok(Self {
            path,
            schema,
            offsets,
            handle: RefCell::new(Some(Handle { reader, cursor: 0 })),
            link_key_index: OnceCell::new(),
            core_id_index: OnceCell::new(),
        })
    }

    /// Open the file the schema points at, relative to `work_dir`.
    ///
    /// # Errors
    /// See [`IndexedDataFile::open`].
    pub fn open_in(work_dir: impl AsRef<Path>, schema: Arc<Schema>) -> Result<Self> {
        let path = work_dir.as_ref().join(schema.location());
        Self::open(path, schema)
    }

    /// Full path of the file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema the file was opened with.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Start offset of every physical line, header lines included.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Number of physical lines, header lines included.
    pub fn physical_line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Leading lines skipped before data position 0.
    pub fn header_lines(&self) -> usize {
        self.schema.header_lines()
    }

    /// Number of data rows (physical lines minus header lines).
    pub fn row_count(&self) -> usize {
        self.offsets.len().saturating_sub(self.header_lines())
    }

    /// `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.handle.borrow().is_none()
    }

    /// Release the file handle. Every later read fails with
    /// [`ArchiveError::Closed`]; offsets and built indexes stay readable.
    pub fn close(&self) {
        if self.handle.borrow_mut().take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }

    /// Raw line at data `position` (0-based, header lines excluded), line
    /// terminator included.
    ///
    /// # Errors
    /// [`ArchiveError::RowNotFound`] when `position >= row_count()`,
    /// [`ArchiveError::Closed`] after [`close`](Self::close),
    /// [`ArchiveError::Io`] when reading fails.
    pub fn line_at(&self, position: usize) -> Result<String> {
        let not_found = || ArchiveError::RowNotFound {
            path: self.path.clone(),
            position,
            row_count: self.row_count(),
        };
        let line = position
            .checked_add(self.header_lines())
            .ok_or_else(not_found)?;
        let start = *self.offsets.get(line).ok_or_else(not_found)?;
        let end = self.offsets.get(line + 1).copied();
        self.read_range(start, end)
    }

    /// Materialized row at data `position`.
    ///
    /// # Errors
    /// Everything [`line_at`](Self::line_at) returns, plus
    /// [`ArchiveError::ColumnOutOfRange`] when the line lacks a column the
    /// schema references.
    pub fn row_at(&self, position: usize) -> Result<Row> {
        let line = self.line_at(position)?;
        Row::from_line(&line, position, &self.schema)
    }

    /// Cursor over the raw data lines, in file order.
    ///
    /// Each call starts again at the first data line.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            file: self,
            next: 0,
        }
    }

    /// Cursor over materialized rows, in file order.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            lines: self.lines(),
        }
    }

    /// Link-key index of an extension file, built by one full scan on first
    /// call and cached afterwards.
    ///
    /// # Errors
    /// [`ArchiveError::NotAnExtension`] for a core file; read and
    /// materialization errors from the scan.
    pub fn ensure_link_key_index(&self) -> Result<&LinkKeyIndex> {
        if let Some(index) = self.link_key_index.get() {
            return Ok(index);
        }
        let index = LinkKeyIndex::build(self)?;
        Ok(self.link_key_index.get_or_init(|| index))
    }

    /// Core-id index of a core file, built on first call and cached.
    ///
    /// # Errors
    /// [`ArchiveError::NotACore`] for an extension file,
    /// [`ArchiveError::MissingCoreId`] when the core file has no id column;
    /// read and materialization errors from the scan.
    pub fn ensure_core_id_index(&self) -> Result<&LinkKeyIndex> {
        if let Some(index) = self.core_id_index.get() {
            return Ok(index);
        }
        let index = LinkKeyIndex::build_core_ids(self)?;
        Ok(self.core_id_index.get_or_init(|| index))
    }

    /// The index this file joins on: core ids for the core file, link keys
    /// for an extension.
    ///
    /// # Errors
    /// See [`ensure_core_id_index`](Self::ensure_core_id_index) and
    /// [`ensure_link_key_index`](Self::ensure_link_key_index).
    pub fn join_index(&self) -> Result<&LinkKeyIndex> {
        if self.schema.is_core() {
            self.ensure_core_id_index()
        } else {
            self.ensure_link_key_index()
        }
    }

    /// Drop cached key indexes so the next access rebuilds them.
    pub fn invalidate_indexes(&mut self) {
        self.link_key_index.take();
        self.core_id_index.take();
    }

    /// All rows of this extension file whose link key is `key`, in file order.
    ///
    /// # Errors
    /// See [`ensure_link_key_index`](Self::ensure_link_key_index) and
    /// [`row_at`](Self::row_at).
    pub fn rows_by_link_key(&self, key: &str) -> Result<Vec<Row>> {
        self.ensure_link_key_index()?
            .lookup(key)
            .iter()
            .map(|&position| self.row_at(position))
            .collect()
    }

    fn read_range(&self, start: u64, end: Option<u64>) -> Result<String> {
        let mut guard = self.handle.borrow_mut();
        let handle = guard.as_mut().ok_or_else(|| ArchiveError::Closed {
            path: self.path.clone(),
        })?;
        let io_err = |e| ArchiveError::io(&self.path, e);

        if handle.cursor != start {
            handle.reader.seek(SeekFrom::Start(start)).map_err(io_err)?;
        }
        // Unknown until the read succeeds; forces a seek after a failed read.
        handle.cursor = u64::MAX;

        let mut bytes = Vec::new();
        match end {
            Some(end) => {
                let len = usize::try_from(end - start).map_err(|_| {
                    io_err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "line longer than addressable memory",
                    ))
                })?;
                bytes.resize(len, 0);
                handle.reader.read_exact(&mut bytes).map_err(io_err)?;
            }
            None => {
                handle.reader.read_to_end(&mut bytes).map_err(io_err)?;
            }
        }
        handle.cursor = start + bytes.len() as u64;

        let (text, had_errors) = self
            .schema
            .encoding()
            .decode_without_bom_handling(&bytes);
        if had_errors {
            warn!(
                "malformed {} sequence at byte {} of {}; replaced",
                self.schema.encoding().name(),
                start,
                self.path.display()
            );
        }
        Ok(text.into_owned())
    }
}

impl fmt::Display for IndexedDataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.schema.location().display())
    }
}

impl fmt::Debug for IndexedDataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedDataFile")
            .field("path", &self.path)
            .field("role", &self.schema.role())
            .field("physical_lines", &self.offsets.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Sequential cursor over the data lines of an [`IndexedDataFile`].
///
/// Stops after the first error.
#[derive(Debug)]
pub struct Lines<'a> {
    file: &'a IndexedDataFile,
    next: usize,
}

impl Lines<'_> {
    /// Data position of the line the next call to `next` returns.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.file.row_count() {
            return None;
        }
        let item = self.file.line_at(self.next);
        self.next = if item.is_ok() {
            self.next + 1
        } else {
            self.file.row_count()
        };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.file.row_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Sequential cursor over the materialized rows of an [`IndexedDataFile`].
///
/// A read error ends the cursor; a row that fails to materialize is reported
/// and the cursor moves on.
#[derive(Debug)]
pub struct Rows<'a> {
    lines: Lines<'a>,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.lines.position();
        let line = self.lines.next()?;
        Some(line.and_then(|line| Row::from_line(&line, position, &self.lines.file.schema)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}
