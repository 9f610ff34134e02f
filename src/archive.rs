//! An extracted archive: one core file plus its extensions.
//!
//! [`Archive`] opens every data file of an archive working directory and
//! offers the usual reader conveniences on top of [`IndexedDataFile`]:
//! iterating core rows, fetching a core row by position or id, gathering the
//! extension rows of a core row, finding orphaned extension rows and running a
//! star join over everything.
//!
//! ```no_run
//! use dwca_engine::{Archive, JoinMode};
//! use dwca_engine::layout::ArchiveLayout;
//!
//! # fn main() -> anyhow::Result<()> {
//! let layout = ArchiveLayout::from_path("work/layout.json")?;
//! let archive = Archive::from_layout("work", &layout)?;
//!
//! for row in archive.core_rows() {
//!     let row = row?.into_core();
//!     # let _ = row;
//! }
//! let ostrich = archive.core_row_by_id("1")?;
//! let extensions = archive.extension_rows_for(&ostrich)?;
//! let joined = archive.star_join(JoinMode::Outer)?.count();
//! # let _ = (extensions, joined);
//! # Ok(())
//! # }
//! ```

use crate::error::{ArchiveError, Result};
use crate::io::{IndexedDataFile, Rows};
use crate::row::{CoreRow, ExtensionRow, Row};
use crate::schema::Schema;
use crate::star::{JoinMode, StarJoin};
use log::info;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "config-json")]
use crate::layout::ArchiveLayout;

/// Link keys without a core row, per extension location.
///
/// Maps extension location → orphaned link key → positions of the rows
/// carrying it.
pub type OrphanedRows = BTreeMap<PathBuf, BTreeMap<String, Vec<usize>>>;

/// The data files of one extracted archive.
#[derive(Debug)]
pub struct Archive {
    work_dir: PathBuf,
    core: IndexedDataFile,
    extensions: Vec<IndexedDataFile>,
}

impl Archive {
    /// Open the core and extension files under `work_dir`.
    ///
    /// # Errors
    /// [`ArchiveError::InvalidSchema`] when `core` is not a core schema or an
    /// extension schema is not an extension; [`ArchiveError::Io`] when a file
    /// cannot be opened. Files opened before the failure are released.
    pub fn open(work_dir: impl AsRef<Path>, core: Schema, extensions: Vec<Schema>) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        if !core.is_core() {
            return Err(ArchiveError::InvalidSchema(format!(
                "{} is not a core file schema",
                core.location().display()
            )));
        }
        if let Some(bad) = extensions.iter().find(|s| !s.is_extension()) {
            return Err(ArchiveError::InvalidSchema(format!(
                "{} is not an extension file schema",
                bad.location().display()
            )));
        }

        let core = IndexedDataFile::open_in(&work_dir, Arc::new(core))?;
        let extensions = extensions
            .into_iter()
            .map(|schema| IndexedDataFile::open_in(&work_dir, Arc::new(schema)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "opened archive at {}: core {} ({} rows), {} extension(s)",
            work_dir.display(),
            core,
            core.row_count(),
            extensions.len()
        );
        Ok(Self {
            work_dir,
            core,
            extensions,
        })
    }

    /// Open the archive described by `layout`.
    ///
    /// # Errors
    /// Layout conversion errors, then see [`Archive::open`].
    #[cfg(feature = "config-json")]
    pub fn from_layout(work_dir: impl AsRef<Path>, layout: &ArchiveLayout) -> Result<Self> {
        Self::open(work_dir, layout.core_schema()?, layout.extension_schemas()?)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn core(&self) -> &IndexedDataFile {
        &self.core
    }

    pub fn extensions(&self) -> &[IndexedDataFile] {
        &self.extensions
    }

    /// Extension file at `location` (relative to the working directory).
    pub fn extension(&self, location: impl AsRef<Path>) -> Option<&IndexedDataFile> {
        let location = location.as_ref();
        self.extensions
            .iter()
            .find(|e| e.schema().location() == location)
    }

    /// `true` when the archive has at least one extension file.
    pub fn use_extensions(&self) -> bool {
        !self.extensions.is_empty()
    }

    pub fn core_contains_term(&self, term: &str) -> bool {
        self.core.schema().contains_term(term)
    }

    /// Core rows in file order.
    pub fn core_rows(&self) -> Rows<'_> {
        self.core.rows()
    }

    /// Core row at `position`.
    ///
    /// # Errors
    /// [`ArchiveError::RowNotFound`] past the end, read and materialization
    /// errors otherwise.
    pub fn core_row_at(&self, position: usize) -> Result<CoreRow> {
        into_core(&self.core, self.core.row_at(position)?)
    }

    /// First core row whose id is `id`.
    ///
    /// Ids are not guaranteed unique by publishers; the row with the lowest
    /// position wins.
    ///
    /// # Errors
    /// [`ArchiveError::RowNotFoundById`] when no row has that id,
    /// [`ArchiveError::MissingCoreId`] when the core has no id column.
    pub fn core_row_by_id(&self, id: &str) -> Result<CoreRow> {
        let position = self
            .core
            .ensure_core_id_index()?
            .lookup(id)
            .first()
            .copied()
            .ok_or_else(|| ArchiveError::RowNotFoundById {
                path: self.core.path().to_path_buf(),
                id: id.to_string(),
            })?;
        self.core_row_at(position)
    }

    /// Every extension row referencing `row`, grouped by extension file in
    /// archive order and by position within a file.
    ///
    /// A core row without an id has no extension rows.
    ///
    /// # Errors
    /// Index build, read and materialization errors from the extensions.
    pub fn extension_rows_for(&self, row: &CoreRow) -> Result<Vec<ExtensionRow>> {
        let Some(id) = row.id() else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for extension in &self.extensions {
            for row in extension.rows_by_link_key(id)? {
                if let Row::Extension(r) = row {
                    out.push(r);
                }
            }
        }
        Ok(out)
    }

    /// Extension rows whose link key matches no core id.
    ///
    /// Every extension appears in the result, with an empty map when it has
    /// no orphans. When the core declares no id column every link key is an
    /// orphan.
    ///
    /// # Errors
    /// Index build errors.
    pub fn orphaned_extension_rows(&self) -> Result<OrphanedRows> {
        let mut out = OrphanedRows::new();
        if self.extensions.is_empty() {
            return Ok(out);
        }
        let core_ids: HashSet<&str> = if self.core.schema().id_column().is_some() {
            self.core.ensure_core_id_index()?.key_set()
        } else {
            HashSet::new()
        };

        for extension in &self.extensions {
            let orphans = extension
                .ensure_link_key_index()?
                .iter()
                .filter(|(key, _)| !core_ids.contains(key))
                .map(|(key, positions)| (key.to_string(), positions.to_vec()))
                .collect();
            out.insert(extension.schema().location().to_path_buf(), orphans);
        }
        Ok(out)
    }

    /// Star join of every extension followed by the core file.
    ///
    /// # Errors
    /// See [`StarJoin::new`].
    pub fn star_join(&self, mode: JoinMode) -> Result<StarJoin<'_>> {
        StarJoin::new(self.extensions.iter().chain(std::iter::once(&self.core)), mode)
    }

    /// Release every file handle.
    pub fn close(&self) {
        self.core.close();
        for extension in &self.extensions {
            extension.close();
        }
    }
}

fn into_core(file: &IndexedDataFile, row: Row) -> Result<CoreRow> {
    row.into_core().ok_or_else(|| ArchiveError::NotACore {
        path: file.path().to_path_buf(),
    })
}
