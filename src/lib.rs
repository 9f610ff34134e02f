//! # dwca-engine
//!
//! A **row-access, indexing and star-join engine** for extracted Darwin Core
//! Archives (DwC-A). An archive is a set of delimited text files: one *core*
//! file whose rows have an id, plus any number of *extension* files whose rows
//! point at a core row through a link key ("coreid").
//!
//! ## Key Features
//!
//! - **Random access by position** - line offsets are computed once, in the
//!   file's own encoding, so any data row is one seek away
//! - **Any declared encoding** - UTF-8, UTF-16, windows-1252 and every other
//!   WHATWG label, decoded with `encoding_rs`
//! - **Schema-driven rows** - columns and constant defaults mapped onto terms
//! - **Link-key indexes** - key → ordered positions, built lazily and cached
//! - **Star joins** - inner or outer Cartesian joins of several files on their
//!   shared key, produced lazily
//! - **JSON layouts** - describe an archive in a config document (feature
//!   `config-json`, on by default)
//!
//! ## Quick Start
//!
//! ```no_run
//! use dwca_engine::{Archive, FieldSpec, JoinMode, Schema};
//!
//! # fn main() -> anyhow::Result<()> {
//! let core = Schema::core("taxa.txt")
//!     .id_column(0)
//!     .field(FieldSpec::column("http://rs.tdwg.org/dwc/terms/scientificName", 1))
//!     .field_terminator("\t")
//!     .header_lines(1)
//!     .build()?;
//! let vernacular = Schema::extension("vernacular.txt", 0)
//!     .field(FieldSpec::column("http://rs.tdwg.org/dwc/terms/vernacularName", 1))
//!     .field_terminator("\t")
//!     .header_lines(1)
//!     .build()?;
//!
//! let archive = Archive::open("work", core, vec![vernacular])?;
//! for record in archive.star_join(JoinMode::Inner)? {
//!     let record = record?;
//!     println!("{}: {} rows", record.key(), record.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Schema
//!
//! A [`Schema`] describes one data file: its role, key column, field mapping,
//! encoding, terminators, enclosure and header line count. Schemas are
//! validated when built and immutable afterwards.
//!
//! ### IndexedDataFile
//!
//! An [`IndexedDataFile`] opens a data file, records the byte offset of every
//! physical line and serves lines and [`Row`]s by data position (position 0
//! is the first line after the header). It owns one read handle, released by
//! [`close`](IndexedDataFile::close).
//!
//! ### Rows
//!
//! A [`Row`] is either a [`CoreRow`] (with an optional id) or an
//! [`ExtensionRow`] (with a link key). Both expose their raw fields and a
//! term → value map.
//!
//! ### LinkKeyIndex and StarJoin
//!
//! A [`LinkKeyIndex`] maps key values to the ascending positions carrying
//! them. A [`StarJoin`] combines the indexes of several files and yields one
//! [`StarRecord`] per combination of rows sharing a key.
//!
//! ## Errors
//!
//! Every fallible operation returns [`Result`], with [`ArchiveError`]
//! separating out-of-range requests, inconsistent archives (a column that
//! does not exist in a row), precondition violations and I/O failures.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade: `info!` when an archive is opened,
//! `debug!` for offset scans and index builds, `warn!` for undecodable bytes.
//! Install any logger to see them.
//!
//! ## Feature Flags
//!
//! - `config-json` (default): [`layout`] and [`Archive::from_layout`]

pub mod archive;
pub mod error;
pub mod index;
pub mod io;
#[cfg(feature = "config-json")]
pub mod layout;
pub mod row;
pub mod schema;
pub mod star;
pub mod testing;

pub use archive::{Archive, OrphanedRows};
pub use error::{ArchiveError, Result};
pub use index::LinkKeyIndex;
pub use io::{IndexedDataFile, Lines, Rows};
pub use row::{CoreRow, ExtensionRow, Row};
pub use schema::{FieldSpec, FileRole, Schema};
pub use star::{JoinMode, StarJoin, StarRecord};

#[cfg(feature = "config-json")]
pub use layout::{ArchiveLayout, FileLayout};
