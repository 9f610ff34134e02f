//! Star joins across several data files.
//!
//! A [`StarJoin`] joins N data files (usually the extensions plus the core
//! file) on their join key: the link key for extensions, the row id for the
//! core file. For every candidate key it walks the Cartesian product of the
//! matching positions in each participating file and yields one
//! [`StarRecord`] per combination.
//!
//! ## Join modes
//! - [`JoinMode::Inner`]: only keys present in every file; every record has
//!   one row per input file.
//! - [`JoinMode::Outer`]: keys present in any file; a record only holds rows
//!   from the files that contain the key (no placeholder rows are invented).
//!
//! ## Ordering
//! Candidate keys come out of a hash set and their order is unspecified.
//! Within a key, records follow the input file order and ascending positions,
//! the last file varying fastest.
//!
//! ## Laziness
//! Nothing but the key set is computed up front. Rows are materialized as
//! records are pulled, and only the current key's position lists are held.
//!
//! ```no_run
//! use dwca_engine::{JoinMode, StarJoin};
//! # use dwca_engine::io::IndexedDataFile;
//! # fn demo(description: &IndexedDataFile, vernacular: &IndexedDataFile, core: &IndexedDataFile) -> dwca_engine::Result<()> {
//! for record in StarJoin::new([description, vernacular, core], JoinMode::Inner)? {
//!     let record = record?;
//!     println!("{} -> {} rows", record.key(), record.len());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::index::LinkKeyIndex;
use crate::io::IndexedDataFile;
use crate::row::Row;
use log::debug;
use std::collections::HashSet;

/// How keys missing from some files are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinMode {
    /// Keys present in every file.
    #[default]
    Inner,
    /// Keys present in at least one file.
    Outer,
}

/// One combination of rows sharing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarRecord {
    key: String,
    files: Vec<usize>,
    rows: Vec<Row>,
}

impl StarRecord {
    /// The shared join key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rows of the record, aligned with [`files`](Self::files).
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index (into the join's input list) of the file each row came from.
    pub fn files(&self) -> &[usize] {
        &self.files
    }

    /// `(file index, row)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.files.iter().copied().zip(self.rows.iter())
    }

    /// Row contributed by input file `file`, if that file holds the key.
    pub fn row_from(&self, file: usize) -> Option<&Row> {
        self.iter().find(|(f, _)| *f == file).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

struct Participant<'a> {
    file: &'a IndexedDataFile,
    index: &'a LinkKeyIndex,
}

/// Cartesian product of one key's position lists, walked as an odometer.
struct KeyProduct<'a> {
    key: &'a str,
    files: Vec<usize>,
    lists: Vec<&'a [usize]>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> KeyProduct<'a> {
    fn new(key: &'a str, participants: &[Participant<'a>]) -> Self {
        let (files, lists): (Vec<usize>, Vec<&'a [usize]>) = participants
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.index.lookup(key)))
            .filter(|(_, list)| !list.is_empty())
            .unzip();
        let exhausted = lists.is_empty();
        Self {
            key,
            cursor: vec![0; lists.len()],
            files,
            lists,
            exhausted,
        }
    }

    fn next_positions(&mut self) -> Option<Vec<usize>> {
        if self.exhausted {
            return None;
        }
        let positions = self
            .cursor
            .iter()
            .zip(&self.lists)
            .map(|(&i, list)| list[i])
            .collect();

        let mut slot = self.cursor.len();
        loop {
            if slot == 0 {
                self.exhausted = true;
                break;
            }
            slot -= 1;
            self.cursor[slot] += 1;
            if self.cursor[slot] < self.lists[slot].len() {
                break;
            }
            self.cursor[slot] = 0;
        }
        Some(positions)
    }
}

/// Lazy star join over several data files.
pub struct StarJoin<'a> {
    participants: Vec<Participant<'a>>,
    mode: JoinMode,
    key_count: usize,
    keys: std::vec::IntoIter<&'a str>,
    current: Option<KeyProduct<'a>>,
}

impl<'a> StarJoin<'a> {
    /// Prepare a join over `files`, in the given order.
    ///
    /// Builds any key index that is not cached yet.
    ///
    /// # Errors
    /// Index build errors: I/O failures, inconsistent rows, or
    /// [`ArchiveError::MissingCoreId`](crate::ArchiveError::MissingCoreId)
    /// for a core file without an id column.
    pub fn new(files: impl IntoIterator<Item = &'a IndexedDataFile>, mode: JoinMode) -> Result<Self> {
        let participants = files
            .into_iter()
            .map(|file| {
                Ok(Participant {
                    file,
                    index: file.join_index()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let candidates: HashSet<&'a str> = match participants.split_first() {
            None => HashSet::new(),
            Some((first, rest)) => {
                let mut keys = first.index.key_set();
                for p in rest {
                    match mode {
                        JoinMode::Inner => keys.retain(|k| p.index.contains_key(k)),
                        JoinMode::Outer => keys.extend(p.index.keys()),
                    }
                }
                keys
            }
        };
        let keys: Vec<&'a str> = candidates.into_iter().collect();
        debug!(
            "star join ({mode:?}) over {} files: {} candidate keys",
            participants.len(),
            keys.len()
        );

        Ok(Self {
            participants,
            mode,
            key_count: keys.len(),
            keys: keys.into_iter(),
            current: None,
        })
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    /// Number of candidate keys of the join.
    pub fn key_count(&self) -> usize {
        self.key_count
    }
}

impl Iterator for StarJoin<'_> {
    type Item = Result<StarRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(product) = self.current.as_mut()
                && let Some(positions) = product.next_positions()
            {
                let rows = product
                    .files
                    .iter()
                    .zip(positions)
                    .map(|(&f, position)| self.participants[f].file.row_at(position))
                    .collect::<Result<Vec<_>>>();
                return Some(rows.map(|rows| StarRecord {
                    key: product.key.to_string(),
                    files: product.files.clone(),
                    rows,
                }));
            }
            let key = self.keys.next()?;
            self.current = Some(KeyProduct::new(key, &self.participants));
        }
    }
}
