//! Key → positions indexes over data files.
//!
//! A [`LinkKeyIndex`] maps every key value of a data file to the ascending
//! list of data positions carrying it. For an extension file the key is the
//! link key (the core id a row points at); for the core file, when it takes
//! part in a join, the key is the row id.
//!
//! Indexes are built by one sequential pass over the file, visiting positions
//! in order, so every position list is sorted and the lists partition the
//! file's data rows. Files cache them; see
//! [`IndexedDataFile::ensure_link_key_index`].
//!
//! Looking up a key that never occurs is not an error and yields an empty
//! slice; an extension row whose key has no core row is an "orphan", a data
//! quality issue for the layer above.

use crate::error::{ArchiveError, Result};
use crate::io::IndexedDataFile;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Map from key value to the ordered positions holding it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkKeyIndex {
    positions: HashMap<String, Vec<usize>>,
    position_count: usize,
}

impl LinkKeyIndex {
    /// Index the link keys of an extension file.
    ///
    /// # Errors
    /// [`ArchiveError::NotAnExtension`] when `file` is a core file; read and
    /// materialization errors from the scan.
    pub fn build(file: &IndexedDataFile) -> Result<Self> {
        if !file.schema().is_extension() {
            return Err(ArchiveError::NotAnExtension {
                path: file.path().to_path_buf(),
            });
        }
        Self::scan(file)
    }

    /// Index the row ids of a core file.
    ///
    /// # Errors
    /// [`ArchiveError::NotACore`] when `file` is an extension,
    /// [`ArchiveError::MissingCoreId`] when the core declares no id column;
    /// read and materialization errors from the scan.
    pub fn build_core_ids(file: &IndexedDataFile) -> Result<Self> {
        let schema = file.schema();
        if !schema.is_core() {
            return Err(ArchiveError::NotACore {
                path: file.path().to_path_buf(),
            });
        }
        if schema.id_column().is_none() {
            return Err(ArchiveError::MissingCoreId {
                path: file.path().to_path_buf(),
            });
        }
        Self::scan(file)
    }

    fn scan(file: &IndexedDataFile) -> Result<Self> {
        let mut index = Self::default();
        for row in file.rows() {
            let row = row?;
            if let Some(key) = row.join_key() {
                index.insert(key, row.position());
            }
        }
        debug!(
            "built key index for {}: {} keys over {} rows",
            file.path().display(),
            index.key_count(),
            index.position_count
        );
        Ok(index)
    }

    fn insert(&mut self, key: &str, position: usize) {
        match self.positions.get_mut(key) {
            Some(list) => list.push(position),
            None => {
                self.positions.insert(key.to_string(), vec![position]);
            }
        }
        self.position_count += 1;
    }

    /// Positions holding `key`, ascending; empty when the key never occurs.
    pub fn lookup(&self, key: &str) -> &[usize] {
        self.positions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` when at least one position carries `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Distinct key values, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.positions.keys().map(String::as_str)
    }

    /// Distinct key values as a set.
    pub fn key_set(&self) -> HashSet<&str> {
        self.keys().collect()
    }

    /// `(key, positions)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> + '_ {
        self.positions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.positions.len()
    }

    /// Total number of indexed positions (the sum of all list lengths).
    pub fn position_count(&self) -> usize {
        self.position_count
    }

    /// `true` when the indexed file has no keyed rows.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
