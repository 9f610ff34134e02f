//! Data file access.
//!
//! - [`offsets`]: encoded-byte line-offset scanning
//! - [`data_file`]: [`IndexedDataFile`] and its [`Lines`] / [`Rows`] cursors

pub mod data_file;
pub mod offsets;

pub use data_file::{IndexedDataFile, Lines, Rows};
