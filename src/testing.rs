//! Testing utilities for archive readers.
//!
//! - **Fixtures**: small archives written to temporary directories, including
//!   the two-extension archive used throughout the test suite
//! - **Assertions**: order-insensitive comparison of star-join output and the
//!   offset/iteration round-trip check
//!
//! ```
//! use dwca_engine::testing::*;
//! use dwca_engine::JoinMode;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fixture = star_archive()?;
//! let archive = fixture.open()?;
//! let records = collect_star_signatures(archive.star_join(JoinMode::Inner)?)?;
//! assert_eq!(records.len(), 7);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
