//! Assertion helpers for data file and star-join tests.

use crate::io::IndexedDataFile;
use crate::schema::shorten_term;
use crate::star::StarRecord;
use anyhow::{Result, ensure};
use std::collections::BTreeSet;

/// Order-insensitive summary of one star record: `(join key, position,
/// short row type)` per row.
pub type StarSignature = BTreeSet<(String, usize, String)>;

/// Summarize `record` as a [`StarSignature`].
///
/// Files without a row type are labelled by their location.
pub fn star_signature(record: &StarRecord) -> StarSignature {
    record
        .rows()
        .iter()
        .map(|row| {
            let label = match row.schema().row_type() {
                Some(t) => shorten_term(t).to_string(),
                None => row.schema().location().display().to_string(),
            };
            (
                row.join_key().unwrap_or_default().to_string(),
                row.position(),
                label,
            )
        })
        .collect()
}

/// Drain a star join into sorted signatures.
///
/// # Errors
/// Returns the first error the join yields.
pub fn collect_star_signatures<I>(join: I) -> Result<Vec<StarSignature>>
where
    I: IntoIterator<Item = crate::Result<StarRecord>>,
{
    let mut out = join
        .into_iter()
        .map(|r| r.map(|record| star_signature(&record)))
        .collect::<crate::Result<Vec<_>>>()?;
    out.sort();
    Ok(out)
}

/// Build the signature of one expected record from `(key, position, label)`.
pub fn signature(rows: &[(&str, usize, &str)]) -> StarSignature {
    rows.iter()
        .map(|(k, p, l)| ((*k).to_string(), *p, (*l).to_string()))
        .collect()
}

/// Assert two lists of star signatures hold the same records, ignoring order.
///
/// # Panics
///
/// Panics if the record multisets differ.
pub fn assert_star_signatures_equal(mut actual: Vec<StarSignature>, mut expected: Vec<StarSignature>) {
    actual.sort();
    expected.sort();
    assert_eq!(
        actual.len(),
        expected.len(),
        "Star record count mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    assert_eq!(actual, expected, "Star records differ");
}

/// Check that random access and sequential iteration agree on every line.
///
/// # Errors
/// Fails when a read errors or a line differs.
pub fn check_round_trip(file: &IndexedDataFile) -> Result<()> {
    let mut seen = 0usize;
    for (position, line) in file.lines().enumerate() {
        let line = line?;
        let direct = file.line_at(position)?;
        ensure!(
            line == direct,
            "line {position} differs: iterated {line:?}, random access {direct:?}"
        );
        seen += 1;
    }
    ensure!(
        seen == file.row_count(),
        "iterated {seen} lines, row_count() is {}",
        file.row_count()
    );
    Ok(())
}
