//! Pre-built archives and data files for tests.
//!
//! Every fixture lives in its own [`TempDir`], removed when the fixture is
//! dropped.

use crate::archive::Archive;
use crate::io::IndexedDataFile;
use crate::schema::{FieldSpec, Schema};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const TAXON_ROW_TYPE: &str = "http://rs.tdwg.org/dwc/terms/Taxon";
pub const DESCRIPTION_ROW_TYPE: &str = "http://rs.gbif.org/terms/1.0/Description";
pub const VERNACULAR_ROW_TYPE: &str = "http://rs.gbif.org/terms/1.0/VernacularName";

pub const SCIENTIFIC_NAME: &str = "http://rs.tdwg.org/dwc/terms/scientificName";
pub const KINGDOM: &str = "http://rs.tdwg.org/dwc/terms/kingdom";
pub const COUNTRY: &str = "http://rs.tdwg.org/dwc/terms/country";
pub const DESCRIPTION: &str = "http://purl.org/dc/terms/description";
pub const DESCRIPTION_TYPE: &str = "http://purl.org/dc/terms/type";
pub const VERNACULAR_NAME: &str = "http://rs.tdwg.org/dwc/terms/vernacularName";
pub const LANGUAGE: &str = "http://purl.org/dc/terms/language";
pub const COUNTRY_CODE: &str = "http://rs.tdwg.org/dwc/terms/countryCode";

const TAXA: &str = "id\tscientificName\tkingdom\n\
1\tStruthio camelus\tAnimalia\n\
2\tAlligator mississippiensis\tAnimalia\n\
3\tTyrannosaurus rex\tAnimalia\n\
4\tBetta splendens\tAnimalia\n";

const DESCRIPTIONS: &str = "coreid\tdescription\ttype\n\
1\tThe largest living bird.\tgeneral\n\
1\tFlightless, runs fast.\tbiology\n\
2\tLarge reptile of the southeastern United States.\tgeneral\n";

const VERNACULAR_NAMES: &str = "coreid\tvernacularName\tlanguage\tcountryCode\n\
1\tOstrich\ten\tZA\n\
1\tAutruche\tfr\tBE\n\
1\tStruisvogel\tnl\tBE\n\
2\tAmerican alligator\ten\tUS\n";

/// A small archive extracted into a temporary directory.
#[derive(Debug)]
pub struct FixtureArchive {
    dir: TempDir,
    core: Schema,
    extensions: Vec<Schema>,
}

impl FixtureArchive {
    /// Working directory holding the data files.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn core_schema(&self) -> &Schema {
        &self.core
    }

    pub fn extension_schemas(&self) -> &[Schema] {
        &self.extensions
    }

    /// Open the whole archive.
    ///
    /// # Errors
    /// Returns an error if a data file cannot be opened.
    pub fn open(&self) -> Result<Archive> {
        Archive::open(self.path(), self.core.clone(), self.extensions.clone())
            .context("open fixture archive")
    }

    /// Open one data file of the archive by location.
    ///
    /// # Errors
    /// Returns an error if no schema has that location or the file cannot be
    /// opened.
    pub fn open_file(&self, location: &str) -> Result<IndexedDataFile> {
        let schema = std::iter::once(&self.core)
            .chain(&self.extensions)
            .find(|s| s.location() == Path::new(location))
            .with_context(|| format!("no fixture file {location}"))?;
        Ok(IndexedDataFile::open_in(self.path(), Arc::new(schema.clone()))?)
    }
}

/// Write `contents` to `dir/name`, creating parent directories.
///
/// # Errors
/// Returns an error if the file or its parents cannot be created.
pub fn write_data_file(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Write a single data file and open it with `schema`.
///
/// The file is written at `schema.location()` inside a fresh temporary
/// directory, which is returned so it outlives the file.
///
/// # Errors
/// Returns an error if the file cannot be written or opened.
pub fn data_file_fixture(contents: &[u8], schema: Schema) -> Result<(TempDir, IndexedDataFile)> {
    let dir = tempfile::tempdir()?;
    let location = schema.location().to_string_lossy().into_owned();
    write_data_file(dir.path(), &location, contents)?;
    let file = IndexedDataFile::open_in(dir.path(), Arc::new(schema))?;
    Ok((dir, file))
}

/// Schema of the fixture core file `taxa.txt`.
///
/// # Errors
/// Returns an error if the schema fails validation.
pub fn taxa_schema() -> Result<Schema> {
    Ok(Schema::core("taxa.txt")
        .row_type(TAXON_ROW_TYPE)
        .id_column(0)
        .field(FieldSpec::column(SCIENTIFIC_NAME, 1))
        .field(FieldSpec::column(KINGDOM, 2))
        .field(FieldSpec::default_value(COUNTRY, "Belgium"))
        .field_terminator("\t")
        .field_enclosure("")
        .header_lines(1)
        .build()?)
}

/// Schema of the fixture extension `description.txt` (3 columns).
///
/// # Errors
/// Returns an error if the schema fails validation.
pub fn description_schema() -> Result<Schema> {
    Ok(Schema::extension("description.txt", 0)
        .row_type(DESCRIPTION_ROW_TYPE)
        .field(FieldSpec::column(DESCRIPTION, 1))
        .field(FieldSpec::column(DESCRIPTION_TYPE, 2))
        .field_terminator("\t")
        .field_enclosure("")
        .header_lines(1)
        .build()?)
}

/// Schema of the fixture extension `vernacular.txt` (4 columns).
///
/// # Errors
/// Returns an error if the schema fails validation.
pub fn vernacular_schema() -> Result<Schema> {
    Ok(Schema::extension("vernacular.txt", 0)
        .row_type(VERNACULAR_ROW_TYPE)
        .field(FieldSpec::column(VERNACULAR_NAME, 1))
        .field(FieldSpec::column(LANGUAGE, 2))
        .field(FieldSpec::column(COUNTRY_CODE, 3))
        .field_terminator("\t")
        .field_enclosure("")
        .header_lines(1)
        .build()?)
}

/// Core with ids `1..=4`, a description extension with rows for `1, 1, 2`
/// and a vernacular-name extension with rows for `1, 1, 1, 2`.
///
/// Extensions are listed description first, then vernacular names.
///
/// # Errors
/// Returns an error if the files cannot be written.
pub fn star_archive() -> Result<FixtureArchive> {
    let dir = tempfile::tempdir()?;
    write_data_file(dir.path(), "taxa.txt", TAXA.as_bytes())?;
    write_data_file(dir.path(), "description.txt", DESCRIPTIONS.as_bytes())?;
    write_data_file(dir.path(), "vernacular.txt", VERNACULAR_NAMES.as_bytes())?;
    Ok(FixtureArchive {
        dir,
        core: taxa_schema()?,
        extensions: vec![description_schema()?, vernacular_schema()?],
    })
}

/// [`star_archive`] plus extension rows pointing at core ids `5` and `6`,
/// which do not exist.
///
/// # Errors
/// Returns an error if the files cannot be written.
pub fn orphaned_archive() -> Result<FixtureArchive> {
    let fixture = star_archive()?;
    let descriptions = format!("{DESCRIPTIONS}5\tGhost.\tgeneral\n5\tStill a ghost.\tgeneral\n6\tNobody.\tgeneral\n");
    let vernaculars = format!("{VERNACULAR_NAMES}6\tNobody\ten\tGB\n");
    write_data_file(fixture.path(), "description.txt", descriptions.as_bytes())?;
    write_data_file(fixture.path(), "vernacular.txt", vernaculars.as_bytes())?;
    Ok(fixture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_archive_files_exist() -> Result<()> {
        let fixture = star_archive()?;
        for name in ["taxa.txt", "description.txt", "vernacular.txt"] {
            assert!(fixture.path().join(name).is_file(), "{name} missing");
        }
        Ok(())
    }

    #[test]
    fn open_file_rejects_unknown_location() -> Result<()> {
        let fixture = star_archive()?;
        assert!(fixture.open_file("nope.txt").is_err());
        Ok(())
    }
}
