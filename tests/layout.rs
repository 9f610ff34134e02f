#![cfg(feature = "config-json")]

use anyhow::Result;
use dwca_engine::testing::*;
use dwca_engine::{Archive, ArchiveError, ArchiveLayout, FileRole, JoinMode};
use std::fs;

const STAR_LAYOUT: &str = r#"{
  "core": {
    "location": "taxa.txt",
    "row_type": "http://rs.tdwg.org/dwc/terms/Taxon",
    "id_column": 0,
    "field_terminator": "\\t",
    "field_enclosure": "",
    "header_lines": 1,
    "fields": [
      { "term": "http://rs.tdwg.org/dwc/terms/scientificName", "column": 1 },
      { "term": "http://rs.tdwg.org/dwc/terms/kingdom", "index": 2 },
      { "term": "http://rs.tdwg.org/dwc/terms/country", "default": "Belgium" }
    ]
  },
  "extensions": [
    {
      "location": "description.txt",
      "row_type": "http://rs.gbif.org/terms/1.0/Description",
      "coreid_column": 0,
      "field_terminator": "\\t",
      "field_enclosure": "",
      "header_lines": 1,
      "fields": [
        { "term": "http://purl.org/dc/terms/description", "column": 1 },
        { "term": "http://purl.org/dc/terms/type", "column": 2 }
      ]
    },
    {
      "location": "vernacular.txt",
      "row_type": "http://rs.gbif.org/terms/1.0/VernacularName",
      "link_key_column": 0,
      "field_terminator": "\\t",
      "field_enclosure": "",
      "header_lines": 1,
      "fields": [
        { "term": "http://rs.tdwg.org/dwc/terms/vernacularName", "column": 1 },
        { "term": "http://purl.org/dc/terms/language", "column": 2 },
        { "term": "http://rs.tdwg.org/dwc/terms/countryCode", "column": 3 }
      ]
    }
  ]
}"#;

#[test]
fn layout_unescapes_terminators() -> Result<()> {
    let layout = ArchiveLayout::from_json_str(STAR_LAYOUT)?;
    let core = layout.core_schema()?;
    assert_eq!(core.field_terminator(), "\t");
    assert_eq!(core.line_terminator(), "\n");
    assert_eq!(core.field_enclosure(), "");
    assert_eq!(core.id_column(), Some(0));
    assert_eq!(core.fields().len(), 3);

    let extensions = layout.extension_schemas()?;
    assert_eq!(extensions.len(), 2);
    assert!(extensions.iter().all(|s| s.link_key_column() == Some(0)));
    Ok(())
}

#[test]
fn layout_defaults() -> Result<()> {
    let layout = ArchiveLayout::from_json_str(r#"{ "core": { "location": "occurrence.csv" } }"#)?;
    assert!(layout.extensions.is_empty());
    let core = layout.core.to_schema(FileRole::Core)?;
    assert_eq!(core.encoding().name(), "UTF-8");
    assert_eq!(core.field_terminator(), ",");
    assert_eq!(core.field_enclosure(), "\"");
    assert_eq!(core.header_lines(), 0);
    assert_eq!(core.id_column(), None);
    Ok(())
}

#[test]
fn extension_without_link_key_is_rejected() -> Result<()> {
    let layout = ArchiveLayout::from_json_str(
        r#"{ "core": { "location": "a.txt" }, "extensions": [ { "location": "b.txt" } ] }"#,
    )?;
    let err = layout.extension_schemas().unwrap_err();
    assert!(matches!(err, ArchiveError::Layout(_)));
    Ok(())
}

#[test]
fn malformed_layout_is_rejected() {
    assert!(matches!(
        ArchiveLayout::from_json_str("{ not json"),
        Err(ArchiveError::Layout(_))
    ));
    assert!(matches!(
        ArchiveLayout::from_json_str(r#"{ "extensions": [] }"#),
        Err(ArchiveError::Layout(_))
    ));
}

#[test]
fn layout_survives_serialization() -> Result<()> {
    let layout = ArchiveLayout::from_json_str(STAR_LAYOUT)?;
    let again = ArchiveLayout::from_json_str(&layout.to_json_string()?)?;
    assert_eq!(layout, again);
    Ok(())
}

#[test]
fn archive_from_layout_file() -> Result<()> {
    let fixture = star_archive()?;
    let path = fixture.path().join("layout.json");
    fs::write(&path, STAR_LAYOUT)?;

    let layout = ArchiveLayout::from_path(&path)?;
    let archive = Archive::from_layout(fixture.path(), &layout)?;
    let records = collect_star_signatures(archive.star_join(JoinMode::Inner)?)?;
    assert_eq!(records.len(), 7);
    assert_eq!(archive.core_row_by_id("4")?.get(COUNTRY), Some("Belgium"));
    Ok(())
}

#[test]
fn missing_layout_file_is_io_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = ArchiveLayout::from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(err.is_io());
    Ok(())
}
