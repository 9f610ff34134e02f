use anyhow::Result;
use dwca_engine::testing::*;
use dwca_engine::{ArchiveError, FieldSpec, FileRole, Schema};

#[test]
fn field_needs_exactly_one_source() {
    let both = FieldSpec {
        term: COUNTRY.to_string(),
        column: Some(2),
        default: Some("Belgium".to_string()),
    };
    let err = Schema::core("taxa.txt").field(both).build().unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidSchema(_)));

    let neither = FieldSpec {
        term: COUNTRY.to_string(),
        column: None,
        default: None,
    };
    let err = Schema::core("taxa.txt").field(neither).build().unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidSchema(_)));
}

#[test]
fn unknown_encoding_is_rejected() {
    let err = Schema::core("taxa.txt").encoding("klingon").build().unwrap_err();
    assert!(matches!(err, ArchiveError::UnknownEncoding(ref label) if label == "klingon"));
}

#[test]
fn encoding_labels_resolve() -> Result<()> {
    for (label, name) in [
        ("UTF-8", "UTF-8"),
        ("latin1", "windows-1252"),
        ("ISO-8859-1", "windows-1252"),
        ("utf-16", "UTF-16LE"),
        ("UTF-16BE", "UTF-16BE"),
    ] {
        let schema = Schema::core("taxa.txt").encoding(label).build()?;
        assert_eq!(schema.encoding().name(), name, "label {label}");
    }
    Ok(())
}

#[test]
fn empty_terminators_are_rejected() {
    assert!(Schema::core("a.txt").line_terminator("").build().is_err());
    assert!(Schema::core("a.txt").field_terminator("").build().is_err());
}

#[test]
fn multi_character_field_terminator_needs_empty_enclosure() -> Result<()> {
    let err = Schema::core("a.txt").field_terminator("||").build().unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidSchema(_)));

    let schema = Schema::core("a.txt")
        .id_column(0)
        .field(FieldSpec::column(SCIENTIFIC_NAME, 1))
        .field_terminator("||")
        .field_enclosure("")
        .build()?;
    let (_dir, file) = data_file_fixture(b"1||Betta splendens||x\n", schema)?;
    let row = file.row_at(0)?;
    assert_eq!(row.raw_fields(), ["1", "Betta splendens", "x"]);
    assert_eq!(row.get(SCIENTIFIC_NAME), Some("Betta splendens"));
    Ok(())
}

#[test]
fn accessors_reflect_builder() -> Result<()> {
    let schema = taxa_schema()?;
    assert_eq!(schema.role(), FileRole::Core);
    assert_eq!(schema.id_column(), Some(0));
    assert_eq!(schema.link_key_column(), None);
    assert_eq!(schema.header_lines(), 1);
    assert_eq!(schema.field_terminator(), "\t");
    assert_eq!(schema.field_enclosure(), "");
    assert_eq!(schema.line_terminator(), "\n");
    assert_eq!(schema.row_type(), Some(TAXON_ROW_TYPE));
    assert_eq!(schema.terms().len(), 3);
    assert!(schema.contains_term(COUNTRY));
    assert_eq!(schema.short_headers(), vec!["id", "scientificName", "kingdom"]);
    Ok(())
}

#[test]
fn builder_defaults() -> Result<()> {
    let schema = Schema::extension("x.txt", 1).build()?;
    assert!(schema.is_extension());
    assert_eq!(schema.link_key_column(), Some(1));
    assert_eq!(schema.encoding().name(), "UTF-8");
    assert_eq!(schema.field_terminator(), ",");
    assert_eq!(schema.field_enclosure(), "\"");
    assert_eq!(schema.header_lines(), 0);
    Ok(())
}
