use anyhow::Result;
use dwca_engine::testing::*;
use dwca_engine::{ArchiveError, FieldSpec, Schema};

fn plain_core(header_lines: usize) -> Result<Schema> {
    Ok(Schema::core("plain.txt")
        .id_column(0)
        .field(FieldSpec::column("name", 1))
        .header_lines(header_lines)
        .build()?)
}

#[test]
fn fixture_files_round_trip() -> Result<()> {
    let fixture = star_archive()?;
    for location in ["taxa.txt", "description.txt", "vernacular.txt"] {
        let file = fixture.open_file(location)?;
        check_round_trip(&file)?;
    }
    Ok(())
}

#[test]
fn offsets_cover_every_physical_line() -> Result<()> {
    let contents = b"id,name\n1,a\n2,b\n3,c\n";
    for (header_lines, rows) in [(0, 4), (1, 3), (3, 1), (4, 0), (9, 0)] {
        let (_dir, file) = data_file_fixture(contents, plain_core(header_lines)?)?;
        assert_eq!(file.physical_line_count(), 4, "header_lines={header_lines}");
        assert_eq!(file.offsets(), &[0, 8, 12, 16]);
        assert_eq!(file.row_count(), rows, "header_lines={header_lines}");
        assert_eq!(file.lines().count(), rows);
    }
    Ok(())
}

#[test]
fn last_line_without_terminator_is_kept() -> Result<()> {
    let (_dir, file) = data_file_fixture(b"1,a\n2,b", plain_core(0)?)?;
    assert_eq!(file.row_count(), 2);
    assert_eq!(file.line_at(0)?, "1,a\n");
    assert_eq!(file.line_at(1)?, "2,b");
    assert_eq!(file.row_at(1)?.get("name"), Some("b"));
    Ok(())
}

#[test]
fn empty_file_has_no_rows() -> Result<()> {
    let (_dir, file) = data_file_fixture(b"", plain_core(1)?)?;
    assert_eq!(file.physical_line_count(), 0);
    assert_eq!(file.row_count(), 0);
    assert!(file.lines().next().is_none());
    Ok(())
}

#[test]
fn line_at_row_count_is_out_of_range() -> Result<()> {
    let fixture = star_archive()?;
    let file = fixture.open_file("taxa.txt")?;
    assert_eq!(file.row_count(), 4);
    let err = file.line_at(file.row_count()).unwrap_err();
    assert!(err.is_out_of_range());
    assert!(matches!(
        err,
        ArchiveError::RowNotFound {
            position: 4,
            row_count: 4,
            ..
        }
    ));
    assert!(file.row_at(usize::MAX).unwrap_err().is_out_of_range());
    Ok(())
}

#[test]
fn random_access_matches_file_content() -> Result<()> {
    let fixture = star_archive()?;
    let file = fixture.open_file("taxa.txt")?;
    assert_eq!(file.line_at(3)?, "4\tBetta splendens\tAnimalia\n");
    assert_eq!(file.line_at(0)?, "1\tStruthio camelus\tAnimalia\n");
    assert_eq!(file.line_at(3)?, "4\tBetta splendens\tAnimalia\n");
    Ok(())
}

#[test]
fn interleaved_cursors_do_not_disturb_each_other() -> Result<()> {
    let fixture = star_archive()?;
    let file = fixture.open_file("vernacular.txt")?;
    let mut first = file.lines();
    let mut second = file.lines();
    second.next().transpose()?;
    second.next().transpose()?;

    assert_eq!(first.next().transpose()?.as_deref(), Some("1\tOstrich\ten\tZA\n"));
    assert_eq!(second.next().transpose()?.as_deref(), Some("1\tStruisvogel\tnl\tBE\n"));
    assert_eq!(file.line_at(3)?, "2\tAmerican alligator\ten\tUS\n");
    assert_eq!(first.next().transpose()?.as_deref(), Some("1\tAutruche\tfr\tBE\n"));
    assert_eq!(first.position(), 2);
    Ok(())
}

#[test]
fn iteration_is_repeatable() -> Result<()> {
    let fixture = star_archive()?;
    let file = fixture.open_file("description.txt")?;
    let a = file.lines().collect::<dwca_engine::Result<Vec<_>>>()?;
    let b = file.lines().collect::<dwca_engine::Result<Vec<_>>>()?;
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
    Ok(())
}

#[test]
fn close_releases_handle_and_fails_reads() -> Result<()> {
    let fixture = star_archive()?;
    let file = fixture.open_file("taxa.txt")?;
    let index = file.ensure_core_id_index()?.clone();
    assert!(!file.is_closed());

    file.close();
    file.close();
    assert!(file.is_closed());

    let err = file.line_at(0).unwrap_err();
    assert!(matches!(err, ArchiveError::Closed { .. }));
    assert!(err.is_io());
    assert_eq!(file.row_count(), 4);
    assert_eq!(file.ensure_core_id_index()?, &index);

    let mut rows = file.rows();
    assert!(rows.next().is_some_and(|r| r.is_err()));
    assert!(rows.next().is_none());
    Ok(())
}

#[test]
fn missing_file_is_io_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = dwca_engine::IndexedDataFile::open_in(dir.path(), std::sync::Arc::new(plain_core(0)?))
        .unwrap_err();
    assert!(err.is_io());
    Ok(())
}

#[test]
fn utf16_offsets_are_byte_exact() -> Result<()> {
    let text = "id,name\n1,Żółw\n2,熊\n";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let schema = Schema::core("utf16.txt")
        .id_column(0)
        .field(FieldSpec::column("name", 1))
        .encoding("utf-16le")
        .header_lines(1)
        .build()?;
    let (_dir, file) = data_file_fixture(&bytes, schema)?;

    assert_eq!(file.offsets(), &[2, 18, 32]);
    assert_eq!(file.row_count(), 2);
    assert_eq!(file.line_at(1)?, "2,熊\n");
    assert_eq!(file.row_at(0)?.get("name"), Some("Żółw"));
    check_round_trip(&file)?;
    Ok(())
}

#[test]
fn latin1_bytes_are_decoded() -> Result<()> {
    let schema = Schema::core("latin1.txt")
        .id_column(0)
        .field(FieldSpec::column("name", 1))
        .encoding("latin1")
        .build()?;
    let (_dir, file) = data_file_fixture(b"1,Caf\xe9\n2,na\xefve\n3,\x80\n", schema)?;
    assert_eq!(file.offsets(), &[0, 7, 15]);
    assert_eq!(file.row_at(0)?.get("name"), Some("Café"));
    assert_eq!(file.row_at(1)?.get("name"), Some("naïve"));
    // windows-1252 rules for the latin1 label
    assert_eq!(file.row_at(2)?.get("name"), Some("€"));
    Ok(())
}

#[test]
fn utf8_bom_is_not_data() -> Result<()> {
    let (_dir, file) = data_file_fixture(b"\xef\xbb\xbf1,a\n2,b\n", plain_core(0)?)?;
    assert_eq!(file.offsets(), &[3, 7]);
    assert_eq!(file.line_at(0)?, "1,a\n");
    assert_eq!(file.row_at(0)?.join_key(), Some("1"));
    Ok(())
}

#[test]
fn crlf_terminated_file() -> Result<()> {
    let schema = Schema::core("crlf.txt")
        .id_column(0)
        .field(FieldSpec::column("name", 1))
        .line_terminator("\r\n")
        .build()?;
    let (_dir, file) = data_file_fixture(b"1,a\r\n2,b\r\n", schema)?;
    assert_eq!(file.row_count(), 2);
    assert_eq!(file.row_at(1)?.get("name"), Some("b"));
    Ok(())
}

#[test]
fn stray_carriage_return_is_data() -> Result<()> {
    let (_dir, file) = data_file_fixture(b"1,a\r\n2,b\n", plain_core(0)?)?;
    assert_eq!(file.row_at(0)?.get("name"), Some("a\r"));
    assert_eq!(file.row_at(1)?.get("name"), Some("b"));
    Ok(())
}

#[test]
fn invalidated_indexes_are_rebuilt() -> Result<()> {
    let fixture = star_archive()?;
    let mut file = fixture.open_file("description.txt")?;
    let before = file.ensure_link_key_index()?.clone();
    file.invalidate_indexes();
    assert_eq!(file.ensure_link_key_index()?, &before);
    Ok(())
}
