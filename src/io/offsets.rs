//! Line-offset scanning over encoded bytes.
//!
//! The scan works on the raw bytes of the file and looks for the line
//! terminator *as encoded in the file's encoding*, so each recorded offset is an
//! exact byte position usable with `Seek`. Character counts never enter the
//! computation, which keeps random access correct for multi-byte encodings.
//!
//! Rules:
//! - one offset per physical line, header lines included;
//! - a trailing terminator at end of file does not start an extra line;
//! - a byte-order mark matching the declared encoding is skipped, so line 0
//!   starts right after it;
//! - for UTF-16 a terminator only counts when it ends on a code-unit boundary.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::io::{self, BufRead};

/// Encode `terminator` the way it appears in a file of `encoding`.
///
/// `encoding_rs` has no UTF-16 encoder (its output encoding for UTF-16 is
/// UTF-8), so UTF-16 code units are serialized here.
pub fn encode_terminator(encoding: &'static Encoding, terminator: &str) -> Vec<u8> {
    if encoding == UTF_16LE {
        terminator
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect()
    } else if encoding == UTF_16BE {
        terminator
            .encode_utf16()
            .flat_map(u16::to_be_bytes)
            .collect()
    } else {
        let (bytes, _, _) = encoding.encode(terminator);
        bytes.into_owned()
    }
}

/// Width in bytes of the encoding's code unit for alignment purposes.
pub fn code_unit_width(encoding: &'static Encoding) -> usize {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        2
    } else {
        1
    }
}

/// Scan `reader` from its current position and return the start offset of
/// every physical line.
///
/// Offsets are absolute, counted from the position the reader was at when
/// the scan began (normally the start of the file).
///
/// # Errors
/// Propagates read errors from `reader`.
pub fn scan_line_offsets<R: BufRead>(
    mut reader: R,
    encoding: &'static Encoding,
    terminator: &str,
) -> io::Result<Vec<u64>> {
    let term = encode_terminator(encoding, terminator);
    let unit = code_unit_width(encoding);
    let Some(&last) = term.last() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty line terminator",
        ));
    };

    let bom = {
        let head = reader.fill_buf()?;
        match Encoding::for_bom(head) {
            Some((bom_encoding, len)) if bom_encoding == encoding => len,
            _ => 0,
        }
    };
    reader.consume(bom);

    let mut offsets = Vec::new();
    let mut offset = bom as u64;
    let mut line = Vec::new();
    loop {
        let read = reader.read_until(last, &mut line)?;
        if read == 0 {
            if !line.is_empty() {
                offsets.push(offset);
            }
            break;
        }
        if line.ends_with(&term) && line.len() % unit == 0 {
            offsets.push(offset);
            offset += line.len() as u64;
            line.clear();
        }
    }
    Ok(offsets)
}
