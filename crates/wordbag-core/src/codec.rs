//! Compact binary format for document-term matrices
//!
//! Layout: magic `WBDT`, a version byte, row and column counts as
//! little-endian `u32`, then for each row a varint entry count followed by
//! `(column delta, count)` varint pairs. Column deltas are taken against the
//! previous column of the same row, starting from zero.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::DocumentTermMatrix;

const MAGIC: &[u8; 4] = b"WBDT";
const VERSION: u8 = 1;

/// Write a VByte integer (7 bits per byte, high bit set on all but the last)
pub fn write_varint(mut value: u64, writer: &mut impl Write) -> io::Result<usize> {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        written += 1;
        if value == 0 {
            return Ok(written);
        }
    }
}

pub fn read_varint(reader: &mut impl Read) -> io::Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint overflow"));
        }
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Codec(format!("{what} {value} exceeds u32 range")))
}

pub fn write_matrix(matrix: &DocumentTermMatrix, writer: &mut impl Write) -> Result<()> {
    let (rows, cols) = matrix.shape();
    writer.write_all(MAGIC)?;
    writer.write_u8(VERSION)?;
    writer.write_u32::<LittleEndian>(to_u32(rows, "row count")?)?;
    writer.write_u32::<LittleEndian>(to_u32(cols, "column count")?)?;

    let mut bytes = 13;
    for row in matrix.rows() {
        bytes += write_varint(row.nnz() as u64, writer)?;
        let mut prev = 0;
        for (col, count) in row.iter() {
            bytes += write_varint((col - prev) as u64, writer)?;
            bytes += write_varint(u64::from(count), writer)?;
            prev = col;
        }
    }
    writer.flush()?;
    debug!(rows, cols, nnz = matrix.nnz(), bytes, "Matrix encoded");
    Ok(())
}

pub fn read_matrix(reader: &mut impl Read) -> Result<DocumentTermMatrix> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(truncated)?;
    if &magic != MAGIC {
        return Err(Error::Codec("bad magic".to_string()));
    }
    let version = reader.read_u8().map_err(truncated)?;
    if version != VERSION {
        return Err(Error::Codec(format!("unsupported version {version}")));
    }
    let n_rows = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
    let n_cols = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;

    let mut rows = Vec::with_capacity(n_rows.min(1 << 16));
    for row_idx in 0..n_rows {
        let nnz = read_varint(reader).map_err(truncated)? as usize;
        if nnz > n_cols {
            return Err(Error::Codec(format!(
                "row {row_idx} has {nnz} entries for {n_cols} columns"
            )));
        }
        let mut row = Vec::with_capacity(nnz.min(1 << 16));
        let mut col = 0usize;
        for i in 0..nnz {
            let delta = read_varint(reader).map_err(truncated)? as usize;
            if i > 0 && delta == 0 {
                return Err(Error::Codec(format!("row {row_idx} has repeated column {col}")));
            }
            col = col
                .checked_add(delta)
                .filter(|&c| c < n_cols)
                .ok_or_else(|| Error::Codec(format!("row {row_idx} column out of range")))?;
            let count = u32::try_from(read_varint(reader).map_err(truncated)?)
                .map_err(|_| Error::Codec(format!("row {row_idx} count exceeds u32 range")))?;
            if count == 0 {
                return Err(Error::Codec(format!("row {row_idx} stores an explicit zero")));
            }
            row.push((col, count));
        }
        rows.push(row);
    }

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(Error::Codec("trailing bytes after matrix".to_string()));
    }
    Ok(DocumentTermMatrix::from_sorted_rows(n_cols, rows, None))
}

fn truncated(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Codec("unexpected end of matrix data".to_string())
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> DocumentTermMatrix {
        DocumentTermMatrix::from_sorted_rows(
            300,
            vec![vec![(0, 2), (5, 1), (299, 70_000)], vec![], vec![(128, 3)]],
            Some(42),
        )
    }

    #[test]
    fn test_varint_boundaries() {
        for &value in &[0u64, 1, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            let len = write_varint(value, &mut buf).unwrap();
            assert_eq!(len, buf.len());
            assert_eq!(read_varint(&mut Cursor::new(&buf)).unwrap(), value);
        }
    }

    #[test]
    fn test_matrix_roundtrip_drops_fingerprint() {
        let matrix = sample();
        let mut buf = Vec::new();
        write_matrix(&matrix, &mut buf).unwrap();
        let decoded = read_matrix(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.to_dense(), matrix.to_dense());
        assert_eq!(decoded.fingerprint(), None);
    }

    #[test]
    fn test_sparse_rows_are_compact() {
        let mut buf = Vec::new();
        write_matrix(&sample(), &mut buf).unwrap();
        // dense u32 storage would need 3 * 300 * 4 bytes
        assert!(buf.len() < 40);
    }

    #[test]
    fn test_truncated_input() {
        let mut buf = Vec::new();
        write_matrix(&sample(), &mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            read_matrix(&mut Cursor::new(&buf)),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_bad_magic() {
        let buf = b"NOPE\x01\0\0\0\0\0\0\0\0".to_vec();
        assert!(matches!(
            read_matrix(&mut Cursor::new(&buf)),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_column_out_of_range() {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 1]); // one entry at column 2 of 2
        assert!(matches!(
            read_matrix(&mut Cursor::new(&buf)),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_huge_entry_count_is_codec_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]); // u32::MAX entries, none present
        assert!(matches!(
            read_matrix(&mut Cursor::new(&buf)),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut buf = Vec::new();
        write_matrix(&DocumentTermMatrix::empty(3), &mut buf).unwrap();
        buf.push(0);
        assert!(read_matrix(&mut Cursor::new(&buf)).is_err());
    }
}
