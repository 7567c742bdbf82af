//! Byte ranges.
//!
//! A [`ByteRange`] is a contiguous run of bytes within a source, with an offset from the start and a length.
//!
//! [`ReadRegion::byte_ranges`](crate::window::ReadRegion::byte_ranges) converts a windowed read into the byte ranges of a row-major layer.
//! [`read_byte_ranges_concat`] reads byte ranges from any seekable reader, such as a [`File`](std::fs::File).

use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ByteRange {
    offset: ByteOffset,
    length: ByteLength,
}

impl ByteRange {
    /// Create a new byte range.
    #[must_use]
    pub const fn new(offset: ByteOffset, length: ByteLength) -> Self {
        Self { offset, length }
    }

    /// Return the start of the byte range.
    #[must_use]
    pub const fn offset(&self) -> ByteOffset {
        self.offset
    }

    /// Return the length of the byte range.
    #[must_use]
    pub const fn length(&self) -> ByteLength {
        self.length
    }

    /// Return the exclusive end of the byte range, saturating at [`u64::MAX`].
    #[must_use]
    pub const fn end(&self) -> ByteOffset {
        self.offset.saturating_add(self.length)
    }

    /// Return the exclusive end of the byte range, or [`None`] if it overflows.
    #[must_use]
    pub const fn checked_end(&self) -> Option<ByteOffset> {
        self.offset.checked_add(self.length)
    }

    /// Return the byte range moved forward by `base`, saturating at [`u64::MAX`].
    #[must_use]
    pub const fn shifted(&self, base: ByteOffset) -> Self {
        Self {
            offset: self.offset.saturating_add(base),
            length: self.length,
        }
    }

    /// Convert the byte range to a [`Range<u64>`].
    #[must_use]
    pub const fn to_range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

/// An invalid byte range error.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid byte range {0} for bytes of length {1}")]
pub struct InvalidByteRangeError(ByteRange, u64);

impl InvalidByteRangeError {
    /// Create a new [`InvalidByteRangeError`].
    #[must_use]
    pub fn new(byte_range: ByteRange, bytes_len: u64) -> Self {
        Self(byte_range, bytes_len)
    }
}

/// Check that every byte range ends within `bytes_len`.
///
/// # Errors
/// Returns [`InvalidByteRangeError`] for the first byte range that extends beyond `bytes_len`.
pub fn validate_byte_ranges(
    byte_ranges: &[ByteRange],
    bytes_len: u64,
) -> Result<(), InvalidByteRangeError> {
    for byte_range in byte_ranges {
        match byte_range.checked_end() {
            Some(end) if end <= bytes_len => {}
            _ => return Err(InvalidByteRangeError(*byte_range, bytes_len)),
        }
    }
    Ok(())
}

/// Read byte ranges from `reader` and concatenate them.
///
/// Each byte range is read with one seek and one exact read.
///
/// # Errors
/// Returns an [`std::io::Error`] if seeking or reading fails, including if a byte range extends past the end of the reader.
pub fn read_byte_ranges_concat<R: Read + Seek>(
    reader: &mut R,
    byte_ranges: &[ByteRange],
) -> Result<Vec<u8>, std::io::Error> {
    let total: u64 = byte_ranges.iter().map(ByteRange::length).sum();
    let mut out = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
    for byte_range in byte_ranges {
        reader.seek(SeekFrom::Start(byte_range.offset()))?;
        let length = usize::try_from(byte_range.length())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        let start = out.len();
        out.resize(start + length, 0);
        reader.read_exact(&mut out[start..])?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn byte_range() {
        let byte_range = ByteRange::new(4, 6);
        assert_eq!(byte_range.end(), 10);
        assert_eq!(byte_range.to_range(), 4..10);
        assert_eq!(byte_range.shifted(2), ByteRange::new(6, 6));
        assert_eq!(byte_range.to_string(), "4..10");
    }

    #[test]
    fn byte_range_validate() {
        assert!(validate_byte_ranges(&[ByteRange::new(0, 4), ByteRange::new(4, 4)], 8).is_ok());
        assert!(validate_byte_ranges(&[ByteRange::new(5, 4)], 8).is_err());
        assert!(validate_byte_ranges(&[ByteRange::new(u64::MAX - 1, 4)], u64::MAX).is_err());
        assert_eq!(ByteRange::new(u64::MAX - 1, 4).checked_end(), None);
    }

    #[test]
    fn byte_range_read() {
        let mut reader = Cursor::new((0u8..16).collect::<Vec<_>>());
        let bytes = read_byte_ranges_concat(
            &mut reader,
            &[ByteRange::new(1, 2), ByteRange::new(10, 3)],
        )
        .unwrap();
        assert_eq!(bytes, vec![1, 2, 10, 11, 12]);
        assert!(read_byte_ranges_concat(&mut reader, &[ByteRange::new(15, 2)]).is_err());
    }
}
