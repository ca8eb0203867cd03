//! Single-range `Range` header parsing
//!
//! Only the single-range forms `bytes=A-B` and `bytes=A-` are
//! recognized. Multi-range (comma-separated) requests fall out of the
//! grammar naturally: the text after the first dash stops parsing as an
//! integer and the header is rejected as malformed.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Not a single `bytes=A-B` / `bytes=A-` header: respond 400.
    #[error("invalid range header: {0}")]
    Malformed(String),

    /// Syntactically valid but outside the file: respond 416.
    #[error("unsatisfiable range {start}-{end} for size {size}")]
    Unsatisfiable { start: u64, end: u64, size: u64 },
}

/// An inclusive byte window resolved against a concrete file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window (`end` is inclusive).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse a `Range` header value against a file of `size` bytes.
    ///
    /// An omitted end defaults to the last byte of the file. The window
    /// must satisfy `start <= end < size` or the range is unsatisfiable.
    pub fn parse(header: &str, size: u64) -> Result<ByteRange, RangeError> {
        let malformed = || RangeError::Malformed(header.to_string());

        let spec = header.strip_prefix("bytes=").ok_or_else(malformed)?;
        let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;

        let start: u64 = start_str.parse().map_err(|_| malformed())?;

        let end: u64 = if end_str.is_empty() {
            size.checked_sub(1)
                .ok_or(RangeError::Unsatisfiable {
                    start,
                    end: 0,
                    size,
                })?
        } else {
            end_str.parse().map_err(|_| malformed())?
        };

        if start > end || end >= size {
            return Err(RangeError::Unsatisfiable { start, end, size });
        }

        Ok(ByteRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_range() {
        let range = ByteRange::parse("bytes=0-99", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 99 });
        assert_eq!(range.len(), 100);
    }

    #[test]
    fn test_open_ended_range_runs_to_last_byte() {
        let range = ByteRange::parse("bytes=500-", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
        assert_eq!(range.len(), 500);
    }

    #[test]
    fn test_end_past_file_is_unsatisfiable() {
        assert_eq!(
            ByteRange::parse("bytes=900-1000", 1000),
            Err(RangeError::Unsatisfiable {
                start: 900,
                end: 1000,
                size: 1000
            })
        );
    }

    #[test]
    fn test_inverted_range_is_unsatisfiable() {
        assert!(matches!(
            ByteRange::parse("bytes=10-5", 1000),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn test_non_numeric_start_is_malformed() {
        assert!(matches!(
            ByteRange::parse("bytes=abc-10", 1000),
            Err(RangeError::Malformed(_))
        ));
    }

    #[test]
    fn test_suffix_form_is_malformed() {
        // `bytes=-500` has no start byte; the grammar requires one
        assert!(matches!(
            ByteRange::parse("bytes=-500", 1000),
            Err(RangeError::Malformed(_))
        ));
    }

    #[test]
    fn test_multi_range_is_malformed() {
        assert!(matches!(
            ByteRange::parse("bytes=0-10,20-30", 1000),
            Err(RangeError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_unit_is_malformed() {
        assert!(matches!(
            ByteRange::parse("0-99", 1000),
            Err(RangeError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_file_has_no_satisfiable_range() {
        assert!(matches!(
            ByteRange::parse("bytes=0-", 0),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn test_last_byte_of_file() {
        let range = ByteRange::parse("bytes=999-999", 1000).unwrap();
        assert_eq!(range.len(), 1);
    }
}
