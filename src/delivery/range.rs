//! `Range` header parsing for single `bytes=` ranges.

use thiserror::Error;

/// Why a `Range` header could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("unsupported range unit, expected 'bytes='")]
    UnsupportedUnit,
    #[error("multiple ranges are not supported")]
    MultipleRanges,
    #[error("missing range start")]
    MissingStart,
    #[error("invalid range bound '{0}'")]
    InvalidBound(String),
    #[error("header value is not valid ASCII")]
    NotAscii,
}

/// A parsed `bytes=start-end` header; `end` absent means end of file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parse a header value such as `bytes=100-199` or `bytes=100-`.
    ///
    /// Suffix ranges (`bytes=-500`) and multi-range requests are rejected.
    pub fn parse(value: &str) -> Result<Self, RangeParseError> {
        let spec = value
            .trim()
            .strip_prefix("bytes=")
            .ok_or(RangeParseError::UnsupportedUnit)?
            .trim();

        if spec.contains(',') {
            return Err(RangeParseError::MultipleRanges);
        }

        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| RangeParseError::InvalidBound(spec.to_string()))?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            return Err(RangeParseError::MissingStart);
        }

        Ok(Self {
            start: parse_bound(start)?,
            end: if end.is_empty() {
                None
            } else {
                Some(parse_bound(end)?)
            },
        })
    }

    /// Resolve against a resource of `size` bytes.
    ///
    /// Returns the inclusive `(start, end)` pair, or `None` when the range
    /// falls outside `[0, size - 1]` or `start > end`.
    pub fn resolve(&self, size: u64) -> Option<(u64, u64)> {
        if size == 0 {
            return None;
        }
        let last = size - 1;
        let end = self.end.unwrap_or(last);
        (self.start <= end && end <= last).then_some((self.start, end))
    }
}

fn parse_bound(raw: &str) -> Result<u64, RangeParseError> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeParseError::InvalidBound(raw.to_string()));
    }
    raw.parse::<u64>()
        .map_err(|_| RangeParseError::InvalidBound(raw.to_string()))
}
