//! Status value parsing.
//!
//! MySQL reports every status cell as text. Booleans come as `Yes`/`No` or
//! `ON`/`OFF`, binary log positions as file names such as `mysql-bin.000123`,
//! and everything else is expected to be a plain number.

use regex::bytes::Regex;

use crate::error::SetupError;

/// Rotated log file name: anything, a dot, then the sequence number.
const LOG_FILE_PATTERN: &str = r"^.+\.(\d+)$";

/// Converts raw status cells into numeric values.
#[derive(Debug, Clone)]
pub struct StatusParser {
    log_file: Regex,
}

impl StatusParser {
    pub fn new() -> Result<Self, SetupError> {
        Ok(Self {
            log_file: Regex::new(LOG_FILE_PATTERN)?,
        })
    }

    /// Parses one cell. `None` means the cell is unparseable and must not be
    /// reported at all.
    ///
    /// A value that is already a well-formed number is never reinterpreted as
    /// a log file suffix, so `3.14` stays `3.14`.
    pub fn parse(&self, raw: &[u8]) -> Option<f64> {
        match raw {
            b"Yes" | b"ON" => return Some(1.0),
            b"No" | b"OFF" => return Some(0.0),
            _ => {}
        }

        let direct = parse_number(raw);
        if direct.is_none()
            && let Some(caps) = self.log_file.captures(raw)
            && let Some(seq) = caps.get(1)
        {
            return parse_number(seq.as_bytes());
        }
        direct
    }

    /// Parses an optional cell; SQL NULL is unparseable.
    pub fn parse_cell(&self, cell: Option<&[u8]>) -> Option<f64> {
        cell.and_then(|raw| self.parse(raw))
    }
}

fn parse_number(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw)
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
