//! Carelink Record Parser
//!
//! Splits one export line into fields and maps them onto the fixed column
//! schema. The exporter quotes some fields (`"A,B"`) but never escapes quotes,
//! so the tokenizer is deliberately simpler than a general CSV reader:
//!
//! - leading spaces before a field are skipped
//! - a quoted field runs to the next `"`; only spaces may follow before the
//!   next comma or end of line
//! - an unquoted field runs to the next comma and is trimmed
//!
//! Lines whose first field is not a `digits.digits` row index are header or
//! metadata lines and are skipped without error.

use crate::types::RawRecord;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Tokenizer errors. Positions are byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unclosed quote starting at column {position}")]
    UnclosedQuote { position: usize },

    #[error("Expected comma at column {position}, found '{found}'")]
    ExpectedComma { position: usize, found: char },
}

fn record_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+").expect("record index pattern is valid"))
}

/// Whether `line` starts with the device's `digits.digits` row index.
pub fn is_record_line(line: &str) -> bool {
    record_line_pattern().is_match(line)
}

/// Split a line into raw field values.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        i = skip_spaces(bytes, i);

        if bytes.get(i) == Some(&b'"') {
            let start = i + 1;
            let end = line[start..]
                .find('"')
                .map(|offset| start + offset)
                .ok_or(ParseError::UnclosedQuote { position: i })?;
            fields.push(line[start..end].to_string());

            i = skip_spaces(bytes, end + 1);
            match bytes.get(i) {
                None => break,
                Some(b',') => i += 1,
                Some(_) => {
                    let found = line[i..].chars().next().unwrap_or_default();
                    return Err(ParseError::ExpectedComma { position: i, found });
                }
            }
        } else if let Some(offset) = line[i..].find(',') {
            fields.push(line[i..i + offset].trim().to_string());
            i += offset + 1;
        } else {
            fields.push(line[i..].trim().to_string());
            break;
        }
    }

    Ok(fields)
}

/// Parse a data line into a [`RawRecord`].
///
/// Returns `Ok(None)` for header/metadata lines.
pub fn parse_line(line: &str) -> Result<Option<RawRecord>, ParseError> {
    if !is_record_line(line) {
        return Ok(None);
    }
    let fields = tokenize(line)?;
    Ok(Some(RawRecord::from_fields(&fields)))
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i) == Some(&b' ') {
        i += 1;
    }
    i
}
