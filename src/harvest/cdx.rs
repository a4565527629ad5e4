//! Index feed (CDX) line parsing.
//!
//! A well-formed record is seven fields separated by single spaces:
//!
//! ```text
//! urlkey timestamp original mimetype statuscode digest length
//! ```
//!
//! Only `timestamp` (1), `original` (2) and `digest` (5) are kept.

use thiserror::Error;

use crate::model::SnapshotDescriptor;

/// Number of fields in a well-formed index feed record.
pub const CDX_FIELD_COUNT: usize = 7;

const TIMESTAMP_FIELD: usize = 1;
const URL_FIELD: usize = 2;
const DIGEST_FIELD: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid field count: expected {CDX_FIELD_COUNT}, got {0}")]
    InvalidFieldCount(usize),
    #[error("empty {0} field")]
    EmptyField(&'static str),
}

/// Parses one line of the index feed.
pub fn parse_line(line: &str) -> Result<SnapshotDescriptor, ParseError> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != CDX_FIELD_COUNT {
        return Err(ParseError::InvalidFieldCount(fields.len()));
    }

    let timestamp = fields[TIMESTAMP_FIELD];
    if timestamp.is_empty() {
        return Err(ParseError::EmptyField("timestamp"));
    }
    let url = fields[URL_FIELD];
    if url.is_empty() {
        return Err(ParseError::EmptyField("url"));
    }

    Ok(SnapshotDescriptor {
        timestamp: timestamp.to_string(),
        url: url.to_string(),
        digest: fields[DIGEST_FIELD].to_string(),
    })
}
