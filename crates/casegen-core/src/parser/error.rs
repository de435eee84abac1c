use thiserror::Error;

use super::Format;
use crate::model::ValidationError;

/// Errors raised by the format parsers.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed {0} content: {1}")]
    MalformedStructured(Format, String),

    #[error("No parsable test case content found")]
    NoParsableContent,
}

/// A single record or section that could not become a test case.
///
/// Always recovered locally: the record is skipped and parsing continues.
#[derive(Debug, Error)]
pub enum MalformedInput {
    #[error("record has no recognizable test case fields")]
    Unrecognized,

    #[error("record failed validation: {0}")]
    Invalid(#[from] ValidationError),
}
