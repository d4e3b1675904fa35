//! Error types for the analysis engine

use thiserror::Error;

/// Errors raised while validating or decoding configuration.
///
/// This is the only error class surfaced to callers: it stops engine
/// construction before any analysis pass begins. Everything that can go
/// wrong during a pass (unparsable SQL, a bad record, a failing analyzer)
/// is recovered internally and at worst reduces the number of reported
/// issues.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid threshold for {analyzer}.{key}: {value}")]
    InvalidThreshold {
        analyzer: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("Failed to decode configuration: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that can occur while parsing SQL with the grammar parser.
///
/// Never surfaced: every caller falls back to regex-based extraction when
/// the grammar path fails.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SQL grammar error: {0}")]
    Grammar(String),

    #[error("Unsupported statement")]
    UnsupportedStatement,

    #[error("Empty statement")]
    EmptyStatement,
}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        ParseError::Grammar(err.to_string())
    }
}

/// Result type alias for SQL parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
