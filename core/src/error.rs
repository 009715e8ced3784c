//! Error types for the Sesame protocol client.
//!
//! # Design
//! The taxonomy is closed so callers can branch on the kind of failure
//! instead of matching message text. `Config`, `InvalidArgument` and
//! `UnsupportedFormat` are raised before any request leaves the process.
//! `Protocol` and `Decode` only happen after the server has seen the
//! request, so the remote side may already have applied a mutation.

use thiserror::Error;

use crate::http::Operation;

/// Errors returned by every client operation.
#[derive(Error, Debug)]
pub enum SesameError {
    /// Endpoint configuration is incomplete, e.g. no repository selected.
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller-supplied argument is invalid (query language, input format,
    /// empty prefix or file path).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested result format has no decoder.
    #[error("unsupported result format: {0}")]
    UnsupportedFormat(String),

    /// The server answered with a status outside the operation's contract.
    #[error("{operation} failed with HTTP {status}")]
    Protocol {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// The response body is not a well-formed result document.
    #[error("malformed result document{}: {message} (at `{fragment}`)", row_suffix(.row))]
    Decode {
        row: Option<usize>,
        fragment: String,
        message: String,
    },

    /// The underlying transport could not complete the round-trip.
    #[error("transport error: {0}")]
    Transport(String),
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(index) => format!(" in row {index}"),
        None => String::new(),
    }
}

impl SesameError {
    /// HTTP status observed for a `Protocol` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            SesameError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn decode(row: Option<usize>, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        SesameError::Decode {
            row,
            fragment: fragment.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SesameError>;
