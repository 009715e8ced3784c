//! Enumerated wire values: query languages, RDF input formats, result
//! formats and context identifiers.
//!
//! Every value the server understands has a variant here; parsing a string
//! that is not in the set fails before a request is built.

use std::fmt;
use std::str::FromStr;

use crate::error::SesameError;
use crate::request::urlencode;

/// Query language accepted by the query endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryLanguage {
    #[default]
    Sparql,
    Serql,
}

impl QueryLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryLanguage::Sparql => "sparql",
            QueryLanguage::Serql => "serql",
        }
    }
}

impl FromStr for QueryLanguage {
    type Err = SesameError;

    /// Only the exact strings `sparql` and `serql` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sparql" => Ok(QueryLanguage::Sparql),
            "serql" => Ok(QueryLanguage::Serql),
            other => Err(SesameError::InvalidArgument(format!(
                "query language must be `sparql` or `serql`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RDF serialization of statements sent to append/overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    RdfXml,
    NTriples,
    Turtle,
    N3,
    TriX,
    TriG,
}

impl InputFormat {
    pub const ALL: [InputFormat; 6] = [
        InputFormat::RdfXml,
        InputFormat::NTriples,
        InputFormat::Turtle,
        InputFormat::N3,
        InputFormat::TriX,
        InputFormat::TriG,
    ];

    pub fn mime_type(self) -> &'static str {
        match self {
            InputFormat::RdfXml => "application/rdf+xml",
            InputFormat::NTriples => "text/plain",
            InputFormat::Turtle => "application/x-turtle",
            InputFormat::N3 => "text/rdf+n3",
            InputFormat::TriX => "application/trix",
            InputFormat::TriG => "application/x-trig",
        }
    }
}

impl FromStr for InputFormat {
    type Err = SesameError;

    /// Parses a MIME type string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputFormat::ALL
            .into_iter()
            .find(|format| format.mime_type() == s)
            .ok_or_else(|| SesameError::InvalidArgument(format!("unknown input format `{s}`")))
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Result serializations the server can produce for tabular answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    #[default]
    SparqlXml,
    SparqlJson,
    BinaryTable,
    Boolean,
}

impl ResultFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ResultFormat::SparqlXml => "application/sparql-results+xml",
            ResultFormat::SparqlJson => "application/sparql-results+json",
            ResultFormat::BinaryTable => "application/x-binary-rdf-results-table",
            ResultFormat::Boolean => "text/boolean",
        }
    }

    /// Maps a MIME type to a variant. Strings outside the known set fail with
    /// `UnsupportedFormat`.
    pub fn from_mime(s: &str) -> Result<Self, SesameError> {
        [
            ResultFormat::SparqlXml,
            ResultFormat::SparqlJson,
            ResultFormat::BinaryTable,
            ResultFormat::Boolean,
        ]
        .into_iter()
        .find(|format| format.mime_type() == s)
        .ok_or_else(|| SesameError::UnsupportedFormat(s.to_string()))
    }

    /// Fails with `UnsupportedFormat` for every format except SPARQL XML,
    /// the only one the query and contexts endpoints are asked for.
    pub fn ensure_negotiable(self) -> Result<(), SesameError> {
        match self {
            ResultFormat::SparqlXml => Ok(()),
            other => Err(SesameError::UnsupportedFormat(other.mime_type().to_string())),
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Named graph selector for statement and size operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Context {
    /// The default graph, sent as the literal `null`.
    #[default]
    Default,
    /// A named graph URI, with or without surrounding angle brackets.
    Named(String),
}

impl Context {
    pub const NULL: &'static str = "null";

    /// `"null"` selects the default graph; anything else is a graph URI.
    pub fn parse(value: &str) -> Self {
        if value == Self::NULL {
            Context::Default
        } else {
            Context::Named(value.to_string())
        }
    }

    /// Query-string form: `null`, or the URI wrapped in `<>` (unless already
    /// wrapped) and URL-encoded.
    pub fn encoded(&self) -> String {
        match self {
            Context::Default => Self::NULL.to_string(),
            Context::Named(uri) => {
                if uri.starts_with('<') && uri.ends_with('>') {
                    urlencode(uri)
                } else {
                    urlencode(&format!("<{uri}>"))
                }
            }
        }
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        Context::parse(value)
    }
}
