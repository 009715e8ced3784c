//! Decoded tabular query results.
//!
//! # Design
//! A `ResultSet` is built once by a decoder and is read-only afterwards.
//! The variable list is shared (`Arc<[String]>`) between the set and every
//! row, so rows can be handed out and looked up by name without copying
//! the header. Unbound variables are stored as `None`, never as an empty
//! string.

pub mod json;
pub mod xml;

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SesameError};

pub use json::JsonResultsDecoder;
pub use xml::{write_xml, XmlResultsDecoder};

/// Turns a response body into a `ResultSet`.
pub trait ResultDecoder {
    /// MIME type of the documents this decoder understands.
    fn media_type(&self) -> &'static str;

    fn decode(&self, body: &[u8]) -> Result<ResultSet>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Uri,
    Literal,
    BlankNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LiteralTag {
    Plain,
    Language(String),
    Datatype(String),
}

/// An RDF literal. Carries a language tag or a datatype, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    value: String,
    tag: LiteralTag,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: LiteralTag::Plain,
        }
    }

    pub fn with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: LiteralTag::Language(language.into()),
        }
    }

    pub fn with_datatype(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: LiteralTag::Datatype(datatype.into()),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn language(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Language(language) => Some(language),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Datatype(datatype) => Some(datatype),
            _ => None,
        }
    }
}

/// An RDF term bound to a variable in one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingValue {
    Uri(String),
    Literal(Literal),
    BlankNode(String),
}

impl BindingValue {
    pub fn kind(&self) -> BindingKind {
        match self {
            BindingValue::Uri(_) => BindingKind::Uri,
            BindingValue::Literal(_) => BindingKind::Literal,
            BindingValue::BlankNode(_) => BindingKind::BlankNode,
        }
    }

    pub fn lexical_value(&self) -> &str {
        match self {
            BindingValue::Uri(value) | BindingValue::BlankNode(value) => value,
            BindingValue::Literal(literal) => literal.value(),
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            BindingValue::Literal(literal) => literal.language(),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            BindingValue::Literal(literal) => literal.datatype(),
            _ => None,
        }
    }
}

impl fmt::Display for BindingValue {
    /// N-Triples style rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::Uri(uri) => write!(f, "<{uri}>"),
            BindingValue::BlankNode(id) => write!(f, "_:{id}"),
            BindingValue::Literal(literal) => {
                write!(f, "\"{}\"", literal.value().escape_default())?;
                if let Some(language) = literal.language() {
                    write!(f, "@{language}")?;
                }
                if let Some(datatype) = literal.datatype() {
                    write!(f, "^^<{datatype}>")?;
                }
                Ok(())
            }
        }
    }
}

/// One solution: a value (or nothing) per declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    variables: Arc<[String]>,
    values: Vec<Option<BindingValue>>,
}

impl Row {
    /// Value bound to `variable`, `None` when unbound or not declared.
    pub fn get(&self, variable: &str) -> Option<&BindingValue> {
        let index = self.variables.iter().position(|name| name == variable)?;
        self.values.get(index)?.as_ref()
    }

    pub fn is_bound(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    /// `(variable, value)` pairs in declaration order, unbound ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&BindingValue>)> {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_ref))
    }

    pub fn values(&self) -> &[Option<BindingValue>] {
        &self.values
    }
}

/// Variables and rows of one decoded result document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    variables: Arc<[String]>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn builder<I, S>(variables: I) -> ResultSetBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = ResultSetBuilder::default();
        for variable in variables {
            builder.declare(variable);
        }
        builder
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// All values bound to `variable`, skipping rows where it is unbound.
    pub fn column<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a BindingValue> + 'a {
        self.rows.iter().filter_map(move |row| row.get(variable))
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Accumulates variables, then rows, and freezes them into a `ResultSet`.
#[derive(Debug, Default)]
pub struct ResultSetBuilder {
    variables: Vec<String>,
    rows: Vec<Vec<Option<BindingValue>>>,
}

impl ResultSetBuilder {
    /// Adds a variable unless it is already declared. Rows pushed before
    /// the declaration leave it unbound.
    pub fn declare(&mut self, variable: impl Into<String>) -> &mut Self {
        let variable = variable.into();
        if !self.variables.contains(&variable) {
            self.variables.push(variable);
            for row in &mut self.rows {
                row.push(None);
            }
        }
        self
    }

    pub fn variable_index(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|name| name == variable)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Appends a row given as `(variable, value)` pairs. Variables missing
    /// from `bindings` are unbound in the row.
    pub fn push_row<I, S>(&mut self, bindings: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, BindingValue)>,
        S: AsRef<str>,
    {
        let row_index = self.rows.len();
        let mut values = vec![None; self.variables.len()];
        for (variable, value) in bindings {
            let variable = variable.as_ref();
            let index = self.variable_index(variable).ok_or_else(|| {
                SesameError::decode(
                    Some(row_index),
                    format!("binding `{variable}`"),
                    format!("variable `{variable}` is not declared"),
                )
            })?;
            if values[index].is_some() {
                return Err(SesameError::decode(
                    Some(row_index),
                    format!("binding `{variable}`"),
                    format!("variable `{variable}` is bound twice"),
                ));
            }
            values[index] = Some(value);
        }
        self.rows.push(values);
        Ok(self)
    }

    /// Appends a row whose values are already aligned with the declared
    /// variables.
    pub(crate) fn push_values(&mut self, mut values: Vec<Option<BindingValue>>) {
        values.resize(self.variables.len(), None);
        self.rows.push(values);
    }

    pub fn build(self) -> ResultSet {
        let variables: Arc<[String]> = self.variables.into();
        let rows = self
            .rows
            .into_iter()
            .map(|values| Row {
                variables: Arc::clone(&variables),
                values,
            })
            .collect();
        ResultSet { variables, rows }
    }
}
