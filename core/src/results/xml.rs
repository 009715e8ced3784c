//! SPARQL Query Results XML Format (`application/sparql-results+xml`).
//!
//! Decoding is eager: the whole document is walked once with a pull parser
//! and either every row is accepted or the document is rejected. A
//! recognised element in an unexpected shape (binding without a value,
//! literal with both `xml:lang` and `datatype`, binding for an undeclared
//! variable) fails the whole decode.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use super::{BindingValue, Literal, ResultDecoder, ResultSet, ResultSetBuilder};
use crate::error::{Result, SesameError};
use crate::format::ResultFormat;

pub const SPARQL_RESULTS_NS: &str = "http://www.w3.org/2005/sparql-results#";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlResultsDecoder;

impl ResultDecoder for XmlResultsDecoder {
    fn media_type(&self) -> &'static str {
        ResultFormat::SparqlXml.mime_type()
    }

    fn decode(&self, body: &[u8]) -> Result<ResultSet> {
        let text = std::str::from_utf8(body)
            .map_err(|e| SesameError::decode(None, "document", format!("invalid UTF-8: {e}")))?;
        let results = XmlWalker::default().run(text)?;
        trace!(
            variables = results.variables().len(),
            rows = results.len(),
            "decoded sparql-results+xml"
        );
        Ok(results)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Uri,
    Literal,
    BlankNode,
}

/// Term element currently open inside a `<binding>`.
#[derive(Debug)]
struct OpenTerm {
    term: Term,
    language: Option<String>,
    datatype: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct XmlWalker {
    builder: ResultSetBuilder,
    seen_root: bool,
    /// Elements opened and not yet closed, the root included.
    depth: usize,
    in_head: bool,
    /// Set once `</head>` or any result content has been read; the
    /// variable list is frozen from then on.
    head_done: bool,
    /// Index of the `<result>` being read.
    row: Option<usize>,
    rows_read: usize,
    current: Vec<Option<BindingValue>>,
    /// Variable index and start tag of the open `<binding>`.
    binding: Option<(usize, String)>,
    value: Option<BindingValue>,
    term: Option<OpenTerm>,
}

fn fragment(e: &BytesStart<'_>) -> String {
    format!("<{}>", String::from_utf8_lossy(e))
}

impl XmlWalker {
    fn run(mut self, text: &str) -> Result<ResultSet> {
        let mut reader = Reader::from_str(text);
        loop {
            let event = reader.read_event().map_err(|e| {
                SesameError::decode(
                    self.row,
                    format!("byte {}", reader.buffer_position()),
                    e.to_string(),
                )
            })?;
            match event {
                Event::Start(e) => {
                    self.start(&e, false)?;
                    self.depth += 1;
                }
                Event::Empty(e) => {
                    self.start(&e, true)?;
                    self.end(e.local_name().as_ref())?;
                }
                Event::End(e) => {
                    self.end(e.local_name().as_ref())?;
                    self.depth = self.depth.saturating_sub(1);
                }
                Event::Text(e) => {
                    if let Some(term) = self.term.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(|err| SesameError::decode(self.row, "text", err.to_string()))?;
                        term.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(term) = self.term.as_mut() {
                        term.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !self.seen_root {
            return Err(SesameError::decode(None, "document", "missing <sparql> root element"));
        }
        if self.depth > 0 || self.row.is_some() || self.binding.is_some() || self.term.is_some() {
            return Err(SesameError::decode(
                self.row,
                format!("byte {}", text.len()),
                format!("document ends with {} unclosed element(s)", self.depth),
            ));
        }
        Ok(self.builder.build())
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = e.local_name();
        if !self.seen_root {
            if name.as_ref() != b"sparql" {
                return Err(SesameError::decode(None, fragment(e), "root element must be <sparql>"));
            }
            self.seen_root = true;
            return Ok(());
        }
        match name.as_ref() {
            b"head" => {
                if self.head_done || self.row.is_some() {
                    return Err(SesameError::decode(
                        self.row,
                        fragment(e),
                        "<head> must appear once, before any result",
                    ));
                }
                self.in_head = !empty;
            }
            b"variable" if self.in_head => {
                let variable = self.attribute(e, b"name")?.ok_or_else(|| {
                    SesameError::decode(None, fragment(e), "variable without a name")
                })?;
                self.builder.declare(variable);
            }
            b"boolean" => {
                return Err(SesameError::decode(
                    None,
                    fragment(e),
                    "boolean result documents carry no binding table",
                ));
            }
            b"results" => self.head_done = true,
            b"result" => {
                if self.row.is_some() {
                    return Err(SesameError::decode(self.row, fragment(e), "<result> inside a <result>"));
                }
                self.head_done = true;
                self.row = Some(self.rows_read);
                self.current = vec![None; self.builder.variable_count()];
            }
            b"binding" if self.binding.is_some() => {
                return Err(SesameError::decode(self.row, fragment(e), "<binding> inside a <binding>"));
            }
            b"binding" if self.row.is_some() => {
                let variable = self.attribute(e, b"name")?.ok_or_else(|| {
                    SesameError::decode(self.row, fragment(e), "binding without a name")
                })?;
                let index = self.builder.variable_index(&variable).ok_or_else(|| {
                    SesameError::decode(
                        self.row,
                        fragment(e),
                        format!("variable `{variable}` is not declared"),
                    )
                })?;
                if self.current[index].is_some() {
                    return Err(SesameError::decode(
                        self.row,
                        fragment(e),
                        format!("variable `{variable}` is bound twice"),
                    ));
                }
                self.binding = Some((index, fragment(e)));
                self.value = None;
            }
            b"uri" | b"literal" | b"bnode" if self.binding.is_some() => {
                if self.value.is_some() || self.term.is_some() {
                    return Err(SesameError::decode(self.row, fragment(e), "binding holds more than one term"));
                }
                let term = match name.as_ref() {
                    b"uri" => Term::Uri,
                    b"literal" => Term::Literal,
                    _ => Term::BlankNode,
                };
                let language = self.attribute(e, b"xml:lang")?;
                let datatype = self.attribute(e, b"datatype")?;
                if term != Term::Literal && (language.is_some() || datatype.is_some()) {
                    return Err(SesameError::decode(
                        self.row,
                        fragment(e),
                        "only literals carry a language or datatype",
                    ));
                }
                if language.is_some() && datatype.is_some() {
                    return Err(SesameError::decode(
                        self.row,
                        fragment(e),
                        "literal has both a language and a datatype",
                    ));
                }
                self.term = Some(OpenTerm {
                    term,
                    language,
                    datatype,
                    text: String::new(),
                });
            }
            _ if self.binding.is_some() => {
                return Err(SesameError::decode(self.row, fragment(e), "unknown term element"));
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"head" => {
                self.in_head = false;
                self.head_done = true;
            }
            b"uri" | b"literal" | b"bnode" => {
                if let Some(open) = self.term.take() {
                    let value = match open.term {
                        Term::Uri => BindingValue::Uri(open.text),
                        Term::BlankNode => BindingValue::BlankNode(open.text),
                        Term::Literal => match (open.language, open.datatype) {
                            (Some(language), _) => BindingValue::Literal(Literal::with_language(open.text, language)),
                            (None, Some(datatype)) => {
                                BindingValue::Literal(Literal::with_datatype(open.text, datatype))
                            }
                            (None, None) => BindingValue::Literal(Literal::plain(open.text)),
                        },
                    };
                    self.value = Some(value);
                }
            }
            b"binding" => {
                if let Some((index, tag)) = self.binding.take() {
                    let value = self
                        .value
                        .take()
                        .ok_or_else(|| SesameError::decode(self.row, tag, "binding without a value"))?;
                    self.current[index] = Some(value);
                }
            }
            b"result" => {
                if self.row.take().is_some() {
                    let values = std::mem::take(&mut self.current);
                    self.builder.push_values(values);
                    self.rows_read += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn attribute(&self, e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| SesameError::decode(self.row, fragment(e), err.to_string()))?;
            if attr.key.as_ref() == key {
                let value = attr
                    .unescape_value()
                    .map_err(|err| SesameError::decode(self.row, fragment(e), err.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }
}

/// Renders `results` as a SPARQL results XML document. Unbound variables
/// are omitted from their row.
pub fn write_xml(results: &ResultSet) -> String {
    let mut out = format!("<?xml version=\"1.0\"?>\n<sparql xmlns=\"{SPARQL_RESULTS_NS}\">\n  <head>\n");
    for variable in results.variables() {
        out.push_str(&format!("    <variable name=\"{}\"/>\n", escape(variable.as_str())));
    }
    out.push_str("  </head>\n  <results>\n");
    for row in results {
        out.push_str("    <result>\n");
        for (variable, value) in row.iter() {
            let Some(value) = value else { continue };
            let term = match value {
                BindingValue::Uri(uri) => format!("<uri>{}</uri>", escape(uri.as_str())),
                BindingValue::BlankNode(id) => format!("<bnode>{}</bnode>", escape(id.as_str())),
                BindingValue::Literal(literal) => {
                    let attrs: Cow<'_, str> = match (literal.language(), literal.datatype()) {
                        (Some(language), _) => format!(" xml:lang=\"{}\"", escape(language)).into(),
                        (None, Some(datatype)) => format!(" datatype=\"{}\"", escape(datatype)).into(),
                        (None, None) => "".into(),
                    };
                    format!("<literal{attrs}>{}</literal>", escape(literal.value()))
                }
            };
            out.push_str(&format!("      <binding name=\"{}\">{term}</binding>\n", escape(variable)));
        }
        out.push_str("    </result>\n");
    }
    out.push_str("  </results>\n</sparql>\n");
    out
}
