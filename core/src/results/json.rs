//! SPARQL Query Results JSON Format (`application/sparql-results+json`).
//!
//! Produces the same `ResultSet` as the XML decoder. The server is never
//! asked for this format by `SesameClient`; it is here for bodies obtained
//! through other channels (files, other endpoints).

use std::collections::HashMap;

use serde::Deserialize;
use tracing::trace;

use super::{BindingValue, Literal, ResultDecoder, ResultSet};
use crate::error::{Result, SesameError};
use crate::format::ResultFormat;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultsDecoder;

#[derive(Deserialize)]
struct Document {
    head: Head,
    results: Option<Results>,
    boolean: Option<bool>,
}

#[derive(Deserialize)]
struct Head {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct Results {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    language: Option<String>,
    datatype: Option<String>,
}

impl JsonTerm {
    fn into_value(self, row: usize, variable: &str) -> Result<BindingValue> {
        let malformed = |message: &str| SesameError::decode(Some(row), format!("binding `{variable}`"), message);
        match self.kind.as_str() {
            "uri" | "bnode" if self.language.is_some() || self.datatype.is_some() => {
                Err(malformed("only literals carry a language or datatype"))
            }
            "uri" => Ok(BindingValue::Uri(self.value)),
            "bnode" => Ok(BindingValue::BlankNode(self.value)),
            // `typed-literal` is the pre-recommendation spelling.
            "literal" | "typed-literal" => match (self.language, self.datatype) {
                (Some(_), Some(_)) => Err(malformed("literal has both a language and a datatype")),
                (Some(language), None) => Ok(BindingValue::Literal(Literal::with_language(self.value, language))),
                (None, Some(datatype)) => Ok(BindingValue::Literal(Literal::with_datatype(self.value, datatype))),
                (None, None) => Ok(BindingValue::Literal(Literal::plain(self.value))),
            },
            other => Err(malformed(&format!("unknown term type `{other}`"))),
        }
    }
}

impl ResultDecoder for JsonResultsDecoder {
    fn media_type(&self) -> &'static str {
        ResultFormat::SparqlJson.mime_type()
    }

    fn decode(&self, body: &[u8]) -> Result<ResultSet> {
        let document: Document = serde_json::from_slice(body)
            .map_err(|e| SesameError::decode(None, format!("line {} column {}", e.line(), e.column()), e.to_string()))?;
        if document.boolean.is_some() {
            return Err(SesameError::decode(
                None,
                "boolean",
                "boolean result documents carry no binding table",
            ));
        }

        let mut builder = ResultSet::builder(document.head.vars);
        let rows = document.results.map(|results| results.bindings).unwrap_or_default();
        for (index, row) in rows.into_iter().enumerate() {
            let mut bindings = Vec::with_capacity(row.len());
            for (variable, term) in row {
                let value = term.into_value(index, &variable)?;
                bindings.push((variable, value));
            }
            builder.push_row(bindings)?;
        }
        let results = builder.build();
        trace!(
            variables = results.variables().len(),
            rows = results.len(),
            "decoded sparql-results+json"
        );
        Ok(results)
    }
}
