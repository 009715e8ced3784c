//! Pure mapping from operations to `HttpRequest` values.
//!
//! # Design
//! `RequestBuilder` borrows an `EndpointConfig` and never performs I/O.
//! Validation (repository selected, non-empty prefix, negotiable result
//! format) happens here so that a rejected call never reaches the network.
//! Authentication is not applied here; `SesameClient` adds it.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::EndpointConfig;
use crate::error::{Result, SesameError};
use crate::format::{Context, InputFormat, QueryLanguage, ResultFormat};
use crate::http::{HttpMethod, HttpRequest, Operation, RequestBody};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";

/// Characters left as-is by form encoding: ASCII alphanumerics and `-_.`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// `application/x-www-form-urlencoded` encoding of a single value.
pub fn urlencode(value: &str) -> String {
    utf8_percent_encode(value, FORM).to_string().replace("%20", "+")
}

/// Percent-encoding for a single path segment (space stays `%20`).
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, FORM).to_string()
}

pub(crate) fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parameters of a query call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub language: QueryLanguage,
    pub infer: bool,
    pub result_format: ResultFormat,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            language: QueryLanguage::Sparql,
            infer: true,
            result_format: ResultFormat::SparqlXml,
        }
    }
}

impl QueryOptions {
    pub fn language(mut self, language: QueryLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn infer(mut self, infer: bool) -> Self {
        self.infer = infer;
        self
    }

    pub fn result_format(mut self, result_format: ResultFormat) -> Self {
        self.result_format = result_format;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    config: &'a EndpointConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a EndpointConfig) -> Self {
        Self { config }
    }

    fn repositories_url(&self) -> String {
        format!("{}/repositories", self.config.base_address().trim_end_matches('/'))
    }

    fn repository_url(&self) -> Result<String> {
        let repository = self.config.validate_repository_selected()?;
        Ok(format!("{}/{}", self.repositories_url(), encode_segment(repository)))
    }

    fn namespace_url(&self, prefix: &str) -> Result<String> {
        let base = self.repository_url()?;
        if prefix.is_empty() {
            return Err(SesameError::InvalidArgument("a namespace prefix is required".to_string()));
        }
        Ok(format!("{base}/namespaces/{}", encode_segment(prefix)))
    }

    fn content_type(&self, mime: &str) -> (String, String) {
        (
            "content-type".to_string(),
            format!("{mime}{}", self.config.charset_suffix()),
        )
    }

    fn accept(mime: &str) -> (String, String) {
        ("accept".to_string(), mime.to_string())
    }

    pub fn list_repositories(&self) -> HttpRequest {
        let mut req = HttpRequest::new(Operation::ListRepositories, HttpMethod::Get, self.repositories_url());
        req.headers.push(Self::accept(ResultFormat::SparqlXml.mime_type()));
        req
    }

    pub fn query(&self, query: &str, options: &QueryOptions) -> Result<HttpRequest> {
        let url = self.repository_url()?;
        options.result_format.ensure_negotiable()?;

        let mut req = HttpRequest::new(Operation::Query, HttpMethod::Post, url);
        req.headers.push(Self::accept(ResultFormat::SparqlXml.mime_type()));
        req.headers.push(self.content_type(FORM_URLENCODED));
        req.body = Some(RequestBody::Form(vec![
            ("query".to_string(), query.to_string()),
            ("queryLn".to_string(), options.language.as_str().to_string()),
            ("infer".to_string(), options.infer.to_string()),
        ]));
        Ok(req)
    }

    fn statements(
        &self,
        operation: Operation,
        method: HttpMethod,
        data: Vec<u8>,
        context: &Context,
        format: InputFormat,
    ) -> Result<HttpRequest> {
        let url = format!("{}/statements", self.repository_url()?);
        let mut req = HttpRequest::new(operation, method, url);
        req.query.push(("context".to_string(), context.encoded()));
        req.headers.push(self.content_type(format.mime_type()));
        req.body = Some(RequestBody::Raw(data));
        Ok(req)
    }

    pub fn append(&self, data: Vec<u8>, context: &Context, format: InputFormat) -> Result<HttpRequest> {
        self.statements(Operation::Append, HttpMethod::Post, data, context, format)
    }

    pub fn overwrite(&self, data: Vec<u8>, context: &Context, format: InputFormat) -> Result<HttpRequest> {
        self.statements(Operation::Overwrite, HttpMethod::Put, data, context, format)
    }

    pub fn get_namespace(&self, prefix: &str) -> Result<HttpRequest> {
        let mut req = HttpRequest::new(Operation::GetNamespace, HttpMethod::Get, self.namespace_url(prefix)?);
        req.headers.push(Self::accept(TEXT_PLAIN));
        Ok(req)
    }

    pub fn set_namespace(&self, prefix: &str, namespace: &str) -> Result<HttpRequest> {
        let url = self.namespace_url(prefix)?;
        if namespace.is_empty() {
            return Err(SesameError::InvalidArgument("a namespace URI is required".to_string()));
        }
        let mut req = HttpRequest::new(Operation::SetNamespace, HttpMethod::Put, url);
        req.headers.push(self.content_type(TEXT_PLAIN));
        req.body = Some(RequestBody::Raw(namespace.as_bytes().to_vec()));
        Ok(req)
    }

    pub fn delete_namespace(&self, prefix: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            Operation::DeleteNamespace,
            HttpMethod::Delete,
            self.namespace_url(prefix)?,
        ))
    }

    pub fn list_contexts(&self, result_format: ResultFormat) -> Result<HttpRequest> {
        let url = format!("{}/contexts", self.repository_url()?);
        result_format.ensure_negotiable()?;
        let mut req = HttpRequest::new(Operation::ListContexts, HttpMethod::Post, url);
        req.headers.push(Self::accept(ResultFormat::SparqlXml.mime_type()));
        Ok(req)
    }

    pub fn size(&self, context: &Context) -> Result<HttpRequest> {
        let url = format!("{}/size", self.repository_url()?);
        let mut req = HttpRequest::new(Operation::Size, HttpMethod::Post, url);
        req.query.push(("context".to_string(), context.encoded()));
        req.headers.push(Self::accept(TEXT_PLAIN));
        Ok(req)
    }

    pub fn clear(&self) -> Result<HttpRequest> {
        let url = format!("{}/statements", self.repository_url()?);
        Ok(HttpRequest::new(Operation::Clear, HttpMethod::Delete, url))
    }
}
