//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! crate builds `HttpRequest` values and parses `HttpResponse` values; the
//! actual I/O happens behind the `Transport` trait, which the caller either
//! implements or gets from `crate::transport` when the `ureq` feature is on.
//!
//! All fields use owned types (`String`, `Vec`) so values can be stored,
//! compared in tests and replayed without lifetime concerns.

use std::fmt;

use crate::error::SesameError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logical server operation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRepositories,
    Query,
    Append,
    Overwrite,
    GetNamespace,
    SetNamespace,
    DeleteNamespace,
    ListContexts,
    Size,
    Clear,
}

impl Operation {
    /// Status code the server answers with when the operation succeeds.
    pub fn expected_status(self) -> u16 {
        match self {
            Operation::Append
            | Operation::Overwrite
            | Operation::SetNamespace
            | Operation::DeleteNamespace
            | Operation::Clear => 204,
            Operation::ListRepositories
            | Operation::Query
            | Operation::GetNamespace
            | Operation::ListContexts
            | Operation::Size => 200,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListRepositories => "list repositories",
            Operation::Query => "query",
            Operation::Append => "append",
            Operation::Overwrite => "overwrite",
            Operation::GetNamespace => "get namespace",
            Operation::SetNamespace => "set namespace",
            Operation::DeleteNamespace => "delete namespace",
            Operation::ListContexts => "list contexts",
            Operation::Size => "size",
            Operation::Clear => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload: either opaque bytes or form fields.
///
/// Form values are stored unencoded; `RequestBody::to_bytes` applies
/// `application/x-www-form-urlencoded` encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Raw(bytes) => bytes.clone(),
            RequestBody::Form(fields) => crate::request::encode_form(fields).into_bytes(),
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL without query string. `query` holds the
/// query parameters in order with values already URL-encoded, so `url()`
/// only joins them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub operation: Operation,
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub(crate) fn new(operation: Operation, method: HttpMethod, path: String) -> Self {
        Self {
            operation,
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Full request URL including the query string.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_bytes(&self) -> Option<Vec<u8>> {
        self.body.as_ref().map(RequestBody::to_bytes)
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport` (or by the caller directly) and handed to
/// `SesameClient::parse_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes one request and returns the raw response.
///
/// Implementations report non-2xx statuses as ordinary responses; only
/// failures to complete the exchange (DNS, TLS, broken connection) become
/// errors, and those should be `SesameError::Transport`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, SesameError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, SesameError> {
        (**self).execute(request)
    }
}
