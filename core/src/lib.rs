//! Synchronous client core for the Sesame RDF repository HTTP API.
//!
//! # Overview
//! Turns repository operations (query, append, overwrite, namespaces,
//! contexts, size, clear) into `HttpRequest` values and turns `HttpResponse`
//! values back into typed results, including SPARQL result tables.
//!
//! # Design
//! - `SesameClient` is stateless: it holds an immutable `EndpointConfig`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `Connection` runs build/execute/parse over any `Transport`; the
//!   `ureq` feature provides a blocking one.
//! - All failures are `SesameError` variants; validation failures happen
//!   before anything is sent.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod http;
pub mod request;
pub mod results;
#[cfg(feature = "ureq")]
pub mod transport;

pub use client::SesameClient;
pub use config::{Credentials, EndpointConfig};
pub use connection::Connection;
pub use error::{Result, SesameError};
pub use format::{Context, InputFormat, QueryLanguage, ResultFormat};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Operation, RequestBody, Transport};
pub use request::{QueryOptions, RequestBuilder};
pub use results::{BindingKind, BindingValue, Literal, ResultDecoder, ResultSet, Row};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
