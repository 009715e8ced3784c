//! Blocking operations over a `Transport`.
//!
//! `Connection` pairs a `SesameClient` with a transport and runs each
//! operation as build, execute, parse. One request per call; failures are
//! returned as-is, never retried.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::client::SesameClient;
use crate::config::EndpointConfig;
use crate::error::{Result, SesameError};
use crate::format::{Context, InputFormat, ResultFormat};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::request::QueryOptions;
use crate::results::ResultSet;

pub struct Connection<T> {
    client: SesameClient,
    transport: T,
}

impl<T: Transport> Connection<T> {
    pub fn new(config: EndpointConfig, transport: T) -> Self {
        Self {
            client: SesameClient::new(config),
            transport,
        }
    }

    pub fn from_client(client: SesameClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &SesameClient {
        &self.client
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(
            operation = %request.operation,
            method = %request.method,
            url = %request.url(),
            "sending request"
        );
        let response = self.transport.execute(&request)?;
        debug!(operation = %request.operation, status = response.status, "received response");
        Ok(response)
    }

    pub fn list_repositories(&self) -> Result<ResultSet> {
        let response = self.send(self.client.build_list_repositories())?;
        self.client.parse_list_repositories(response)
    }

    pub fn query(&self, query: &str, options: &QueryOptions) -> Result<ResultSet> {
        let response = self.send(self.client.build_query(query, options)?)?;
        self.client.parse_query(response)
    }

    pub fn append(&self, data: impl Into<Vec<u8>>, context: &Context, format: InputFormat) -> Result<()> {
        let response = self.send(self.client.build_append(data.into(), context, format)?)?;
        self.client.parse_append(response)
    }

    /// Reads `path` and appends its contents.
    pub fn append_file(&self, path: impl AsRef<Path>, context: &Context, format: InputFormat) -> Result<()> {
        let data = load_file(path.as_ref())?;
        self.append(data, context, format)
    }

    pub fn overwrite(&self, data: impl Into<Vec<u8>>, context: &Context, format: InputFormat) -> Result<()> {
        let response = self.send(self.client.build_overwrite(data.into(), context, format)?)?;
        self.client.parse_overwrite(response)
    }

    /// Reads `path` and replaces the context's statements with its contents.
    pub fn overwrite_file(&self, path: impl AsRef<Path>, context: &Context, format: InputFormat) -> Result<()> {
        let data = load_file(path.as_ref())?;
        self.overwrite(data, context, format)
    }

    pub fn get_namespace(&self, prefix: &str) -> Result<String> {
        let response = self.send(self.client.build_get_namespace(prefix)?)?;
        self.client.parse_get_namespace(response)
    }

    pub fn set_namespace(&self, prefix: &str, namespace: &str) -> Result<()> {
        let response = self.send(self.client.build_set_namespace(prefix, namespace)?)?;
        self.client.parse_set_namespace(response)
    }

    pub fn delete_namespace(&self, prefix: &str) -> Result<()> {
        let response = self.send(self.client.build_delete_namespace(prefix)?)?;
        self.client.parse_delete_namespace(response)
    }

    pub fn list_contexts(&self, result_format: ResultFormat) -> Result<ResultSet> {
        let response = self.send(self.client.build_list_contexts(result_format)?)?;
        self.client.parse_list_contexts(response)
    }

    pub fn size(&self, context: &Context) -> Result<u64> {
        let response = self.send(self.client.build_size(context)?)?;
        self.client.parse_size(response)
    }

    /// Removes every statement from every context of the repository.
    pub fn clear(&self) -> Result<()> {
        let response = self.send(self.client.build_clear()?)?;
        self.client.parse_clear(response)
    }
}

fn load_file(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str().is_empty() {
        return Err(SesameError::InvalidArgument("a file path is required".to_string()));
    }
    fs::read(path).map_err(|e| SesameError::InvalidArgument(format!("cannot read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::http::{HttpMethod, Operation};

    /// Replays canned responses and records what was sent.
    struct Scripted {
        responses: RefCell<Vec<HttpResponse>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: RefCell::new(responses),
                sent: RefCell::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.borrow().clone()
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                return Err(SesameError::Transport("connection refused".to_string()));
            }
            Ok(responses.remove(0))
        }
    }

    fn connection(transport: &Scripted) -> Connection<&Scripted> {
        let config = EndpointConfig::new("http://localhost:8080/openrdf-sesame")
            .unwrap()
            .with_repository("people");
        Connection::new(config, transport)
    }

    #[test]
    fn size_of_default_context() {
        let transport = Scripted::new(vec![HttpResponse::new(200, "42")]);
        assert_eq!(connection(&transport).size(&Context::parse("null")).unwrap(), 42);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].operation, Operation::Size);
        assert!(sent[0].url().ends_with("/size?context=null"));
    }

    #[test]
    fn append_accepts_only_no_content() {
        let transport = Scripted::new(vec![HttpResponse::new(204, ""), HttpResponse::new(201, "")]);
        let conn = connection(&transport);
        conn.append("<rdf:RDF/>", &Context::parse("null"), InputFormat::RdfXml).unwrap();
        let err = conn
            .append("<rdf:RDF/>", &Context::parse("null"), InputFormat::RdfXml)
            .unwrap_err();
        assert!(matches!(err, SesameError::Protocol { status: 201, operation: Operation::Append, .. }));
    }

    #[test]
    fn validation_failures_send_nothing() {
        let transport = Scripted::new(vec![HttpResponse::new(204, "")]);
        let conn = Connection::new(EndpointConfig::new("http://h").unwrap(), &transport);
        assert!(matches!(conn.clear(), Err(SesameError::Config(_))));
        assert!(matches!(
            conn.list_contexts(ResultFormat::SparqlJson),
            Err(SesameError::Config(_))
        ));

        let conn = connection(&transport);
        assert!(matches!(
            conn.list_contexts(ResultFormat::SparqlJson),
            Err(SesameError::UnsupportedFormat(_))
        ));
        assert!(matches!(conn.get_namespace(""), Err(SesameError::InvalidArgument(_))));
        assert!(matches!(
            conn.append_file("", &Context::Default, InputFormat::Turtle),
            Err(SesameError::InvalidArgument(_))
        ));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn missing_file_is_invalid_argument() {
        let transport = Scripted::new(Vec::new());
        let err = connection(&transport)
            .overwrite_file("/definitely/not/here.ttl", &Context::Default, InputFormat::Turtle)
            .unwrap_err();
        assert!(matches!(err, SesameError::InvalidArgument(_)));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn append_file_sends_file_contents() {
        let path = std::env::temp_dir().join(format!("sesame-core-append-{}.nt", std::process::id()));
        fs::write(&path, "<urn:a> <urn:b> <urn:c> .\n").unwrap();

        let transport = Scripted::new(vec![HttpResponse::new(204, "")]);
        connection(&transport)
            .append_file(&path, &Context::parse("urn:g"), InputFormat::NTriples)
            .unwrap();
        fs::remove_file(&path).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].body_bytes().unwrap(), b"<urn:a> <urn:b> <urn:c> .\n".to_vec());
        assert!(sent[0].url().ends_with("/statements?context=%3Curn%3Ag%3E"));
    }

    #[test]
    fn transport_failures_surface_once() {
        let transport = Scripted::new(Vec::new());
        let err = connection(&transport).list_repositories().unwrap_err();
        assert!(matches!(err, SesameError::Transport(_)));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn namespace_lookup_returns_text() {
        let transport = Scripted::new(vec![HttpResponse::new(200, "http://xmlns.com/foaf/0.1/")]);
        let ns = connection(&transport).get_namespace("foaf").unwrap();
        assert_eq!(ns, "http://xmlns.com/foaf/0.1/");
    }
}
