//! Stateless request builder and response parser for the Sesame HTTP API.
//!
//! # Design
//! `SesameClient` holds only an `EndpointConfig` and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller (or `Connection`) executes the HTTP round-trip
//! in between, keeping this layer deterministic and free of I/O.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::warn;

use crate::config::{Credentials, EndpointConfig};
use crate::error::{Result, SesameError};
use crate::format::{Context, InputFormat, ResultFormat};
use crate::http::{HttpRequest, HttpResponse, Operation};
use crate::request::{QueryOptions, RequestBuilder};
use crate::results::{ResultDecoder, ResultSet, XmlResultsDecoder};

/// Synchronous, stateless client for one Sesame server endpoint.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. Changing the repository or credentials yields a new
/// client; existing values never change.
#[derive(Debug, Clone)]
pub struct SesameClient {
    config: EndpointConfig,
}

impl SesameClient {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn with_repository(&self, repository: impl Into<String>) -> Self {
        Self::new(self.config.clone().with_repository(repository))
    }

    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self::new(self.config.clone().with_credentials(credentials))
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.config)
    }

    /// Adds HTTP Basic credentials when the config carries any.
    fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(credentials) = self.config.credentials() {
            let token = STANDARD.encode(format!("{}:{}", credentials.user, credentials.password));
            request
                .headers
                .push(("authorization".to_string(), format!("Basic {token}")));
        }
        request
    }

    pub fn build_list_repositories(&self) -> HttpRequest {
        self.authorize(self.builder().list_repositories())
    }

    pub fn build_query(&self, query: &str, options: &QueryOptions) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().query(query, options)?))
    }

    pub fn build_append(&self, data: Vec<u8>, context: &Context, format: InputFormat) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().append(data, context, format)?))
    }

    pub fn build_overwrite(&self, data: Vec<u8>, context: &Context, format: InputFormat) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().overwrite(data, context, format)?))
    }

    pub fn build_get_namespace(&self, prefix: &str) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().get_namespace(prefix)?))
    }

    pub fn build_set_namespace(&self, prefix: &str, namespace: &str) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().set_namespace(prefix, namespace)?))
    }

    pub fn build_delete_namespace(&self, prefix: &str) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().delete_namespace(prefix)?))
    }

    pub fn build_list_contexts(&self, result_format: ResultFormat) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().list_contexts(result_format)?))
    }

    pub fn build_size(&self, context: &Context) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().size(context)?))
    }

    pub fn build_clear(&self) -> Result<HttpRequest> {
        Ok(self.authorize(self.builder().clear()?))
    }

    pub fn parse_list_repositories(&self, response: HttpResponse) -> Result<ResultSet> {
        parse_results(Operation::ListRepositories, &response)
    }

    pub fn parse_query(&self, response: HttpResponse) -> Result<ResultSet> {
        parse_results(Operation::Query, &response)
    }

    pub fn parse_append(&self, response: HttpResponse) -> Result<()> {
        check_status(Operation::Append, &response)
    }

    pub fn parse_overwrite(&self, response: HttpResponse) -> Result<()> {
        check_status(Operation::Overwrite, &response)
    }

    /// The namespace URI, exactly as the server sent it.
    pub fn parse_get_namespace(&self, response: HttpResponse) -> Result<String> {
        check_status(Operation::GetNamespace, &response)?;
        String::from_utf8(response.body)
            .map_err(|e| SesameError::decode(None, "namespace", format!("invalid UTF-8: {e}")))
    }

    pub fn parse_set_namespace(&self, response: HttpResponse) -> Result<()> {
        check_status(Operation::SetNamespace, &response)
    }

    pub fn parse_delete_namespace(&self, response: HttpResponse) -> Result<()> {
        check_status(Operation::DeleteNamespace, &response)
    }

    pub fn parse_list_contexts(&self, response: HttpResponse) -> Result<ResultSet> {
        parse_results(Operation::ListContexts, &response)
    }

    pub fn parse_size(&self, response: HttpResponse) -> Result<u64> {
        check_status(Operation::Size, &response)?;
        let text = response.text();
        text.trim()
            .parse()
            .map_err(|e| SesameError::decode(None, text.trim().to_string(), format!("size is not a count: {e}")))
    }

    pub fn parse_clear(&self, response: HttpResponse) -> Result<()> {
        check_status(Operation::Clear, &response)
    }
}

/// Rejects any status other than the one `operation` succeeds with.
fn check_status(operation: Operation, response: &HttpResponse) -> Result<()> {
    let expected = operation.expected_status();
    if response.status == expected {
        return Ok(());
    }
    warn!(%operation, status = response.status, expected, "unexpected response status");
    Err(SesameError::Protocol {
        operation,
        status: response.status,
        body: response.text(),
    })
}

fn parse_results(operation: Operation, response: &HttpResponse) -> Result<ResultSet> {
    check_status(operation, response)?;
    XmlResultsDecoder.decode(&response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    const RESULTS: &str = r#"<?xml version="1.0"?>
<sparql xmlns="http://www.w3.org/2005/sparql-results#">
  <head><variable name="contextID"/></head>
  <results>
    <result><binding name="contextID"><uri>http://example.org/g1</uri></binding></result>
  </results>
</sparql>"#;

    fn client() -> SesameClient {
        SesameClient::new(
            EndpointConfig::new("http://localhost:8080/openrdf-sesame")
                .unwrap()
                .with_repository("people"),
        )
    }

    #[test]
    fn no_authorization_without_credentials() {
        let req = client().build_list_repositories();
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn credentials_apply_to_every_request() {
        let c = client().with_credentials(Credentials::new("Aladdin", "open sesame"));
        let expected = Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert_eq!(c.build_list_repositories().header("authorization"), expected);
        assert_eq!(c.build_clear().unwrap().header("authorization"), expected);
        assert_eq!(
            c.build_query("ASK {}", &QueryOptions::default()).unwrap().header("authorization"),
            expected
        );
        assert_eq!(client().build_clear().unwrap().header("authorization"), None);
    }

    #[test]
    fn with_repository_returns_new_client() {
        let original = client();
        let other = original.with_repository("places");
        assert_eq!(original.config().repository(), Some("people"));
        assert!(other.build_clear().unwrap().path.ends_with("/repositories/places/statements"));
    }

    #[test]
    fn build_query_validates_before_building() {
        let c = SesameClient::new(EndpointConfig::new("http://h").unwrap());
        assert!(matches!(
            c.build_query("ASK {}", &QueryOptions::default()),
            Err(SesameError::Config(_))
        ));
    }

    #[test]
    fn parse_query_success() {
        let results = client().parse_query(HttpResponse::new(200, RESULTS)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.get(0).unwrap().get("contextID").unwrap().lexical_value(),
            "http://example.org/g1"
        );
    }

    #[test]
    fn parse_query_wrong_status_never_decodes() {
        let err = client().parse_query(HttpResponse::new(500, RESULTS)).unwrap_err();
        match err {
            SesameError::Protocol { operation, status, .. } => {
                assert_eq!(operation, Operation::Query);
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_query_bad_document() {
        let err = client().parse_query(HttpResponse::new(200, "not xml")).unwrap_err();
        assert!(matches!(err, SesameError::Decode { .. }));
    }

    #[test]
    fn mutations_expect_no_content() {
        let c = client();
        assert!(c.parse_append(HttpResponse::new(204, "")).is_ok());
        assert!(c.parse_overwrite(HttpResponse::new(204, "")).is_ok());
        assert!(c.parse_set_namespace(HttpResponse::new(204, "")).is_ok());
        assert!(c.parse_delete_namespace(HttpResponse::new(204, "")).is_ok());
        assert!(c.parse_clear(HttpResponse::new(204, "")).is_ok());

        let err = c.parse_append(HttpResponse::new(201, "")).unwrap_err();
        assert_eq!(err.status(), Some(201));
        let err = c.parse_clear(HttpResponse::new(200, "")).unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn parse_size_reads_integer() {
        let c = client();
        assert_eq!(c.parse_size(HttpResponse::new(200, "42")).unwrap(), 42);
        assert_eq!(c.parse_size(HttpResponse::new(200, "7\n")).unwrap(), 7);
        assert!(matches!(
            c.parse_size(HttpResponse::new(200, "many")),
            Err(SesameError::Decode { .. })
        ));
        assert_eq!(c.parse_size(HttpResponse::new(404, "")).unwrap_err().status(), Some(404));
    }

    #[test]
    fn parse_get_namespace_returns_body() {
        let ns = client()
            .parse_get_namespace(HttpResponse::new(200, "http://xmlns.com/foaf/0.1/"))
            .unwrap();
        assert_eq!(ns, "http://xmlns.com/foaf/0.1/");
    }

    #[test]
    fn size_request_for_default_context() {
        let req = client().build_size(&Context::Default).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url(),
            "http://localhost:8080/openrdf-sesame/repositories/people/size?context=null"
        );
    }
}
