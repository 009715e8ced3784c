//! Blocking `Transport` backed by `ureq`.
//!
//! Status codes are returned as data (`http_status_as_error(false)`) so that
//! the status contract is enforced by `SesameClient`, not by the HTTP stack.
//! No timeout is configured here; set one on the agent if you need it.
//! Response bodies are read in full with no size cap unless one is set
//! with `UreqTransport::with_body_limit`.

use tracing::trace;

use crate::error::SesameError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent)
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Rejects response bodies longer than `bytes` with a transport error.
    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, SesameError> {
        let url = request.url();
        let body = request.body_bytes();
        let headers = &request.headers;

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(&url), headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(&url), headers).send(&body[..]),
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(&url), headers).send(&body[..]),
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), headers).send_empty(),
        };
        let mut response = result.map_err(|e| SesameError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| SesameError::Transport(e.to_string()))?;
        trace!(status, bytes = body.len(), "ureq round-trip complete");

        Ok(HttpResponse { status, headers, body })
    }
}
