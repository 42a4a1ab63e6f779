//! HTTP client abstraction.
//!
//! The transport talks to the store through the [`HttpClient`] trait so the
//! wire layer can be swapped: [`ReqwestClient`] for real endpoints,
//! [`InMemoryStore`](crate::InMemoryStore) for tests.

use crate::config::ClientConfig;
use appconf_core::{AppConfigError, AppConfigResult};
use std::fmt;

/// HTTP methods used against `/kv/{key}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL, query included.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any previous value (names are case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Builder form of [`set_header`](Self::set_header).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8, for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client abstraction.
///
/// Implementations must be safe to share between threads; the transport
/// holds one client per endpoint and uses it concurrently.
pub trait HttpClient: Send + Sync {
    /// Executes one request. Only connection-level failures are errors;
    /// every status code is returned as a response.
    fn execute(&self, request: &HttpRequest) -> AppConfigResult<HttpResponse>;
}

/// [`HttpClient`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client honouring the configured timeout.
    pub fn new(config: &ClientConfig) -> AppConfigResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppConfigError::wrap("failed to build HTTP client", e))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &HttpRequest) -> AppConfigResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(|e| {
            AppConfigError::wrap(format!("{} {} failed", request.method, request.url), e)
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| AppConfigError::wrap("failed to read response body", e))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
