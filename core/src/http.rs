//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! crate builds `HttpRequest` values and parses `HttpResponse` values; the
//! only place a request actually leaves the process is the host-supplied
//! [`Transport`]. Resource clients and the credential manager never see a
//! socket, which keeps them deterministic and easy to test against a scripted
//! transport.
//!
//! Non-2xx statuses are returned as data. A `TransportError` means the
//! round-trip itself failed (connection refused, broken body, ...).

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by the `build_*` functions of each resource client. `path` is the
/// full URL including any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.with_header("content-type", content_type)
    }

    /// Returns a copy of the request carrying `token` as its bearer credential.
    /// Any previous `authorization` header is replaced.
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        request
            .headers
            .push(("authorization".to_string(), format!("Bearer {token}")));
        request
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Executes a single HTTP round-trip on behalf of the core.
///
/// Implemented by the host. Timeouts, TLS and connection reuse are the
/// implementor's concern.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_bearer_replaces_existing_authorization() {
        let req = HttpRequest::new(HttpMethod::Get, "http://localhost/locks")
            .with_header("Authorization", "Bearer old")
            .with_header("accept", "application/json");
        let authed = req.with_bearer("new");
        assert_eq!(authed.header("authorization"), Some("Bearer new"));
        assert_eq!(authed.headers.len(), 2);
        // the original request is untouched so it can be replayed
        assert_eq!(req.header("authorization"), Some("Bearer old"));
    }

    #[test]
    fn with_body_sets_content_type() {
        let req = HttpRequest::new(HttpMethod::Put, "http://localhost/config/x")
            .with_body("application/octet-stream", "YmFy");
        assert_eq!(req.body.as_deref(), Some("YmFy"));
        assert_eq!(req.header("Content-Type"), Some("application/octet-stream"));
    }

    #[test]
    fn status_classification() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(HttpResponse::new(401, "").is_unauthorized());
        assert!(!HttpResponse::new(403, "").is_unauthorized());
    }
}
