//! Credential-aware request execution.
//!
//! # Design
//! `send` is strictly sequential: resolve a token, dispatch, and only if the
//! server answered 401 while the credential is auto-managed, renew and
//! dispatch exactly once more. Every other status is handed back to the
//! caller untouched so the resource client's `parse_*` function decides what
//! it means.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::identity::CredentialManager;

#[derive(Clone)]
pub struct RequestExecutor {
    credentials: Arc<CredentialManager>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(credentials: Arc<CredentialManager>, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Executes `request` with the current bearer token.
    ///
    /// Returns the raw response for any status except 401. A 401 becomes
    /// `AuthError::Rejected`, after one renew-and-retry when the credential
    /// is auto-managed.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let token = self.credentials.get_token()?;
        let response = self.dispatch(request, &token)?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        if !self.credentials.auto_renew() {
            warn!(path = %request.path, "request rejected; manual token is not renewed");
            return Err(AuthError::Rejected {
                status: response.status,
            }
            .into());
        }

        warn!(path = %request.path, "request rejected; renewing token and retrying once");
        let token = self.credentials.renew_rejected(&token)?;
        let response = self.dispatch(request, &token)?;
        if response.is_unauthorized() {
            warn!(path = %request.path, "request rejected after token renewal");
            return Err(AuthError::Rejected {
                status: response.status,
            }
            .into());
        }
        Ok(response)
    }

    fn dispatch(&self, request: &HttpRequest, token: &str) -> Result<HttpResponse> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request.with_bearer(token))?;
        debug!(status = response.status, path = %request.path, "received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Configuration;
    use crate::error::ApiError;
    use crate::http::HttpMethod;
    use crate::testing::ScriptedTransport;

    fn executor(transport: &Arc<ScriptedTransport>) -> RequestExecutor {
        let config = Configuration::new("test_apikey").with_base_url("http://local");
        let credentials = Arc::new(CredentialManager::new(&config, transport.clone()));
        RequestExecutor::new(credentials, transport.clone())
    }

    fn request() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, "http://local/locks")
    }

    #[test]
    fn fetches_token_then_sends_with_bearer() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, json!({"token": "t1"}))
            .respond(200, "ok");
        let exec = executor(&transport);

        let response = exec.send(&request()).unwrap();

        assert_eq!(response.body, "ok");
        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].path, "http://local/token");
        assert_eq!(sent[1].header("authorization"), Some("Bearer t1"));
    }

    #[test]
    fn cached_token_skips_exchange() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "a").respond(200, "b");
        let exec = executor(&transport);
        exec.credentials().set_token("manual");

        exec.send(&request()).unwrap();
        exec.send(&request()).unwrap();

        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn renews_and_retries_once_when_auto_managed() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, json!({"token": "stale"}))
            .respond(401, "expired")
            .respond_json(200, json!({"token": "fresh"}))
            .respond(200, "ok");
        let exec = executor(&transport);

        let response = exec.send(&request()).unwrap();

        assert_eq!(response.body, "ok");
        let sent = transport.requests();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].header("authorization"), Some("Bearer stale"));
        assert_eq!(sent[3].header("authorization"), Some("Bearer fresh"));
        assert_eq!(exec.credentials().access_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn second_rejection_is_not_retried_again() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, json!({"token": "t1"}))
            .respond(401, "")
            .respond_json(200, json!({"token": "t2"}))
            .respond(401, "");
        let exec = executor(&transport);

        let err = exec.send(&request()).unwrap_err();

        assert!(matches!(
            err,
            ApiError::Auth(AuthError::Rejected { status: 401 })
        ));
        assert_eq!(transport.request_count(), 4);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn manual_token_is_never_replaced() {
        let transport = ScriptedTransport::new();
        transport.respond(401, "");
        let exec = executor(&transport);
        exec.credentials().set_token("manual");

        let err = exec.send(&request()).unwrap_err();

        assert!(err.is_auth());
        assert_eq!(transport.request_count(), 1);
        assert_eq!(exec.credentials().access_token().as_deref(), Some("manual"));
    }

    #[test]
    fn other_failures_are_returned_as_data() {
        let transport = ScriptedTransport::new();
        transport.respond(500, "boom");
        let exec = executor(&transport);
        exec.credentials().set_token("manual");

        let response = exec.send(&request()).unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn failed_renewal_propagates() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, json!({"token": "t1"}))
            .respond(401, "")
            .respond(503, "identity down");
        let exec = executor(&transport);

        let err = exec.send(&request()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Auth(AuthError::Exchange { status: 503, .. })
        ));
    }

    #[test]
    fn transport_errors_propagate() {
        let transport = ScriptedTransport::new();
        transport.fail("reset by peer");
        let exec = executor(&transport);
        exec.credentials().set_token("manual");

        assert!(matches!(
            exec.send(&request()).unwrap_err(),
            ApiError::Transport(_)
        ));
    }
}
