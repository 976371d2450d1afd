//! Bearer credential lifecycle.
//!
//! # Design
//! The manager is in one of three modes:
//!
//! - `Unset`: nothing cached yet. The first `get_token` performs the identity
//!   exchange and moves to `AutoManaged`.
//! - `AutoManaged`: the cached token came from the exchange. The request
//!   executor may renew it and retry once when a call is rejected.
//! - `Manual`: the caller installed the token with `set_token`. It is never
//!   replaced behind the caller's back, but an explicit `renew_token` still
//!   refreshes it without leaving manual mode.
//!
//! `get_token` never talks to the network while a token is cached. Concurrent
//! first fetches are coalesced: the exchange runs under a dedicated lock and
//! the cache is re-checked once the lock is held. A token installed with
//! `set_token` while an exchange is in flight is kept; the fetched one is
//! dropped. Renewal after a rejection goes through `renew_rejected`, which
//! skips the exchange when another caller already replaced the token.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::{AuthError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Observable credential mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    Unset,
    AutoManaged,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialState {
    Unset,
    AutoManaged(String),
    Manual(String),
}

impl CredentialState {
    fn token(&self) -> Option<&str> {
        match self {
            CredentialState::Unset => None,
            CredentialState::AutoManaged(token) | CredentialState::Manual(token) => Some(token),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// `POST {identity}/token` with the API key as bearer and no body.
pub fn build_token_request(identity_url: &str, api_key: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Post, format!("{identity_url}/token"))
        .with_header("accept", "application/json")
        .with_bearer(api_key)
}

/// Extracts the access token from an identity exchange response.
pub fn parse_token_response(response: HttpResponse) -> Result<String> {
    let exchange_failed = |response: HttpResponse| AuthError::Exchange {
        status: response.status,
        body: response.body,
    };
    if !response.is_success() {
        return Err(exchange_failed(response).into());
    }
    match serde_json::from_str::<TokenResponse>(&response.body) {
        Ok(parsed) if !parsed.token.is_empty() => Ok(parsed.token),
        _ => Err(exchange_failed(response).into()),
    }
}

/// Owns the bearer token shared by every resource client of one configuration.
pub struct CredentialManager {
    api_key: String,
    identity_url: String,
    transport: Arc<dyn Transport>,
    state: Mutex<CredentialState>,
    exchange: Mutex<()>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("identity_url", &self.identity_url)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    pub fn new(config: &Configuration, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_key: config.api_key().to_string(),
            identity_url: config.identity_url().to_string(),
            transport,
            state: Mutex::new(CredentialState::Unset),
            exchange: Mutex::new(()),
        }
    }

    /// Returns the cached token, fetching one first if none is cached.
    pub fn get_token(&self) -> Result<String> {
        if let Some(token) = self.access_token() {
            return Ok(token);
        }

        let _exchange = self.exchange.lock();
        // another caller may have finished the exchange while we waited
        if let Some(token) = self.access_token() {
            return Ok(token);
        }

        let token = self.exchange_token()?;
        let mut state = self.state.lock();
        // set_token does not wait for the exchange; a manual token wins
        if let Some(current) = state.token() {
            debug!("token installed during exchange; discarding fetched token");
            return Ok(current.to_string());
        }
        *state = CredentialState::AutoManaged(token.clone());
        info!("fetched access token");
        Ok(token)
    }

    /// Installs a caller-supplied token and switches to manual mode.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.state.lock() = CredentialState::Manual(token.into());
        debug!("access token set manually");
    }

    /// Performs a fresh exchange and overwrites the cached token, whatever
    /// the current mode. A manual token stays manual.
    pub fn renew_token(&self) -> Result<String> {
        let _exchange = self.exchange.lock();
        self.renew_exchanged()
    }

    /// Renews after `rejected` was refused by the server. If the cached token
    /// has already moved on, it is returned without another exchange.
    pub fn renew_rejected(&self, rejected: &str) -> Result<String> {
        let _exchange = self.exchange.lock();
        if let Some(current) = self.access_token() {
            if current != rejected {
                debug!("token already renewed by another caller");
                return Ok(current);
            }
        }
        self.renew_exchanged()
    }

    /// Caller holds the exchange lock.
    fn renew_exchanged(&self) -> Result<String> {
        let token = self.exchange_token()?;
        let mut state = self.state.lock();
        *state = match *state {
            CredentialState::Manual(_) => CredentialState::Manual(token.clone()),
            CredentialState::Unset | CredentialState::AutoManaged(_) => {
                CredentialState::AutoManaged(token.clone())
            }
        };
        info!(mode = ?mode_of(&state), "renewed access token");
        Ok(token)
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().token().map(str::to_string)
    }

    /// False only once the caller has installed a token manually.
    pub fn auto_renew(&self) -> bool {
        self.mode() != CredentialMode::Manual
    }

    pub fn mode(&self) -> CredentialMode {
        mode_of(&self.state.lock())
    }

    fn exchange_token(&self) -> Result<String> {
        let request = build_token_request(&self.identity_url, &self.api_key);
        debug!(path = %request.path, "requesting access token");
        let response = self.transport.execute(request)?;
        parse_token_response(response)
    }
}

fn mode_of(state: &CredentialState) -> CredentialMode {
    match state {
        CredentialState::Unset => CredentialMode::Unset,
        CredentialState::AutoManaged(_) => CredentialMode::AutoManaged,
        CredentialState::Manual(_) => CredentialMode::Manual,
    }
}
