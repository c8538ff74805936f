//! Authorization hooks and guards.
//!
//! Authorization is modeled as an injected capability check: handlers extract a
//! [`Requester`] from the request and services ask an [`AdminGate`] whether that
//! requester may mutate state.

use std::collections::HashSet;
use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Identity presented by the caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    token: Option<String>,
}

impl Requester {
    /// A requester that presented no credentials.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// A requester that presented the given bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Parse an `Authorization` header value. Anything but a non-empty
    /// `Bearer` credential yields an anonymous requester.
    pub fn from_authorization(value: &str) -> Self {
        match value.strip_prefix("Bearer ").map(str::trim) {
            Some(token) if !token.is_empty() => Self::with_token(token),
            _ => Self::anonymous(),
        }
    }
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let requester = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(Requester::from_authorization)
            .unwrap_or_default();
        Ok(requester)
    }
}

/// Capability check consulted before any mutating catalog operation.
#[async_trait]
pub trait AdminGate: Send + Sync {
    /// Returns `true` when the requester holds admin rights.
    async fn allows(&self, requester: &Requester) -> bool;
}

/// Gate backed by a fixed set of admin bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenGate {
    tokens: HashSet<String>,
}

impl StaticTokenGate {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.is_empty() {
            tracing::warn!(
                target: "bookshelf-authz",
                "no admin tokens configured; all mutating requests will be rejected"
            );
        }

        Self { tokens }
    }
}

#[async_trait]
impl AdminGate for StaticTokenGate {
    async fn allows(&self, requester: &Requester) -> bool {
        let allowed = requester
            .token()
            .is_some_and(|token| self.tokens.contains(token));

        if !allowed {
            tracing::debug!(target: "bookshelf-authz", "admin gate denied requester");
        }
        allowed
    }
}
