//! Identity verification trait and static implementation.
//!
//! The gateway treats identity as an opaque capability: a bearer token goes
//! in, a [`Principal`] comes out. Token issuance and verification internals
//! belong to the identity provider.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BearerToken, Principal};

use crate::error::ClientError;

pub(crate) const SERVICE: &str = "Identity";

/// Resolves a bearer credential to an authenticated principal.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Verifies the token, returning [`ClientError::Unauthorized`] when it
    /// is unknown, expired or malformed.
    async fn verify(&self, token: &BearerToken) -> Result<Principal, ClientError>;
}

#[async_trait]
impl<T: IdentityService + ?Sized> IdentityService for Arc<T> {
    async fn verify(&self, token: &BearerToken) -> Result<Principal, ClientError> {
        (**self).verify(token).await
    }
}

/// Identity service backed by a fixed token-to-username table, for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityService {
    users: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticIdentityService {
    /// Creates an identity service that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a username.
    pub fn with_user(self, token: impl Into<String>, username: impl Into<String>) -> Self {
        self.users
            .write()
            .unwrap()
            .insert(token.into(), username.into());
        self
    }
}

#[async_trait]
impl IdentityService for StaticIdentityService {
    async fn verify(&self, token: &BearerToken) -> Result<Principal, ClientError> {
        self.users
            .read()
            .unwrap()
            .get(token.as_str())
            .map(|username| Principal::new(username.clone()))
            .ok_or(ClientError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_resolves_principal() {
        let identity = StaticIdentityService::new().with_user("alice-token", "alice");
        let principal = identity
            .verify(&BearerToken::new("alice-token"))
            .await
            .unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let identity = StaticIdentityService::new();
        let result = identity.verify(&BearerToken::new("stranger")).await;
        assert!(matches!(result, Err(ClientError::Unauthorized)));
    }
}
