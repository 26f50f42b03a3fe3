//! Authentication types carried through every gateway request.

use serde::{Deserialize, Serialize};

/// The raw bearer credential taken from the `Authorization` header.
///
/// The gateway never interprets the token itself; it forwards it unchanged
/// to downstream services and to the identity provider for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token without the `Bearer ` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authenticated identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Username the downstream services attribute resources to.
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_keeps_raw_value() {
        let token = BearerToken::new("abc.def.ghi");
        assert_eq!(token.as_str(), "abc.def.ghi");
    }

    #[test]
    fn principal_holds_username() {
        let principal = Principal::new("alice");
        assert_eq!(principal.username, "alice");
    }
}
