//! Token kinds, grants, and validation results

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The two grant families the provider issues tokens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Obtained via an authorization-code grant; supports refresh.
    User,
    /// Obtained via a client-credentials grant; re-issued on expiry because
    /// the provider emits no refresh token for this kind.
    #[default]
    Application,
}

impl TokenKind {
    /// Returns true if tokens of this kind carry a refresh token.
    #[must_use]
    pub const fn supports_refresh(self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Application => f.write_str("application"),
        }
    }
}

impl FromStr for TokenKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "application" => Ok(Self::Application),
            other => Err(AuthError::UnsupportedTokenKind(other.to_string())),
        }
    }
}

/// Tokens issued by a successful exchange or refresh.
///
/// This is the provider's token-endpoint success body; `refresh_token` is
/// absent for [`TokenKind::Application`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// The issued access token.
    pub access_token: String,
    /// The issued refresh token, when the grant produces one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Scopes granted to the token.
    #[serde(default)]
    pub scope: Vec<String>,
    /// Token type reported by the provider (usually "bearer").
    #[serde(default)]
    pub token_type: String,
}

impl TokenGrant {
    /// The instant this grant's access token expires, measured from `issued_at`.
    #[must_use]
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + chrono::Duration::seconds(self.expires_in.cast_signed())
    }
}

/// A point-in-time copy of the tokens a manager holds.
///
/// Handed to the update observer so callers can persist
/// `access_token`/`refresh_token` externally; the core persists nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Kind of the managed token.
    pub kind: TokenKind,
    /// Currently held access token, if any.
    pub access_token: Option<String>,
    /// Currently held refresh token, if any.
    pub refresh_token: Option<String>,
    /// Expiry of the held access token, if confirmed or freshly issued.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of the liveness probe against the validate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLiveness {
    /// The provider answered 401: the token is expired or revoked.
    Revoked,
    /// The token is live; the introspection body carries its remaining
    /// lifetime.
    Live(TokenIntrospection),
}

/// Introspection body the provider returns for a live token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIntrospection {
    /// Client id the token was issued to.
    pub client_id: String,
    /// Login of the authorizing user; absent for application tokens.
    #[serde(default)]
    pub login: Option<String>,
    /// Scopes attached to the token.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Id of the authorizing user; absent for application tokens.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Remaining lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("user".parse::<TokenKind>().unwrap(), TokenKind::User);
        assert_eq!(
            "application".parse::<TokenKind>().unwrap(),
            TokenKind::Application
        );
        assert_eq!(TokenKind::User.to_string(), "user");
        assert_eq!(TokenKind::Application.to_string(), "application");
    }

    #[test]
    fn test_kind_parse_rejects_unknown_names() {
        let err = "foobar".parse::<TokenKind>().unwrap_err();
        assert_eq!(err, AuthError::UnsupportedTokenKind("foobar".to_string()));
        assert_eq!(err.to_string(), "unsupported token kind: `foobar`");
    }

    #[test]
    fn test_kind_defaults_to_application() {
        assert_eq!(TokenKind::default(), TokenKind::Application);
        assert!(!TokenKind::Application.supports_refresh());
        assert!(TokenKind::User.supports_refresh());
    }

    #[test]
    fn test_grant_parses_user_token_body() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 3600,
                "scope": ["bits:read", "user:read:email"],
                "token_type": "bearer"
            }"#,
        )
        .unwrap();

        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt"));
        assert_eq!(grant.expires_in, 3600);
        assert_eq!(grant.scope, vec!["bits:read", "user:read:email"]);
    }

    #[test]
    fn test_grant_parses_app_token_body_without_refresh_token() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token": "at", "expires_in": 5000000, "token_type": "bearer"}"#,
        )
        .unwrap();

        assert_eq!(grant.refresh_token, None);
        assert!(grant.scope.is_empty());
    }

    #[test]
    fn test_grant_expiry_is_relative_to_issue_instant() {
        let grant = TokenGrant {
            access_token: "at".to_string(),
            refresh_token: None,
            expires_in: 3600,
            scope: vec![],
            token_type: "bearer".to_string(),
        };

        let issued_at = Utc::now();
        assert_eq!(
            grant.expires_at(issued_at),
            issued_at + chrono::Duration::hours(1)
        );
    }

    #[test]
    fn test_introspection_parses_without_user_fields() {
        let info: TokenIntrospection = serde_json::from_str(
            r#"{"client_id": "cid", "scopes": [], "expires_in": 5000}"#,
        )
        .unwrap();

        assert_eq!(info.client_id, "cid");
        assert_eq!(info.login, None);
        assert_eq!(info.user_id, None);
        assert_eq!(info.expires_in, 5000);
    }
}
