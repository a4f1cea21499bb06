//! Transport port for the identity provider's four endpoints

use async_trait::async_trait;
use gatekey_domain::{AuthResult, TokenGrant, TokenKind, TokenLiveness};

/// Port for talking to the identity provider.
///
/// Implementations perform the four provider operations and translate the
/// provider's responses into typed results or typed failures. A transport
/// holds no token state, caches nothing, and never retries; a single failed
/// call is surfaced to the caller.
#[async_trait]
pub trait TokenTransport: Send + Sync {
    /// Builds the provider's authorization URL for the given scopes.
    ///
    /// # Errors
    /// Returns [`gatekey_domain::AuthError::ClientConfig`] when the provider
    /// rejects the configured client id, with the provider's message verbatim.
    async fn authorize(&self, scopes: &[String]) -> AuthResult<String>;

    /// Exchanges a grant for tokens.
    ///
    /// For [`TokenKind::User`] this performs an authorization-code grant and
    /// requires a non-empty `code`; for [`TokenKind::Application`] it performs
    /// a client-credentials grant and ignores `code`.
    ///
    /// # Errors
    /// Returns [`gatekey_domain::AuthError::MissingCode`] before any network
    /// I/O when a user-kind exchange has no code, or
    /// [`gatekey_domain::AuthError::Provider`] on any non-success provider
    /// response.
    async fn exchange(&self, kind: TokenKind, code: Option<&str>) -> AuthResult<TokenGrant>;

    /// Probes whether an access token is still live.
    ///
    /// # Errors
    /// Returns [`gatekey_domain::AuthError::Protocol`] when the provider
    /// answers with a shape outside the validate contract.
    async fn validate(&self, access_token: &str) -> AuthResult<TokenLiveness>;

    /// Rotates an access token using a refresh token (user kind only).
    ///
    /// # Errors
    /// Returns [`gatekey_domain::AuthError::MissingRefreshToken`] before any
    /// network I/O when `refresh_token` is empty, or
    /// [`gatekey_domain::AuthError::Provider`] on any non-success provider
    /// response.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant>;
}
