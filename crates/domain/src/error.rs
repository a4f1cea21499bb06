//! Domain error types

use thiserror::Error;

/// Errors that can occur while obtaining or maintaining tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The provider rejected the client configuration (missing or invalid
    /// client id/secret). The message is the provider's, verbatim.
    #[error("{0}")]
    ClientConfig(String),

    /// A user-kind exchange was attempted without an authorization code.
    #[error("missing code")]
    MissingCode,

    /// A refresh was attempted without a refresh token.
    #[error("missing refresh token")]
    MissingRefreshToken,

    /// A token kind name outside `user`/`application`.
    #[error("unsupported token kind: `{0}`")]
    UnsupportedTokenKind(String),

    /// The provider answered with a non-success status. The message is the
    /// provider's, verbatim.
    #[error("provider returned {status}: {message}")]
    Provider {
        /// HTTP status code of the provider response.
        status: u16,
        /// Message from the provider's JSON body.
        message: String,
    },

    /// The provider answered with a shape outside its own contract.
    /// Fatal; never retried.
    #[error("unexpected validate response: {0}")]
    Protocol(String),

    /// A user token is absent and cannot be obtained without human
    /// interaction. Part of the expected interactive flow, not a bug signal:
    /// direct the user to `link` and supply the resulting code.
    #[error("authorization required: open the link and supply the resulting code")]
    NeedsAuthorization {
        /// The provider's authorization URL.
        link: String,
    },

    /// A request never produced a provider response.
    #[error("network error: {0}")]
    Network(String),
}

/// Result type alias for token operations.
pub type AuthResult<T> = Result<T, AuthError>;
