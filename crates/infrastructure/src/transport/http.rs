//! HTTP transport for the identity provider's `OAuth2` endpoints.
//!
//! This adapter implements the `TokenTransport` port over `reqwest`. It holds
//! the client credentials and the provider base URL; it holds no token state,
//! caches nothing, and never retries.

use async_trait::async_trait;
use gatekey_application::TokenTransport;
use gatekey_domain::{
    AuthError, AuthResult, Credentials, TokenGrant, TokenIntrospection, TokenKind, TokenLiveness,
};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

/// Production base URL of the provider's `OAuth2` endpoints.
const DEFAULT_BASE_URL: &str = "https://id.twitch.tv/oauth2";

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Error body the provider attaches to non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Transport implementation using reqwest.
///
/// The client never follows redirects: the authorize endpoint answers with a
/// redirect whose `Location` header is the link surfaced to the human.
pub struct HttpTransport {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport against the provider's production base URL.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_else(|_| Client::new()),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the provider base URL (tests, staging).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    /// Posts a grant request to the token endpoint and parses the issued
    /// tokens.
    async fn post_token(&self, params: &[(&str, &str)]) -> AuthResult<TokenGrant> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Network(format!("failed to encode form: {e}")))?;

        let response = self
            .client
            .post(self.endpoint("token"))
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AuthError::Network(format!("failed to parse token response: {e}")))
    }
}

impl From<Credentials> for HttpTransport {
    fn from(credentials: Credentials) -> Self {
        Self::new(credentials)
    }
}

/// Maps a non-success provider response, passing its message through
/// verbatim.
async fn provider_error(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);
    AuthError::Provider { status, message }
}

#[async_trait]
impl TokenTransport for HttpTransport {
    async fn authorize(&self, scopes: &[String]) -> AuthResult<String> {
        let scope = scopes.join(" ");
        let response = self
            .client
            .get(self.endpoint("authorize"))
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("response_type", "code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if let Some(location) = response.headers().get(header::LOCATION) {
            let link = location.to_str().map_err(|e| {
                AuthError::Protocol(format!("authorize Location header is not a string: {e}"))
            })?;
            return Ok(link.to_string());
        }

        // Not a redirect: the provider explains why in the body.
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text);
        Err(AuthError::ClientConfig(message))
    }

    async fn exchange(&self, kind: TokenKind, code: Option<&str>) -> AuthResult<TokenGrant> {
        match kind {
            TokenKind::User => {
                let code = code
                    .filter(|code| !code.is_empty())
                    .ok_or(AuthError::MissingCode)?;
                debug!("exchanging authorization code for tokens");
                self.post_token(&[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ])
                .await
            }
            TokenKind::Application => {
                debug!("requesting tokens via client credentials");
                self.post_token(&[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ])
                .await
            }
        }
    }

    async fn validate(&self, access_token: &str) -> AuthResult<TokenLiveness> {
        let response = self
            .client
            .get(self.endpoint("validate"))
            .header(header::AUTHORIZATION, format!("OAuth {access_token}"))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Ok(TokenLiveness::Revoked),
            status if status.is_success() => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| AuthError::Network(e.to_string()))?;
                serde_json::from_str::<TokenIntrospection>(&text)
                    .map(TokenLiveness::Live)
                    .map_err(|_| AuthError::Protocol(format!("malformed validate body: {text}")))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(AuthError::Protocol(format!(
                    "validate answered {status}: {text}"
                )))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }
        debug!("rotating access token with refresh token");
        self.post_token(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}
