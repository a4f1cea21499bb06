//! Token state machine: validate, refresh, re-issue, or ask a human.

use chrono::{DateTime, Utc};
use gatekey_domain::{AuthError, AuthResult, TokenGrant, TokenKind, TokenLiveness, TokenSnapshot};
use tokio::sync::Mutex;
use tracing::debug;

use crate::ports::{Clock, TokenTransport};

/// Observer fired exactly once per successful token-changing operation.
pub type OnUpdate = Box<dyn Fn(&TokenSnapshot) + Send + Sync>;

/// Tokens currently held by a manager.
///
/// `access_token` and `expires_at` are only ever written together, inside the
/// manager's critical section.
#[derive(Debug, Default)]
struct TokenCell {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Owns a token's kind, credentials, and expiry, and answers "give me a
/// usable access token" with as few provider calls as possible.
///
/// A manager never persists anything itself; supply an observer via
/// [`TokenManager::on_update`] to persist tokens externally. Operations that
/// may mutate state (`ensure_valid`, `access_token`, `set_code`) are
/// serialized internally, so two tasks sharing a manager cannot observe
/// staleness independently and issue duplicate refresh calls.
pub struct TokenManager<T, C> {
    transport: T,
    clock: C,
    kind: TokenKind,
    scopes: Vec<String>,
    on_update: Option<OnUpdate>,
    state: Mutex<TokenCell>,
}

impl<T: TokenTransport, C: Clock> TokenManager<T, C> {
    /// Creates a manager with no seeded tokens.
    #[must_use]
    pub fn new(transport: T, clock: C, kind: TokenKind) -> Self {
        Self {
            transport,
            clock,
            kind,
            scopes: Vec::new(),
            on_update: None,
            state: Mutex::new(TokenCell::default()),
        }
    }

    /// Seeds a previously persisted access token.
    ///
    /// The token is not trusted: its expiry is unknown, so the first
    /// [`TokenManager::ensure_valid`] call will probe the provider.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.state.get_mut().access_token = Some(access_token.into());
        self
    }

    /// Seeds a previously persisted refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.state.get_mut().refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the scope set requested when initiating authorization.
    #[must_use]
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Registers the update observer.
    ///
    /// Invoked synchronously, exactly once per state-changing success
    /// (exchange, refresh, or re-issuance) and never on a no-op validity
    /// confirmation or on a failure path.
    #[must_use]
    pub fn on_update(mut self, observer: impl Fn(&TokenSnapshot) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(observer));
        self
    }

    /// Kind of the managed token.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Checks that a usable access token is held, obtaining one if possible.
    ///
    /// Returns `false` only for a user-kind manager holding no access token:
    /// that state cannot be healed without human interaction (see
    /// [`TokenManager::authorization_link`]). In every other case the manager
    /// either confirms the held token, renews it, or obtains a first one.
    ///
    /// # Errors
    /// Propagates transport failures; [`AuthError::MissingRefreshToken`] when
    /// a dead user token has no refresh token to rotate with;
    /// [`AuthError::Protocol`] when the provider's validate answer is outside
    /// its contract.
    pub async fn ensure_valid(&self) -> AuthResult<bool> {
        let mut cell = self.state.lock().await;
        Ok(self.usable_token(&mut cell).await?.is_some())
    }

    /// Returns a usable access token.
    ///
    /// # Errors
    /// [`AuthError::NeedsAuthorization`] for a user-kind manager with no
    /// token: the error carries the authorization link to direct a human to.
    /// Otherwise propagates the same failures as
    /// [`TokenManager::ensure_valid`].
    pub async fn access_token(&self) -> AuthResult<String> {
        let mut cell = self.state.lock().await;
        match self.usable_token(&mut cell).await? {
            Some(token) => Ok(token),
            None => {
                let link = self.transport.authorize(&self.scopes).await?;
                Err(AuthError::NeedsAuthorization { link })
            }
        }
    }

    /// Builds the authorization URL for the configured scopes.
    ///
    /// Direct a human to this URL, then supply the code from the redirect via
    /// [`TokenManager::set_code`].
    ///
    /// # Errors
    /// Propagates the transport's authorize failure.
    pub async fn authorization_link(&self) -> AuthResult<String> {
        self.transport.authorize(&self.scopes).await
    }

    /// Exchanges a human-supplied authorization code for tokens.
    ///
    /// The only way a user-kind manager acquires its first token when none
    /// was seeded at construction. Fires the update observer on success.
    ///
    /// # Errors
    /// [`AuthError::MissingCode`] (before any network I/O) when the manager
    /// is user-kind and `code` is empty; otherwise propagates the exchange
    /// failure.
    pub async fn set_code(&self, code: &str) -> AuthResult<()> {
        let mut cell = self.state.lock().await;
        if self.kind == TokenKind::User && code.is_empty() {
            return Err(AuthError::MissingCode);
        }
        let code = (!code.is_empty()).then_some(code);
        let grant = self.transport.exchange(self.kind, code).await?;
        self.store_grant(&mut cell, grant);
        Ok(())
    }

    /// Returns the currently held refresh token, if any.
    ///
    /// Pure accessor: possibly the token seeded at construction, even if
    /// never exercised. No network effect.
    pub async fn refresh_token(&self) -> Option<String> {
        self.state.lock().await.refresh_token.clone()
    }

    /// Returns a point-in-time copy of the held tokens.
    pub async fn snapshot(&self) -> TokenSnapshot {
        self.snapshot_of(&*self.state.lock().await)
    }

    /// Returns the held access token, renewing or obtaining one as needed,
    /// or `None` when only human interaction can produce one.
    async fn usable_token(&self, cell: &mut TokenCell) -> AuthResult<Option<String>> {
        let Some(access_token) = cell.access_token.clone() else {
            return match self.kind {
                TokenKind::User => Ok(None),
                TokenKind::Application => {
                    debug!("no application token held, requesting one");
                    let grant = self.transport.exchange(TokenKind::Application, None).await?;
                    self.store_grant(cell, grant);
                    Ok(cell.access_token.clone())
                }
            };
        };

        // Fast path: confirmed expiry still in the future, zero network calls.
        if let Some(expires_at) = cell.expires_at
            && self.clock.now() < expires_at
        {
            return Ok(Some(access_token));
        }

        match self.transport.validate(&access_token).await? {
            TokenLiveness::Revoked => {
                debug!(kind = %self.kind, "provider rejected access token, renewing");
                self.renew(cell).await?;
                Ok(cell.access_token.clone())
            }
            TokenLiveness::Live(info) if info.expires_in > 0 => {
                // The token itself did not change, so the observer stays quiet.
                cell.expires_at =
                    Some(self.clock.now() + chrono::Duration::seconds(info.expires_in));
                Ok(Some(access_token))
            }
            TokenLiveness::Live(info) => Err(AuthError::Protocol(format!(
                "live token reported non-positive expires_in {}",
                info.expires_in
            ))),
        }
    }

    /// Replaces a dead token. Keyed strictly by kind: an application token is
    /// re-issued via client credentials and never sent to the refresh
    /// endpoint, whether or not a refresh token happens to be present.
    async fn renew(&self, cell: &mut TokenCell) -> AuthResult<()> {
        let grant = match self.kind {
            TokenKind::User => {
                let refresh_token = cell
                    .refresh_token
                    .clone()
                    .ok_or(AuthError::MissingRefreshToken)?;
                self.transport.refresh(&refresh_token).await?
            }
            TokenKind::Application => self.transport.exchange(TokenKind::Application, None).await?,
        };
        self.store_grant(cell, grant);
        Ok(())
    }

    /// Installs a grant (access token, refresh token, expiry as one unit) and
    /// fires the update observer.
    fn store_grant(&self, cell: &mut TokenCell, grant: TokenGrant) {
        let expires_at = grant.expires_at(self.clock.now());
        cell.access_token = Some(grant.access_token);
        cell.refresh_token = grant.refresh_token;
        cell.expires_at = Some(expires_at);
        debug!(kind = %self.kind, expires_at = %expires_at, "installed fresh tokens");
        if let Some(on_update) = &self.on_update {
            on_update(&self.snapshot_of(cell));
        }
    }

    fn snapshot_of(&self, cell: &TokenCell) -> TokenSnapshot {
        TokenSnapshot {
            kind: self.kind,
            access_token: cell.access_token.clone(),
            refresh_token: cell.refresh_token.clone(),
            expires_at: cell.expires_at,
        }
    }
}
