//! Login orchestration: signup, password login, federated login and bearer
//! token resolution over one [`AccountStore`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::AuthError;
use super::jwt::TokenCodec;
use super::password::PasswordHash;
use super::state::{OAuthStateStore, generate_nonce};
use crate::config::AuthConfig;
use crate::models::account::{Account, NewAccount};
use crate::models::auth::{IssuedToken, TokenClaims};
use crate::oauth::{Provider, ProviderAdapter, build_adapter};
use crate::store::{AccountStore, StoreError};

/// Verified against when there is no real hash to check, so every login failure costs one bcrypt check.
static DUMMY_HASH: LazyLock<Option<PasswordHash>> =
    LazyLock::new(|| PasswordHash::new("accord-timing-equalizer").ok());

/// Query parameters a provider sends back to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where to send the caller to start a federated login.
#[derive(Debug, Clone)]
pub struct OAuthRedirect {
    pub provider: Provider,
    pub url: url::Url,
    /// Must be bound to the caller's session until the callback.
    pub nonce: String,
}

pub struct Authenticator {
    store: Arc<dyn AccountStore>,
    tokens: TokenCodec,
    providers: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    states: Arc<OAuthStateStore>,
    api_base_url: String,
}

impl Authenticator {
    /// Build from configuration, creating one adapter per registered provider.
    pub fn new(config: &AuthConfig, store: Arc<dyn AccountStore>) -> Result<Self, AuthError> {
        let tokens = TokenCodec::new(
            config.secret.as_bytes(),
            config.algorithm,
            config.token_expiry,
        )?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("accord/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Internal(format!("http client: {e}")))?;
        let adapters = config
            .providers
            .iter()
            .cloned()
            .map(|reg| build_adapter(reg, http.clone()))
            .collect();
        Ok(Self::with_parts(
            store,
            tokens,
            adapters,
            Arc::new(OAuthStateStore::new()),
            &config.api_base_url,
        ))
    }

    /// Assemble from prebuilt parts.
    pub fn with_parts(
        store: Arc<dyn AccountStore>,
        tokens: TokenCodec,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        states: Arc<OAuthStateStore>,
        api_base_url: &str,
    ) -> Self {
        let providers = adapters
            .into_iter()
            .map(|adapter| (adapter.provider(), adapter))
            .collect();
        Self {
            store,
            tokens,
            providers,
            states,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn states(&self) -> &Arc<OAuthStateStore> {
        &self.states
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Registered providers, in no particular order.
    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers.keys().copied()
    }

    /// Callback URL registered with `provider`.
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}/auth/{}", self.api_base_url, provider)
    }

    fn resolve_provider(&self, name: &str) -> Result<&Arc<dyn ProviderAdapter>, AuthError> {
        name.parse::<Provider>()
            .ok()
            .and_then(|p| self.providers.get(&p))
            .ok_or_else(|| AuthError::NotFound("Provider not found".into()))
    }

    fn issue(&self, account: &Account) -> Result<IssuedToken, AuthError> {
        let token = self.tokens.encode(account)?;
        Ok(IssuedToken::bearer(
            token,
            self.tokens.expires_in().num_seconds(),
        ))
    }

    // =========================================================================
    // Local credentials
    // =========================================================================

    /// Create a password account and log it in.
    pub async fn signup(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let new = NewAccount::with_password(username, email, password)?;
        let account = self.store.create(new).await.map_err(|e| match e {
            StoreError::UniqueViolation(constraint) => {
                debug!(%constraint, username, "signup rejected: duplicate");
                AuthError::Conflict("Submitted credentials already exist".into())
            }
            other => other.into(),
        })?;
        info!(account_id = account.id, username = %account.username, "account signed up");
        self.issue(&account)
    }

    /// Password login. Unknown usernames and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let account = self.store.get_by_username(username).await?;
        let verified = match account.as_ref().and_then(|a| a.hashed_password.as_ref()) {
            Some(hash) => hash.verify(password),
            // Unknown username or external account.
            None => {
                if let Some(dummy) = DUMMY_HASH.as_ref() {
                    let _ = dummy.verify(password);
                }
                false
            }
        };
        let account = match account {
            Some(account) if verified => account,
            _ => {
                debug!(username, "password login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };
        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }
        debug!(account_id = account.id, "password login");
        self.issue(&account)
    }

    // =========================================================================
    // Federated login
    // =========================================================================

    /// Mint a nonce for `provider_name` and build the authorization redirect.
    pub fn begin_oauth(&self, provider_name: &str) -> Result<OAuthRedirect, AuthError> {
        let adapter = self.resolve_provider(provider_name)?;
        let provider = adapter.provider();
        let nonce = generate_nonce();
        let url = adapter.begin_authorization(&self.redirect_uri(provider), &nonce)?;
        self.states.insert(nonce.clone(), provider);
        debug!(%provider, "oauth login started");
        Ok(OAuthRedirect {
            provider,
            url,
            nonce,
        })
    }

    /// Finish a federated login.
    ///
    /// `session_nonce` is the nonce bound to the caller's session at redirect
    /// time. It must equal the returned `state` and name a live pending login
    /// for the same provider; the pending login is consumed either way.
    pub async fn complete_oauth(
        &self,
        provider_name: &str,
        params: CallbackParams,
        session_nonce: Option<&str>,
    ) -> Result<IssuedToken, AuthError> {
        let adapter = self.resolve_provider(provider_name)?;
        let provider = adapter.provider();

        let state = params.state.ok_or(AuthError::InvalidCredentials)?;
        let pending = self.states.take(&state);
        if session_nonce != Some(state.as_str()) {
            debug!(%provider, "callback state does not match session nonce");
            return Err(AuthError::InvalidCredentials);
        }
        match pending {
            Some(pending) if pending.provider == provider => {}
            _ => {
                debug!(%provider, "callback state unknown, expired or for another provider");
                return Err(AuthError::InvalidCredentials);
            }
        }

        // Only a callback bound to a pending login may report a provider error.
        if let Some(error) = params.error {
            let detail = match params.error_description {
                Some(desc) => format!("{error}: {desc}"),
                None => error,
            };
            warn!(%provider, %detail, "provider returned an error to the callback");
            return Err(AuthError::Provider(detail));
        }

        let code = params.code.ok_or(AuthError::InvalidCredentials)?;
        let token = adapter
            .exchange_code(&code, &self.redirect_uri(provider))
            .await?;
        let profile = adapter.fetch_profile(&token, &state).await?;

        let account = self.find_or_provision(&profile.email).await?;
        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }
        info!(%provider, account_id = account.id, "oauth login");
        self.issue(&account)
    }

    /// Look up the account owning `email`, creating an external account on first login.
    async fn find_or_provision(&self, email: &str) -> Result<Account, AuthError> {
        if let Some(account) = self.store.get_by_email(email).await? {
            return Ok(account);
        }
        let new = NewAccount::external(email).map_err(|e| {
            debug!(error = %e, "provider email cannot be provisioned");
            AuthError::InvalidCredentials
        })?;
        match self.store.create(new).await {
            Ok(account) => {
                info!(account_id = account.id, "provisioned external account");
                Ok(account)
            }
            // A concurrent callback for the same email won the insert.
            Err(StoreError::UniqueViolation(constraint)) => {
                match self.store.get_by_email(email).await? {
                    Some(account) => Ok(account),
                    None => {
                        warn!(%constraint, "federated email is held as another account's username");
                        Err(AuthError::Conflict(
                            "Email address is in use by another account".into(),
                        ))
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Bearer tokens
    // =========================================================================

    /// Resolve a bearer token to its live account.
    ///
    /// The account is re-read from storage; its `disabled` flag is checked
    /// there, not in the token.
    pub async fn current_account(&self, token: &str) -> Result<(TokenClaims, Account), AuthError> {
        let claims = self.tokens.decode(token)?;
        let account = self
            .store
            .get_by_username(&claims.username)
            .await?
            .filter(|account| account.id.to_string() == claims.sub)
            .ok_or(AuthError::InvalidCredentials)?;
        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }
        Ok((claims, account))
    }
}
