//! The authorization code + PKCE flow state machine.
//!
//! [`AuthFlow`] ties the pieces together: it departs for the authorization
//! endpoint from [`login_redirect`](AuthFlow::login_redirect), and on the
//! page load that follows the provider's redirect,
//! [`handle_redirect_response`](AuthFlow::handle_redirect_response) validates
//! the response, claims the pending state, and redeems the code. The two
//! halves may run in different process instances; everything they share goes
//! through the injected store.

use std::sync::Arc;

use url::Url;

use crate::codec;
use crate::config::{AppConfig, AuthParams};
use crate::discovery::DiscoveryCache;
use crate::error::AuthError;
use crate::navigator::Navigator;
use crate::random::{OsRandom, RandomSource};
use crate::state::{PendingAuthState, PendingStateStore};
use crate::storage::{Keyspace, KvStore};
use crate::token::{TokenRecord, TokenResponse, TokenStore};

/// Result alias for flow operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// The authorization code + PKCE client flow.
///
/// Construct one per storage backend and browsing context; pass the
/// [`AppConfig`] per call so a single flow can serve several client
/// registrations against the same store.
pub struct AuthFlow {
    states: PendingStateStore,
    tokens: TokenStore,
    discovery: DiscoveryCache,
    http: reqwest::Client,
    random: Arc<dyn RandomSource>,
    navigator: Arc<dyn Navigator>,
}

impl AuthFlow {
    /// Creates a flow over a storage backend and browsing context, with OS
    /// randomness and a default HTTP client.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, navigator: Arc<dyn Navigator>) -> Self {
        let http = reqwest::Client::new();
        Self {
            states: PendingStateStore::new(Keyspace::new(Arc::clone(&store))),
            tokens: TokenStore::new(Keyspace::new(Arc::clone(&store))),
            discovery: DiscoveryCache::new(Keyspace::new(store), http.clone()),
            http,
            random: Arc::new(OsRandom),
            navigator,
        }
    }

    /// Replaces the HTTP client used for discovery and token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.discovery = DiscoveryCache::new(self.discovery.into_keyspace(), http.clone());
        self.http = http;
        self
    }

    /// Replaces the randomness source.
    #[must_use]
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Starts an authorization request: generates and persists the pending
    /// state, then navigates to the provider's authorization endpoint.
    ///
    /// The built URL is also returned, mainly for callers that want to log
    /// or display it; the navigation has already been issued by then.
    ///
    /// # Errors
    ///
    /// Returns an error if the pending state cannot be persisted or the
    /// authorization URL cannot be built (discovery failure included). The
    /// pending state is rolled back on failure, so an aborted start leaves
    /// nothing behind.
    pub async fn login_redirect(
        &self,
        app: &AppConfig,
        params: Option<&AuthParams>,
    ) -> AuthResult<Url> {
        let pending = PendingAuthState::generate(
            self.random.as_ref(),
            &self.navigator.current_url(),
            &app.redirect_uri,
            params.and_then(|p| p.state.clone()),
        );
        self.states.store(&pending).await?;

        let url = match self.build_authorize_url(app, &pending, params).await {
            Ok(url) => url,
            Err(e) => {
                // Roll back so a failed start is not claimable later.
                self.states.clear(&pending.id).await.ok();
                return Err(e);
            }
        };

        tracing::debug!(state = %pending.id, "redirecting to authorization endpoint");
        self.navigator.assign(&url);
        Ok(url)
    }

    async fn build_authorize_url(
        &self,
        app: &AppConfig,
        pending: &PendingAuthState,
        params: Option<&AuthParams>,
    ) -> AuthResult<Url> {
        let document = self.discovery.get(&app.authority).await?;
        let mut url = Url::parse(&document.authorization_endpoint)?;

        let challenge = codec::sha256_base64url(pending.code_verifier.as_bytes());

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &app.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", app.redirect_uri.as_str())
                .append_pair("scope", &compose_scope(params))
                .append_pair("response_mode", "fragment")
                .append_pair("state", &pending.id)
                .append_pair("code_challenge", &challenge)
                .append_pair("code_challenge_method", "S256");
            apply_extra_params(&mut query, params);
        }

        Ok(url)
    }

    /// Inspects the current page URL and, if it is an authorization
    /// redirect, completes the flow: validates the response, claims the
    /// pending state, redeems the code, and restores the original page.
    ///
    /// Returns `Ok(None)` when the current URL is not a redirect response
    /// at all, so this can run unconditionally on every page load.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthorizationResponse`] when the provider
    /// redirected back with an error, [`AuthError::MissingStateParam`] /
    /// [`AuthError::MissingCodeParam`] for malformed redirects,
    /// [`AuthError::UnrecognizedState`] when no pending request matches
    /// (CSRF or replay), and any redemption error from the token exchange.
    /// The pending state is consumed before the exchange, so a failed
    /// redemption is not retryable with the same state.
    pub async fn handle_redirect_response(
        &self,
        app: &AppConfig,
        params: Option<&AuthParams>,
    ) -> AuthResult<Option<TokenRecord>> {
        let current = self.navigator.current_url();
        let Some(response) = AuthorizeResponse::from_url(&current) else {
            return Ok(None);
        };

        if let Some(error) = response.error {
            return Err(AuthError::authorization_response(
                error,
                response.error_description.unwrap_or_default(),
            ));
        }
        let state_id = response.state.ok_or(AuthError::MissingStateParam)?;
        let code = response.code.ok_or(AuthError::MissingCodeParam)?;

        // Consume the pending state before any network I/O. A second
        // redirect with the same state fails here, whatever happens next.
        let pending = self
            .states
            .claim(&state_id)
            .await?
            .ok_or_else(|| AuthError::UnrecognizedState(state_id.clone()))?;

        let record = self.redeem_code(app, &code, &pending, params).await?;

        if let Some(return_url) = &pending.return_url {
            tracing::debug!("restoring pre-login page");
            self.navigator.replace(return_url);
        }

        Ok(Some(record))
    }

    /// Exchanges an authorization code for tokens and persists the result.
    ///
    /// # Errors
    ///
    /// Returns an error on discovery failure, network failure, a
    /// non-success token endpoint response, or a storage failure.
    pub async fn redeem_code(
        &self,
        app: &AppConfig,
        code: &str,
        pending: &PendingAuthState,
        params: Option<&AuthParams>,
    ) -> AuthResult<TokenRecord> {
        let document = self.discovery.get(&app.authority).await?;

        let mut form: Vec<(String, String)> = vec![
            ("client_id".into(), app.client_id.clone()),
            ("grant_type".into(), "authorization_code".into()),
            ("scope".into(), compose_scope(params)),
            ("code".into(), code.to_string()),
            ("redirect_uri".into(), app.redirect_uri.to_string()),
            ("code_verifier".into(), pending.code_verifier.clone()),
        ];
        extend_extra_params(&mut form, params);

        let record = self.exchange(&document.token_endpoint, &form).await?;
        self.tokens.set(&record).await?;
        Ok(record)
    }

    /// Obtains a fresh token record using the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoTokenToRefresh`] when no token record is
    /// stored or the stored record carries no refresh token; otherwise the
    /// same failure modes as [`redeem_code`](Self::redeem_code). The old
    /// record stays in place when the refresh fails.
    pub async fn refresh_session(
        &self,
        app: &AppConfig,
        params: Option<&AuthParams>,
    ) -> AuthResult<TokenRecord> {
        let current = self.tokens.get().await?.ok_or(AuthError::NoTokenToRefresh)?;
        let refresh_token = current.refresh_token.ok_or(AuthError::NoTokenToRefresh)?;

        let document = self.discovery.get(&app.authority).await?;

        let mut form: Vec<(String, String)> = vec![
            ("client_id".into(), app.client_id.clone()),
            ("grant_type".into(), "refresh_token".into()),
            ("scope".into(), compose_scope(params)),
            ("refresh_token".into(), refresh_token),
        ];
        extend_extra_params(&mut form, params);

        let record = self.exchange(&document.token_endpoint, &form).await?;
        self.tokens.set(&record).await?;
        Ok(record)
    }

    async fn exchange(&self, token_endpoint: &str, form: &[(String, String)]) -> AuthResult<TokenRecord> {
        tracing::debug!(endpoint = %token_endpoint, "posting to token endpoint");
        let response = self.http.post(token_endpoint).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "token endpoint rejected the request");
            return Err(AuthError::token_endpoint_error(status.as_u16(), body));
        }

        let wire: TokenResponse = response.json().await?;
        Ok(TokenRecord::stamp(wire))
    }

    /// Returns the stored token record, if any. Expiry is not evaluated.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn get_tokens(&self) -> AuthResult<Option<TokenRecord>> {
        Ok(self.tokens.get().await?)
    }

    /// Discards the stored token record. Local only: the provider session
    /// and any issued tokens are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn logout(&self) -> AuthResult<()> {
        tracing::debug!("clearing stored tokens");
        Ok(self.tokens.clear().await?)
    }
}

/// An authorization response parsed from a redirect URL.
///
/// Parameters are read from the fragment when one carries any of the
/// recognized names, otherwise from the query string, matching the
/// `response_mode=fragment` requested at departure while tolerating
/// providers that answer in the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeResponse {
    /// The authorization code.
    pub code: Option<String>,
    /// The `state` value echoed by the provider.
    pub state: Option<String>,
    /// The OAuth error code, when the provider declined.
    pub error: Option<String>,
    /// Human-readable error detail.
    pub error_description: Option<String>,
}

impl AuthorizeResponse {
    /// Parses a redirect URL. Returns `None` when neither the fragment nor
    /// the query carries any recognized parameter, i.e. the URL is not an
    /// authorization response.
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        if let Some(fragment) = url.fragment() {
            let parsed = Self::from_pairs(url::form_urlencoded::parse(fragment.as_bytes()));
            if parsed.is_redirect() {
                return Some(parsed);
            }
        }
        let parsed = Self::from_pairs(url.query_pairs());
        parsed.is_redirect().then_some(parsed)
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>) -> Self {
        let mut response = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "code" => response.code = Some(value.into_owned()),
                "state" => response.state = Some(value.into_owned()),
                "error" => response.error = Some(value.into_owned()),
                "error_description" => response.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        response
    }

    fn is_redirect(&self) -> bool {
        self.code.is_some() || self.state.is_some() || self.error.is_some()
    }
}

/// Composes the `scope` request value.
///
/// Caller scopes are space-joined and lower-cased; `openid` and `profile`
/// are then prepended unless the string already mentions them. The check is
/// a plain substring match, so a scope like `myopenidthing` suppresses the
/// `openid` prepend; providers that need the standard scopes regardless
/// should list them explicitly.
#[must_use]
pub fn compose_scope(params: Option<&AuthParams>) -> String {
    let mut scope = params
        .map(|p| p.scopes.join(" ").to_lowercase())
        .unwrap_or_default();
    if !scope.contains("profile") {
        scope = format!("profile {scope}");
    }
    if !scope.contains("openid") {
        scope = format!("openid {scope}");
    }
    scope
}

fn apply_extra_params(
    query: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>,
    params: Option<&AuthParams>,
) {
    let Some(params) = params else { return };
    if let Some(hint) = &params.login_hint {
        query.append_pair("login_hint", hint);
    }
    if let Some(prompt) = &params.prompt {
        query.append_pair("prompt", prompt);
    }
    for (key, value) in &params.extra_params {
        query.append_pair(key, value);
    }
}

fn extend_extra_params(form: &mut Vec<(String, String)>, params: Option<&AuthParams>) {
    let Some(params) = params else { return };
    if let Some(hint) = &params.login_hint {
        form.push(("login_hint".into(), hint.clone()));
    }
    if let Some(prompt) = &params.prompt {
        form.push(("prompt".into(), prompt.clone()));
    }
    for (key, value) in &params.extra_params {
        form.push((key.clone(), value.clone()));
    }
}
