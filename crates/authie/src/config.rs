//! Client application configuration and per-request authorization parameters.

use url::Url;

/// Static configuration for the client application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the identity provider, e.g.
    /// `https://login.example.com/tenant`.
    pub authority: Url,

    /// OAuth client identifier registered with the provider.
    pub client_id: String,

    /// The URI the authorization server redirects back to.
    pub redirect_uri: Url,
}

impl AppConfig {
    /// Creates a new configuration.
    #[must_use]
    pub fn new(authority: Url, client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            authority,
            client_id: client_id.into(),
            redirect_uri,
        }
    }
}

/// Optional per-request authorization parameters.
///
/// `extra_params` are appended to the request after the fixed parameters, in
/// order. A duplicate key is sent twice and the receiving server's
/// last-wins query semantics decide; nothing is overwritten locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthParams {
    /// Requested scopes. `openid` and `profile` are prepended when absent;
    /// see [`compose_scope`](crate::flow::compose_scope) for the exact rule.
    pub scopes: Vec<String>,

    /// Hint to pre-fill the provider's login form.
    pub login_hint: Option<String>,

    /// The OIDC `prompt` parameter (`login`, `consent`, `none`, ...).
    pub prompt: Option<String>,

    /// Opaque caller state, round-tripped unchanged on the pending record.
    pub state: Option<String>,

    /// Additional request parameters, appended last in order.
    pub extra_params: Vec<(String, String)>,
}

impl AuthParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the login hint.
    #[must_use]
    pub fn with_login_hint(mut self, hint: impl Into<String>) -> Self {
        self.login_hint = Some(hint.into());
        self
    }

    /// Sets the `prompt` parameter.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the opaque caller state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Appends an extra request parameter.
    #[must_use]
    pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }
}
