//! OAuth 2.0 authorization code + PKCE client core.
//!
//! This crate implements the client half of the authorization code flow
//! with PKCE (RFC 6749 + RFC 7636) for redirect-based applications: it
//! builds the authorization request, survives the navigation round trip
//! through an injected key-value store, validates the redirect response,
//! and redeems the code at the token endpoint.
//!
//! The environment is injected at the seams: storage ([`KvStore`]),
//! navigation ([`Navigator`]), and randomness ([`RandomSource`]), so the
//! core runs the same against a browser-style session store, a test
//! harness, or anything in between.
//!
//! # Modules
//!
//! - [`flow`] - the [`AuthFlow`] state machine and redirect parsing
//! - [`config`] - application configuration and per-request parameters
//! - [`discovery`] - OpenID Connect provider discovery with caching
//! - [`state`] - pending authorization request records
//! - [`token`] - token records and persistence
//! - [`storage`] - the injected key-value store and namespacing
//! - [`codec`] - UUID, base64url, and S256 challenge primitives
//! - [`navigator`] - navigation as an injected capability
//! - [`random`] - randomness as an injected capability
//! - [`error`] - the error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use url::Url;
//! use authie::{AppConfig, AuthFlow, AuthParams, MemoryStore, Navigator};
//!
//! # struct MyNavigator;
//! # impl Navigator for MyNavigator {
//! #     fn current_url(&self) -> Url { Url::parse("https://app.example.com/").unwrap() }
//! #     fn assign(&self, _url: &Url) {}
//! #     fn replace(&self, _url: &Url) {}
//! # }
//! # async fn run() -> Result<(), authie::AuthError> {
//! let flow = AuthFlow::new(Arc::new(MemoryStore::new()), Arc::new(MyNavigator));
//! let app = AppConfig::new(
//!     Url::parse("https://login.example.com")?,
//!     "my-client-id",
//!     Url::parse("https://app.example.com/callback")?,
//! );
//!
//! // On every page load: completes the flow if this is the redirect.
//! if let Some(tokens) = flow.handle_redirect_response(&app, None).await? {
//!     println!("signed in, token type {}", tokens.token_type);
//! }
//!
//! // On a login click: departs for the authorization endpoint.
//! let params = AuthParams::new().with_scopes(["email", "offline_access"]);
//! flow.login_redirect(&app, Some(&params)).await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod navigator;
pub mod random;
pub mod state;
pub mod storage;
pub mod token;

pub use config::{AppConfig, AuthParams};
pub use discovery::{DiscoveryCache, DiscoveryDocument};
pub use error::AuthError;
pub use flow::{AuthFlow, AuthResult, AuthorizeResponse, compose_scope};
pub use navigator::Navigator;
pub use random::{OsRandom, RandomSource};
pub use state::{PendingAuthState, PendingStateStore};
pub use storage::{KEY_PREFIX, Keyspace, KvStore, MemoryStore, StoreError};
pub use token::{TokenRecord, TokenResponse, TokenStore};
