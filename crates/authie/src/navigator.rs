//! Browsing-context navigation as an injected capability.
//!
//! The flow's "departure" to the authorization endpoint and its return-URL
//! restore after redemption are both page navigations. Modeling them behind
//! a trait keeps the two halves of the state machine testable without a real
//! browsing context.

use url::Url;

/// The surrounding browsing context: where the page is now, and how to
/// leave it.
pub trait Navigator: Send + Sync {
    /// The current page location, including any fragment.
    fn current_url(&self) -> Url;

    /// Navigates to `url`, keeping the current page in history. Used for
    /// the departure to the authorization endpoint.
    fn assign(&self, url: &Url);

    /// Navigates to `url`, replacing the current history entry. Used to
    /// restore the page the flow was started from, so the redirect landing
    /// page does not stay in history.
    fn replace(&self, url: &Url);
}
