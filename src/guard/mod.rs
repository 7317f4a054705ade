//! Page guards: the checks a page runs on load.
//!
//! `PageGuard` pairs a `SessionStore` with a `Navigator`. Session clearing
//! stays in the store; the guard is where clearing and redirecting are
//! composed, so both halves can be tested without a real browser.

pub mod navigator;
pub mod page;

use anyhow::Result;
use tracing::{debug, info};

pub use navigator::{Navigator, RecordingNavigator};
pub use page::{Document, Element, Page};

use crate::api::{ApiClient, FetchOptions, FetchOutcome};
use crate::auth::SessionStore;
use crate::config::DEFAULT_LOGIN_PAGE;
use crate::storage::KeyValueStore;

/// Marker class for elements that show the signed-in username
pub const USERNAME_DISPLAY_CLASS: &str = "username-display";

pub struct PageGuard<S, N> {
    session: SessionStore<S>,
    navigator: N,
    login_page: String,
}

impl<S: KeyValueStore, N: Navigator> PageGuard<S, N> {
    pub fn new(session: SessionStore<S>, navigator: N) -> Self {
        Self {
            session,
            navigator,
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
        }
    }

    pub fn with_login_page(mut self, login_page: impl Into<String>) -> Self {
        self.login_page = login_page.into();
        self
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    pub fn login_page(&self) -> &str {
        &self.login_page
    }

    fn redirect_to_login(&self) {
        self.navigator.navigate(&self.login_page);
    }

    /// Send unauthenticated visitors to the login page.
    /// Returns whether a session was present.
    pub fn require_auth(&self) -> bool {
        if self.session.is_authenticated() {
            return true;
        }
        debug!("No session, redirecting to login");
        self.redirect_to_login();
        false
    }

    /// Write the stored username into every marked element.
    ///
    /// Without a username nothing is touched, so placeholder text stays.
    pub fn display_username(&self, document: &mut impl Document) -> usize {
        match self.session.username().filter(|u| !u.is_empty()) {
            Some(username) => document.set_text_by_class(USERNAME_DISPLAY_CLASS, &username),
            None => 0,
        }
    }

    /// Clear the session, then navigate to the login page.
    ///
    /// Returning from this does not stop the caller; code after it still runs.
    pub fn logout(&self) -> Result<()> {
        self.session.logout()?;
        info!("Logged out");
        self.redirect_to_login();
        Ok(())
    }

    /// `ApiClient::fetch`, redirecting to the login page when the session
    /// has expired.
    pub async fn fetch(
        &self,
        client: &ApiClient<S>,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchOutcome> {
        let outcome = client.fetch(url, options).await?;
        if outcome.is_session_expired() {
            self.redirect_to_login();
        }
        Ok(outcome)
    }
}
