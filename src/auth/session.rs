use anyhow::Result;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::api::AuthResponse;
use crate::storage::KeyValueStore;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";
/// Storage key for the display username
pub const USERNAME_KEY: &str = "username";
/// Storage key for the account email
pub const EMAIL_KEY: &str = "email";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USERNAME_KEY, EMAIL_KEY];

/// All three session fields read at once. Each may be absent on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub token: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Accessor over the `token`/`username`/`email` keys of a store.
///
/// Username and email are display-only and never checked against the token.
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the bearer token, if one is stored
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY)
    }

    pub fn username(&self) -> Option<String> {
        self.store.get(USERNAME_KEY)
    }

    pub fn email(&self) -> Option<String> {
        self.store.get(EMAIL_KEY)
    }

    pub fn snapshot(&self) -> SessionData {
        SessionData {
            token: self.token(),
            username: self.username(),
            email: self.email(),
        }
    }

    /// True iff a non-empty token is stored
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some_and(|t| !t.is_empty())
    }

    /// Persist the fields of a successful login
    pub fn save(&self, auth: &AuthResponse) -> Result<()> {
        self.store.set(TOKEN_KEY, &auth.token)?;
        self.store.set(USERNAME_KEY, &auth.username)?;
        match auth.email.as_deref() {
            Some(email) => self.store.set(EMAIL_KEY, email)?,
            None => self.store.remove(EMAIL_KEY)?,
        }
        info!(username = %auth.username, "Session saved");
        Ok(())
    }

    /// Delete all three session keys.
    ///
    /// Only clears storage; it does not navigate anywhere and the caller
    /// keeps running afterwards. Use `PageGuard::logout` to also redirect.
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// failure is returned once all three have been tried.
    pub fn logout(&self) -> Result<()> {
        let mut first_error = None;
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Session cleared");
                Ok(())
            }
        }
    }

    /// Default headers for a JSON API call.
    ///
    /// `Authorization` is `Bearer <token>` when a token is stored and the
    /// empty string otherwise. The token is not inspected.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let authorization = match self.token() {
            Some(token) if !token.is_empty() => {
                HeaderValue::from_str(&format!("Bearer {}", token))?
            }
            _ => {
                debug!("No token stored, sending empty Authorization");
                HeaderValue::from_static("")
            }
        };
        headers.insert(header::AUTHORIZATION, authorization);
        Ok(headers)
    }
}
