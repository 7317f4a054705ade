//! Session state for the signed-in user.
//!
//! `SessionStore` reads and writes the bearer token, username and email
//! through an injected [`KeyValueStore`](crate::storage::KeyValueStore),
//! and builds the default request headers from them.

pub mod session;

pub use session::{SessionData, SessionStore, EMAIL_KEY, TOKEN_KEY, USERNAME_KEY};
