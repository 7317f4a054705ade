//! HomeHeaven session helpers.
//!
//! Stores the signed-in user's bearer token, username and email, attaches
//! the token to outgoing API requests, and sends visitors without a valid
//! session back to the login page.
//!
//! ```no_run
//! use homeheaven_session::{ApiClient, FetchOptions, MemoryStore, PageGuard, RecordingNavigator, SessionStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let session = SessionStore::new(MemoryStore::new());
//! let client = ApiClient::new("http://localhost:8080", session.clone())?;
//! let guard = PageGuard::new(session, RecordingNavigator::new());
//!
//! if guard.require_auth() {
//!     let outcome = guard.fetch(&client, "/api/properties", FetchOptions::new()).await?;
//!     if let Some(response) = outcome.into_response() {
//!         println!("{}", response.status());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod storage;

pub use api::{ApiClient, ApiError, AuthResponse, FetchOptions, FetchOutcome, RequestBody};
pub use auth::{SessionData, SessionStore};
pub use config::Config;
pub use guard::{Document, Element, Navigator, Page, PageGuard, RecordingNavigator};
pub use storage::{FileStore, KeychainStore, KeyValueStore, MemoryStore};
