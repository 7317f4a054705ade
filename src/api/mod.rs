//! REST API client module for the HomeHeaven backend.
//!
//! `ApiClient` wraps `reqwest` and attaches the stored bearer token to
//! outgoing requests. `ApiError` classifies non-success statuses for the
//! calls that care about them (login, remote logout).

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse, FetchOptions, FetchOutcome, RequestBody};
pub use error::ApiError;
