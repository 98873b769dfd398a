//! REST API client module for the Captain's Log server.
//!
//! This module provides the `ApiClient` for reading and changing boats,
//! trips, notes, maintenance tasks, to-do lists and settings.
//!
//! Every failure, whether transport, HTTP status or parse error, is normalized
//! into `ApiError`, which carries a message, a code and optional details.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{ApiClient, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use retry::{retry_request, RetryPolicy};
