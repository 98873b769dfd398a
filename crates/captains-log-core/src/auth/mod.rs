//! Authentication state for the API client.
//!
//! This module provides:
//! - `TokenStore`: the bearer token shared by all API client clones
//! - `Session`: the token persisted to disk between CLI runs
//!
//! Obtaining the token is the server's job; the login endpoint lives on
//! `ApiClient`.

pub mod session;
pub mod token;

pub use session::{Session, SessionData};
pub use token::TokenStore;
