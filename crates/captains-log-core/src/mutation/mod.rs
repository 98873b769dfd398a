//! Optimistic mutation coordinator.
//!
//! `MutationCoordinator` is the only component that touches both the cache
//! and the server for the same change. Screens hand it a cache key, a pure
//! local transformation and a thunk that performs the network call.

pub mod coordinator;

pub use coordinator::MutationCoordinator;
