//! Shared test helpers for `minetally-core` integration tests.
//!
//! An in-memory store implementing every repository port with the same
//! transaction semantics as the SQLite adapters, plus payload fixtures.

#![allow(dead_code)]

pub mod fixtures;
pub mod repositories;

pub use fixtures::*;
pub use repositories::InMemoryStore;
