//! Test Helper Utilities
//!
//! Shared utilities for repdir-sync integration tests

#![allow(dead_code)]

pub mod adapters;
pub mod db_utils;

// Re-export commonly used items; not every test binary uses all of them
#[allow(unused_imports)]
pub use adapters::{raw, StubAdapter};
#[allow(unused_imports)]
pub use db_utils::{create_test_db, load, seed, FailingStore};
