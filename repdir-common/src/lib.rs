//! # repdir Common Library
//!
//! Shared code for the representative directory services including:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Database initialization and the canonical representative model

pub mod config;
pub mod db;
pub mod error;

pub use db::models::{IdentityKey, Representative};
pub use error::{Error, Result};
