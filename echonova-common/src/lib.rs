//! # Echonova Common Library
//!
//! Shared code for the Echonova services including:
//! - Identifier normalization across legacy encodings
//! - Document models and database initialization
//! - Bearer token and password primitives
//! - Configuration loading

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;

pub use error::{Error, Result};
