//! # posixdir-core
//!
//! Core types for the posixdir directory administration layer.
//!
//! This crate provides the shared error type and administrative credential
//! structures used by the directory engine crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and structured error responses
//! - [`credentials`] - Administrative bind identity for the directory

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
