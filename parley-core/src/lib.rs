//! Core types and configuration for parley
//!
//! This crate provides the conversation data model, configuration loading,
//! logging bootstrap and error types shared by the other parley crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
