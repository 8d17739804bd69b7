//! Storage abstraction and implementations for changeover state.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! reference implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;

pub use trait_::{load_or_default, Storage, StorageError, StateMeta, Result};
pub use json_storage::JsonStorage;
