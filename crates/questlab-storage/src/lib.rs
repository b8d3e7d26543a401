//! QuestLab Storage Library
//!
//! This crate provides the storage abstraction for accepted uploads and its local
//! filesystem implementation.
//!
//! # Storage key format
//!
//! A key is the server-generated storage name of one upload (`{id}{.ext}`). Keys are
//! flat: they must not be empty, contain `..`, path separators or control
//! characters. Validation is centralized in the `keys` module so every backend
//! agrees on what a key may look like.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
