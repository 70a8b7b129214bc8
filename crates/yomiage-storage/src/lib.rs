//! Yomiage Storage Library
//!
//! This crate provides the storage abstraction for synthesized audio and its
//! implementations for Google Cloud Storage and the local filesystem.
//!
//! # Storage key format
//!
//! Audio objects are stored per caller: `downloads/{uid}/audio_{unix_millis}.mp3`.
//! When the caller identity is absent the uid segment is the literal `(null)`.
//! Key generation is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsStorage;
pub use keys::{audio_object_key, ANONYMOUS_USER_SEGMENT, AUDIO_CONTENT_TYPE};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
pub use yomiage_core::StorageBackend;
