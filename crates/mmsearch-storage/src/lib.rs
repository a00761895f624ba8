//! S3-compatible object store client for derived media.
//!
//! Extracted audio is uploaded here so the speech recognizer can fetch it
//! by public URL.

pub mod client;
pub mod error;

pub use client::{ObjectStoreClient, ObjectStoreConfig};
pub use error::{StorageError, StorageResult};
