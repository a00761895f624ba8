//! Search service facade and credential stores.
//!
//! This crate glues the enrichment pipeline to the search index: it
//! validates caller intent, enriches queries and items, drives the index,
//! and normalizes every failure into the service error taxonomy. It also
//! owns the auth-token and API-key stores layered on the task store's
//! key/value contract.

pub mod auth;
pub mod error;
pub mod requests;
pub mod service;

pub use auth::{ApiKeyRecord, ApiKeyStore, AuthTokenStore, UserInfo};
pub use error::{ServiceError, ServiceResult};
pub use requests::{
    ImageSearchRequest, InsertRequest, ListRequest, MultimodalSearchRequest, TextSearchRequest,
    VideoSearchRequest,
};
pub use service::{SearchService, ServiceConfig, ServiceStatus};
