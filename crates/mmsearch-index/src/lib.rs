//! Elasticsearch REST client for the hybrid lexical/vector index.
//!
//! One index holds every document: lexical fields (`text`, `image_caption`,
//! `video_transcript`), keyword URL fields, and up to five cosine
//! dense-vector fields. Search fuses a `multi_match` clause with
//! script-scored cosine clauses in a single disjunction.

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod query;
pub mod retry;


pub use config::{IndexConfig, RefreshPolicy, VectorDimensions};
pub use engine::{EsIndex, SearchIndex};
pub use error::{IndexError, IndexResult};
