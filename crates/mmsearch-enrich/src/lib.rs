//! Model adapters and the multimodal enrichment pipeline.
//!
//! This crate provides:
//! - One async trait per model adapter kind (text/image/video embedding,
//!   captioning, transcription, audio extract-and-upload)
//! - The DashScope vendor implementation behind those traits
//! - A startup-time factory selecting implementations from configuration
//! - The fan-out-then-merge pipeline turning a raw item into an enrichment
//!   record

pub mod adapters;
pub mod audio;
pub mod config;
pub mod dashscope;
pub mod error;
pub mod factory;
pub mod pipeline;
pub mod qwen;

pub use adapters::{
    AudioUploader, Captioner, ImageEmbedder, TextEmbedder, Transcriber, VideoEmbedder,
};
pub use config::{AdapterConfig, CaptionerConfig, EnrichConfig, TranscriberConfig};
pub use error::{ModelError, ModelResult};
pub use pipeline::EnrichmentPipeline;
