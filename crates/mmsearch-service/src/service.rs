//! The search service facade.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};
use validator::Validate;

use mmsearch_enrich::{factory::build_pipeline, EnrichConfig, EnrichmentPipeline};
use mmsearch_index::{EsIndex, IndexConfig, SearchIndex};
use mmsearch_models::{labels, EmbeddingInfo, ListPage, MultimodalItem, SearchHit, SearchQuery};
use mmsearch_storage::{ObjectStoreClient, ObjectStoreConfig};

use crate::error::{ServiceError, ServiceResult};
use crate::requests::{
    ImageSearchRequest, InsertRequest, ListRequest, MultimodalSearchRequest, TextSearchRequest,
    VideoSearchRequest,
};

/// Everything the facade needs to bring its collaborators up.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub index: IndexConfig,
    pub enrich: EnrichConfig,
    pub object_store: ObjectStoreConfig,
}

impl ServiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        Ok(Self {
            index: IndexConfig::from_env().map_err(|e| ServiceError::service(e.to_string()))?,
            enrich: EnrichConfig::from_env().map_err(|e| ServiceError::service(e.to_string()))?,
            object_store: ObjectStoreConfig::from_env()
                .map_err(|e| ServiceError::service(e.to_string()))?,
        })
    }
}

/// Health snapshot reported by [`SearchService::status`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    pub index_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
}

struct ServiceState {
    pipeline: EnrichmentPipeline,
    index: Arc<dyn SearchIndex>,
}

/// Facade gluing the enrichment pipeline to the search index.
///
/// Collaborators are initialized lazily on first use, exactly once; every
/// caller after that shares the same pipeline and index handles.
pub struct SearchService {
    config: Option<ServiceConfig>,
    state: OnceCell<ServiceState>,
}

impl SearchService {
    /// Create an uninitialized service; collaborators come up on first use.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Some(config),
            state: OnceCell::new(),
        }
    }

    /// Create a service over pre-built collaborators (tests).
    pub fn with_components(pipeline: EnrichmentPipeline, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            config: None,
            state: OnceCell::new_with(Some(ServiceState { pipeline, index })),
        }
    }

    async fn state(&self) -> ServiceResult<&ServiceState> {
        self.state
            .get_or_try_init(|| async {
                let config = self
                    .config
                    .as_ref()
                    .ok_or_else(|| ServiceError::service("service config missing"))?;

                info!("Initializing search service");
                let store = ObjectStoreClient::new(config.object_store.clone());
                let pipeline = build_pipeline(&config.enrich, store)?;
                let index: Arc<dyn SearchIndex> =
                    Arc::new(EsIndex::connect(config.index.clone()).await?);
                info!("Search service initialized");

                Ok(ServiceState { pipeline, index })
            })
            .await
    }

    // ========================================================================
    // Query operations
    // ========================================================================

    /// Text query: lexical clause plus the query text's embedding.
    pub async fn search_text(&self, request: TextSearchRequest) -> ServiceResult<Vec<SearchHit>> {
        request.validate()?;
        let state = self.state().await?;

        let enrichment = state
            .pipeline
            .enrich(&MultimodalItem::from_text(&request.query))
            .await?;

        let mut embeddings = Vec::new();
        if let Some(text) = &enrichment.text {
            if let Some(embedding) = text.embeddings.first() {
                embeddings.push(EmbeddingInfo::new(labels::TEXT, embedding.clone()));
            }
        }

        let query = SearchQuery {
            text: Some(request.query),
            embeddings,
            top_k: request.top_k,
        };
        Ok(state.index.search(&query).await?)
    }

    /// Image query: content embedding plus the caption's embedding.
    pub async fn search_image(&self, request: ImageSearchRequest) -> ServiceResult<Vec<SearchHit>> {
        request.validate()?;
        let state = self.state().await?;

        let enrichment = state
            .pipeline
            .enrich(&MultimodalItem::from_image(&request.image_url))
            .await?;

        let mut embeddings = Vec::new();
        if let Some(image) = &enrichment.image {
            if let Some(embedding) = &image.embedding {
                embeddings.push(EmbeddingInfo::new(labels::IMAGE, embedding.clone()));
            }
            if let Some(embedding) = image.caption_embeddings.first() {
                embeddings.push(EmbeddingInfo::new(labels::IMAGE_CAPTION, embedding.clone()));
            }
        }

        let query = SearchQuery {
            text: None,
            embeddings,
            top_k: request.top_k,
        };
        Ok(state.index.search(&query).await?)
    }

    /// Video query: content embedding plus the transcript's embedding.
    pub async fn search_video(&self, request: VideoSearchRequest) -> ServiceResult<Vec<SearchHit>> {
        request.validate()?;
        let state = self.state().await?;

        let enrichment = state
            .pipeline
            .enrich(&MultimodalItem::from_video(&request.video_url))
            .await?;

        let mut embeddings = Vec::new();
        if let Some(video) = &enrichment.video {
            if let Some(embedding) = &video.embedding {
                embeddings.push(EmbeddingInfo::new(labels::VIDEO, embedding.clone()));
            }
            if let Some(embedding) = video.transcript_embeddings.first() {
                embeddings.push(EmbeddingInfo::new(
                    labels::VIDEO_TRANSCRIPT,
                    embedding.clone(),
                ));
            }
        }

        let query = SearchQuery {
            text: None,
            embeddings,
            top_k: request.top_k,
        };
        Ok(state.index.search(&query).await?)
    }

    /// Query over any combination of modalities, with every available
    /// labeled embedding in the disjunction.
    pub async fn search_multimodal(
        &self,
        request: MultimodalSearchRequest,
    ) -> ServiceResult<Vec<SearchHit>> {
        request.validate()?;
        let item = request.to_item();
        if !item.has_modality() {
            return Err(ServiceError::validation(
                "at least one of text, image_url, video_url is required",
            ));
        }

        let state = self.state().await?;
        let enrichment = state.pipeline.enrich(&item).await?;

        let query = SearchQuery {
            text: item.text.clone(),
            embeddings: enrichment.labeled_embeddings(),
            top_k: request.top_k,
        };
        Ok(state.index.search(&query).await?)
    }

    // ========================================================================
    // Insert operations
    // ========================================================================

    /// Enrich and index one item; returns the new document id.
    pub async fn insert(&self, request: InsertRequest) -> ServiceResult<String> {
        request.validate()?;
        self.insert_item(&request.to_item()).await
    }

    /// Enrich and index one raw item.
    pub async fn insert_item(&self, item: &MultimodalItem) -> ServiceResult<String> {
        if !item.has_modality() {
            return Err(ServiceError::validation(
                "at least one of text, image_url, video_url is required",
            ));
        }

        let state = self.state().await?;
        let enrichment = state.pipeline.enrich(item).await?;
        let record = enrichment.to_insert_record(item);
        let doc_id = state.index.insert(&record).await?;

        info!(doc_id = %doc_id, "Inserted item with modalities: {}", item.modalities());
        Ok(doc_id)
    }

    /// Enrich every item, then bulk-index the batch. Any enrichment failure
    /// fails the whole call; partial-failure semantics live in the async
    /// task path.
    pub async fn batch_insert(&self, items: &[MultimodalItem]) -> ServiceResult<usize> {
        if items.is_empty() {
            return Err(ServiceError::validation("no items to insert"));
        }
        for item in items {
            if !item.has_modality() {
                return Err(ServiceError::validation(
                    "every item needs at least one of text, image_url, video_url",
                ));
            }
        }

        let state = self.state().await?;
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let enrichment = state.pipeline.enrich(item).await?;
            records.push(enrichment.to_insert_record(item));
        }

        let inserted = state.index.bulk_insert(&records).await?;
        info!("Batch inserted {} of {} items", inserted, items.len());
        Ok(inserted)
    }

    // ========================================================================
    // Listing and status
    // ========================================================================

    /// Paged listing, newest first.
    pub async fn list_data(&self, request: ListRequest) -> ServiceResult<ListPage> {
        request.validate()?;
        let state = self.state().await?;
        Ok(state.index.list(request.page, request.page_size).await?)
    }

    /// Health snapshot: initialization plus a one-hit probe search.
    pub async fn status(&self) -> ServiceStatus {
        let Some(state) = self.state.get() else {
            return ServiceStatus {
                initialized: false,
                index_connected: false,
                index_error: None,
            };
        };

        let probe = SearchQuery {
            text: None,
            embeddings: Vec::new(),
            top_k: 1,
        };
        match state.index.search(&probe).await {
            Ok(_) => ServiceStatus {
                initialized: true,
                index_connected: true,
                index_error: None,
            },
            Err(e) => {
                error!("Index probe failed: {}", e);
                ServiceStatus {
                    initialized: true,
                    index_connected: false,
                    index_error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use mmsearch_enrich::{
        AudioUploader, Captioner, ImageEmbedder, ModelResult, TextEmbedder, Transcriber,
        VideoEmbedder,
    };
    use mmsearch_index::IndexResult;
    use mmsearch_models::InsertRecord;

    struct StubTextEmbedder;

    #[async_trait]
    impl TextEmbedder for StubTextEmbedder {
        async fn embed_text(&self, _text: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![0.1; 8])
        }
    }

    struct StubImageEmbedder;

    #[async_trait]
    impl ImageEmbedder for StubImageEmbedder {
        async fn embed_image(&self, _image_url: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![0.2; 8])
        }
    }

    struct StubVideoEmbedder;

    #[async_trait]
    impl VideoEmbedder for StubVideoEmbedder {
        async fn embed_video(&self, _video_url: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![0.3; 8])
        }
    }

    struct StubCaptioner;

    #[async_trait]
    impl Captioner for StubCaptioner {
        async fn caption(&self, _image_url: &str) -> ModelResult<String> {
            Ok("a caption".to_string())
        }
    }

    struct StubTranscriber;

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, _audio_url: &str) -> ModelResult<String> {
            Ok("a transcript".to_string())
        }
    }

    struct StubAudioUploader;

    #[async_trait]
    impl AudioUploader for StubAudioUploader {
        async fn extract_and_upload(&self, _video_url: &str) -> ModelResult<String> {
            Ok("https://bucket.example.com/audio/x.wav".to_string())
        }
    }

    #[derive(Default)]
    struct StubIndex {
        hits: Vec<SearchHit>,
        queries: Mutex<Vec<SearchQuery>>,
        inserted: Mutex<Vec<InsertRecord>>,
    }

    #[async_trait]
    impl SearchIndex for StubIndex {
        async fn search(&self, query: &SearchQuery) -> IndexResult<Vec<SearchHit>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.hits.clone())
        }

        async fn insert(&self, record: &InsertRecord) -> IndexResult<String> {
            self.inserted.lock().unwrap().push(record.clone());
            Ok("doc-1".to_string())
        }

        async fn bulk_insert(&self, records: &[InsertRecord]) -> IndexResult<usize> {
            self.inserted.lock().unwrap().extend(records.iter().cloned());
            Ok(records.len())
        }

        async fn list(&self, _page: usize, _page_size: usize) -> IndexResult<ListPage> {
            Ok(ListPage {
                total: self.hits.len() as u64,
                items: self.hits.clone(),
            })
        }

        async fn delete_all(&self) -> IndexResult<()> {
            Ok(())
        }
    }

    fn pipeline() -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            Arc::new(StubTextEmbedder),
            Arc::new(StubImageEmbedder),
            Arc::new(StubVideoEmbedder),
            Arc::new(StubCaptioner),
            Arc::new(StubTranscriber),
            Arc::new(StubAudioUploader),
        )
    }

    fn service_with(index: Arc<StubIndex>) -> SearchService {
        SearchService::with_components(pipeline(), index)
    }

    #[tokio::test]
    async fn test_search_text_builds_hybrid_query() {
        let index = Arc::new(StubIndex::default());
        let service = service_with(index.clone());

        service
            .search_text(TextSearchRequest {
                query: "cats".to_string(),
                top_k: 2,
            })
            .await
            .unwrap();

        let queries = index.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].text.as_deref(), Some("cats"));
        assert_eq!(queries[0].top_k, 2);
        assert_eq!(queries[0].embeddings.len(), 1);
        assert_eq!(queries[0].embeddings[0].label, labels::TEXT);
    }

    #[tokio::test]
    async fn test_search_image_includes_caption_embedding() {
        let index = Arc::new(StubIndex::default());
        let service = service_with(index.clone());

        service
            .search_image(ImageSearchRequest {
                image_url: "https://example.com/a.jpg".to_string(),
                top_k: 5,
            })
            .await
            .unwrap();

        let queries = index.queries.lock().unwrap();
        let queried_labels: Vec<&str> =
            queries[0].embeddings.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(queried_labels, vec![labels::IMAGE, labels::IMAGE_CAPTION]);
        assert!(queries[0].text.is_none());
    }

    #[tokio::test]
    async fn test_search_multimodal_requires_a_modality() {
        let service = service_with(Arc::new(StubIndex::default()));

        let result = service
            .search_multimodal(MultimodalSearchRequest {
                top_k: 10,
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_top_k_out_of_range_is_a_validation_error() {
        let service = service_with(Arc::new(StubIndex::default()));

        let result = service
            .search_text(TextSearchRequest {
                query: "cats".to_string(),
                top_k: 101,
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_insert_item_indexes_enriched_record() {
        let index = Arc::new(StubIndex::default());
        let service = service_with(index.clone());

        let item = MultimodalItem {
            text: Some("body".to_string()),
            image_url: Some("https://example.com/a.jpg".to_string()),
            video_url: None,
        };
        let doc_id = service.insert_item(&item).await.unwrap();
        assert_eq!(doc_id, "doc-1");

        let inserted = index.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].text, "body");
        assert_eq!(inserted[0].image_caption, "a caption");
        // text + image + caption embeddings
        assert_eq!(inserted[0].embeddings.len(), 3);
    }

    #[tokio::test]
    async fn test_insert_without_modality_is_rejected() {
        let service = service_with(Arc::new(StubIndex::default()));
        let result = service.insert_item(&MultimodalItem::default()).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_batch_insert_counts_written_records() {
        let index = Arc::new(StubIndex::default());
        let service = service_with(index.clone());

        let items = vec![
            MultimodalItem::from_text("dogs playing"),
            MultimodalItem::from_text("cats sleeping"),
            MultimodalItem::from_text("a red car"),
        ];
        let inserted = service.batch_insert(&items).await.unwrap();
        assert_eq!(inserted, 3);
        assert_eq!(index.inserted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_reports_probe_result() {
        let service = service_with(Arc::new(StubIndex::default()));
        let status = service.status().await;
        assert!(status.initialized);
        assert!(status.index_connected);
    }
}
