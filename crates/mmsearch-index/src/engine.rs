//! Hybrid search engine over the Elasticsearch REST API.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use mmsearch_models::{InsertRecord, ListPage, SearchHit, SearchQuery};

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::metrics::record_request;
use crate::query::{build_bulk_body, build_document, build_list_body, build_mapping, build_search_body};
use crate::retry::{with_retry, RetryConfig};

/// The single-index hybrid store contract.
///
/// Implementations tolerate any subset of vectors per document and any
/// subset of clauses per search; the disjunction degrades gracefully.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ranked hybrid search, at most `top_k` hits.
    async fn search(&self, query: &SearchQuery) -> IndexResult<Vec<SearchHit>>;

    /// Index one document under a fresh id; searchable on return.
    async fn insert(&self, record: &InsertRecord) -> IndexResult<String>;

    /// Index many documents in chunks; returns the number written.
    async fn bulk_insert(&self, records: &[InsertRecord]) -> IndexResult<usize>;

    /// Paged match-all listing, newest first. `page` is 1-based.
    async fn list(&self, page: usize, page_size: usize) -> IndexResult<ListPage>;

    /// Remove every document. Test setup only.
    async fn delete_all(&self) -> IndexResult<()>;
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    #[serde(default)]
    total: Option<EsTotal>,
    #[serde(default)]
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: EsSource,
}

#[derive(Debug, Default, Deserialize)]
struct EsSource {
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    video_url: String,
    #[serde(default)]
    image_caption: String,
    #[serde(default)]
    video_transcript: String,
}

impl EsHit {
    fn into_search_hit(self) -> SearchHit {
        SearchHit {
            id: self.id,
            text: self.source.text,
            image_url: self.source.image_url,
            video_url: self.source.video_url,
            image_caption: self.source.image_caption,
            video_transcript: self.source.video_transcript,
            score: self.score.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    index: BulkIndexResult,
}

#[derive(Debug, Deserialize)]
struct BulkIndexResult {
    status: u16,
}

// ============================================================================
// Engine
// ============================================================================

/// Elasticsearch-backed search index.
pub struct EsIndex {
    http: Client,
    config: IndexConfig,
    base_url: String,
    retry: RetryConfig,
}

impl EsIndex {
    /// Connect to the cluster and ensure the index schema exists.
    pub async fn connect(config: IndexConfig) -> IndexResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(IndexError::Network)?;

        let base_url = config.base_url();
        let retry = RetryConfig::with_max_retries(config.max_retries);

        let engine = Self {
            http,
            config,
            base_url,
            retry,
        };
        engine.ensure_index().await?;
        Ok(engine)
    }

    /// Connect using environment configuration.
    pub async fn from_env() -> IndexResult<Self> {
        Self::connect(IndexConfig::from_env()?).await
    }

    fn index_url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.config.index, suffix)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.username, &self.config.password) {
            (Some(username), password) => request.basic_auth(username, password.as_deref()),
            _ => request,
        }
    }

    /// Send a request, recording metrics and mapping non-2xx to errors.
    async fn send(&self, operation: &str, request: RequestBuilder) -> IndexResult<reqwest::Response> {
        let started = Instant::now();
        let response = self.with_auth(request).send().await?;
        let status = response.status();
        record_request(operation, status.as_u16(), started.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::request_failed(status.as_u16(), body));
        }
        Ok(response)
    }

    /// Create the index schema on first use.
    async fn ensure_index(&self) -> IndexResult<()> {
        let url = self.index_url("");
        let response = self.with_auth(self.http.head(&url)).send().await?;

        match response.status().as_u16() {
            200 => {
                debug!("Index {} already exists", self.config.index);
                Ok(())
            }
            404 => {
                info!("Creating index {}", self.config.index);
                let mapping = build_mapping(&self.config.dimensions);
                self.send("create_index", self.http.put(&url).json(&mapping))
                    .await?;
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(IndexError::request_failed(status, body))
            }
        }
    }

    /// Request a refresh so recent writes become searchable.
    async fn refresh(&self) -> IndexResult<()> {
        let url = self.index_url("/_refresh");
        self.send("refresh", self.http.post(&url)).await?;
        Ok(())
    }

    async fn run_search(&self, operation: &str, body: &serde_json::Value) -> IndexResult<EsSearchResponse> {
        let url = self.index_url("/_search");
        let response = with_retry(&self.retry, operation, || async {
            self.send(operation, self.http.post(&url).json(body)).await
        })
        .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SearchIndex for EsIndex {
    async fn search(&self, query: &SearchQuery) -> IndexResult<Vec<SearchHit>> {
        let body = build_search_body(query);
        let response = self.run_search("search", &body).await?;

        let hits: Vec<SearchHit> = response
            .hits
            .hits
            .into_iter()
            .map(EsHit::into_search_hit)
            .collect();

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn insert(&self, record: &InsertRecord) -> IndexResult<String> {
        let doc_id = Uuid::new_v4().to_string();
        let url = self.index_url(&format!("/_doc/{doc_id}"));
        let doc = build_document(record);

        with_retry(&self.retry, "insert", || async {
            self.send("insert", self.http.put(&url).json(&doc)).await
        })
        .await?;
        self.refresh().await?;

        info!(doc_id = %doc_id, "Indexed document");
        Ok(doc_id)
    }

    async fn bulk_insert(&self, records: &[InsertRecord]) -> IndexResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = format!(
            "{}/_bulk?refresh={}",
            self.base_url,
            self.config.refresh.as_param()
        );
        let mut inserted = 0;

        for chunk in records.chunks(self.config.batch_size) {
            let (body, _ids) = build_bulk_body(&self.config.index, chunk);
            let response = with_retry(&self.retry, "bulk_insert", || async {
                self.send(
                    "bulk_insert",
                    self.http
                        .post(&url)
                        .header("Content-Type", "application/x-ndjson")
                        .body(body.clone()),
                )
                .await
            })
            .await?;

            let bulk: BulkResponse = response.json().await?;
            if bulk.errors {
                let ok = bulk.items.iter().filter(|item| item.index.status < 300).count();
                inserted += ok;
                debug!("Bulk chunk wrote {}/{} documents", ok, chunk.len());
            } else {
                inserted += chunk.len();
            }
        }

        info!("Bulk insert wrote {} of {} documents", inserted, records.len());
        Ok(inserted)
    }

    async fn list(&self, page: usize, page_size: usize) -> IndexResult<ListPage> {
        let body = build_list_body(page, page_size);
        let response = self.run_search("list", &body).await?;

        let total = response.hits.total.map(|t| t.value).unwrap_or(0);
        let items: Vec<SearchHit> = response
            .hits
            .hits
            .into_iter()
            .map(EsHit::into_search_hit)
            .collect();

        Ok(ListPage { total, items })
    }

    async fn delete_all(&self) -> IndexResult<()> {
        let url = self.index_url("/_delete_by_query");
        let body = serde_json::json!({ "query": { "match_all": {} } });

        self.send("delete_all", self.http.post(&url).json(&body))
            .await?;
        self.refresh().await?;
        Ok(())
    }
}
