//! Request-body builders for the Elasticsearch REST API.
//!
//! Kept free of I/O so the exact wire shapes are unit-testable.

use serde_json::{json, Value};
use uuid::Uuid;

use mmsearch_models::{InsertRecord, SearchQuery, VectorField};

use crate::config::VectorDimensions;

/// Index mapping: lexical fields, keyword URL fields, and the five cosine
/// dense-vector fields with configured dimensions.
pub fn build_mapping(dimensions: &VectorDimensions) -> Value {
    let mut properties = json!({
        "text": { "type": "text", "analyzer": "standard" },
        "image_url": { "type": "keyword" },
        "video_url": { "type": "keyword" },
        "image_caption": { "type": "text", "analyzer": "standard" },
        "video_transcript": { "type": "text", "analyzer": "standard" },
    });

    for field in VectorField::ALL {
        properties[field.as_str()] = json!({
            "type": "dense_vector",
            "dims": dimensions.for_field(field),
            "index": true,
            "similarity": "cosine",
        });
    }

    json!({ "mappings": { "properties": properties } })
}

/// Hybrid search body: a `multi_match` over the lexical fields plus one
/// cosine script-score clause per labeled vector, fused in a `should`
/// disjunction. A single clause is used bare; no clauses degenerate to
/// match-all.
pub fn build_search_body(query: &SearchQuery) -> Value {
    let mut should = Vec::new();

    if let Some(text) = query.text.as_deref() {
        if !text.is_empty() {
            should.push(json!({
                "multi_match": {
                    "query": text,
                    "fields": ["text^2", "image_caption", "video_transcript"],
                    "type": "best_fields",
                }
            }));
        }
    }

    for info in &query.embeddings {
        if info.label.is_empty() || info.embedding.is_empty() {
            continue;
        }
        let field = VectorField::from_label(&info.label);
        should.push(json!({
            "script_score": {
                "query": { "match_all": {} },
                "script": {
                    "source": format!(
                        "cosineSimilarity(params.query_vector, '{}') + 1.0",
                        field.as_str()
                    ),
                    "params": { "query_vector": info.embedding },
                }
            }
        }));
    }

    let query_clause = match should.len() {
        0 => json!({ "match_all": {} }),
        1 => should.into_iter().next().unwrap(),
        _ => json!({
            "bool": {
                "should": should,
                "minimum_should_match": 1,
            }
        }),
    };

    json!({
        "query": query_clause,
        "size": query.top_k,
        "_source": true,
    })
}

/// Paged match-all listing, newest documents first.
pub fn build_list_body(page: usize, page_size: usize) -> Value {
    json!({
        "query": { "match_all": {} },
        "from": (page - 1) * page_size,
        "size": page_size,
        "_source": true,
        "sort": [{ "_id": { "order": "desc" } }],
    })
}

/// Document source for one insert record, vectors routed by label.
pub fn build_document(record: &InsertRecord) -> Value {
    let mut doc = json!({
        "text": record.text,
        "image_url": record.image_url,
        "video_url": record.video_url,
        "image_caption": record.image_caption,
        "video_transcript": record.video_transcript,
    });

    for info in &record.embeddings {
        if info.label.is_empty() || info.embedding.is_empty() {
            continue;
        }
        let field = VectorField::from_label(&info.label);
        doc[field.as_str()] = json!(info.embedding);
    }

    doc
}

/// NDJSON body for one bulk chunk. Returns the payload and the generated
/// document ids, in order.
pub fn build_bulk_body(index: &str, records: &[InsertRecord]) -> (String, Vec<String>) {
    let mut body = String::new();
    let mut ids = Vec::with_capacity(records.len());

    for record in records {
        let id = Uuid::new_v4().to_string();
        let action = json!({ "index": { "_index": index, "_id": id } });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&build_document(record).to_string());
        body.push('\n');
        ids.push(id);
    }

    (body, ids)
}
