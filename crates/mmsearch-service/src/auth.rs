//! Credential stores: auth tokens and API keys.
//!
//! Both live on the task store's key/value contract. Expiry is enforced on
//! read: an expired record is deleted and reported absent. Authorization
//! stops at "the caller is authenticated".

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use mmsearch_tasks::{keys, KvStore};

use crate::error::ServiceResult;

/// Authenticated principal attached to a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenData {
    user_info: UserInfo,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Bearer-token store with TTL-based expiry.
#[derive(Clone)]
pub struct AuthTokenStore {
    store: Arc<dyn KvStore>,
}

impl AuthTokenStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Store a token for a user, expiring after `expiration_hours`.
    pub async fn store_token(
        &self,
        token: &str,
        user_info: UserInfo,
        expiration_hours: i64,
    ) -> ServiceResult<()> {
        let now = Utc::now();
        let data = TokenData {
            user_info,
            created_at: now,
            expires_at: now + ChronoDuration::hours(expiration_hours),
        };

        // At least one second so the store's TTL stays valid; the
        // expires_at check still rejects already-expired tokens on read
        let ttl = std::time::Duration::from_secs((expiration_hours.max(0) as u64 * 3600).max(1));
        self.store
            .put(&keys::auth_token(token), &serde_json::to_string(&data)?, Some(ttl))
            .await?;
        Ok(())
    }

    /// Resolve a token to its user. Expired tokens are deleted on read.
    pub async fn get(&self, token: &str) -> ServiceResult<Option<UserInfo>> {
        let key = keys::auth_token(token);
        let Some(serialized) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let data: TokenData = match serde_json::from_str(&serialized) {
            Ok(data) => data,
            Err(e) => {
                warn!("Discarding unreadable token record: {}", e);
                self.store.delete(&key).await?;
                return Ok(None);
            }
        };

        if data.expires_at <= Utc::now() {
            self.store.delete(&key).await?;
            return Ok(None);
        }

        Ok(Some(data.user_info))
    }

    /// Revoke a token. Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> ServiceResult<bool> {
        let key = keys::auth_token(token);
        let existed = self.store.get(&key).await?.is_some();
        self.store.delete(&key).await?;
        Ok(existed)
    }
}

/// A stored API key credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub name: String,
    /// The secret itself
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub permissions: Vec<String>,
}

impl ApiKeyRecord {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= Utc::now())
    }

    fn remaining_ttl(&self) -> Option<std::time::Duration> {
        self.expires_at.map(|expires_at| {
            (expires_at - Utc::now())
                .to_std()
                .unwrap_or_default()
                .max(std::time::Duration::from_secs(1))
        })
    }
}

/// API key store with validate-by-secret.
#[derive(Clone)]
pub struct ApiKeyStore {
    store: Arc<dyn KvStore>,
}

impl ApiKeyStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn generate_secret() -> String {
        let material: [u8; 32] = rand::random();
        format!("mms_{}", URL_SAFE_NO_PAD.encode(material))
    }

    /// Create a new key with an optional expiry in days.
    pub async fn create(
        &self,
        name: impl Into<String>,
        expires_in_days: Option<i64>,
        permissions: Vec<String>,
    ) -> ServiceResult<ApiKeyRecord> {
        let now = Utc::now();
        let record = ApiKeyRecord {
            key_id: Uuid::new_v4().to_string(),
            name: name.into(),
            key: Self::generate_secret(),
            created_at: now,
            last_used_at: None,
            expires_at: expires_in_days.map(|days| now + ChronoDuration::days(days)),
            permissions,
        };

        self.write(&record).await?;
        self.store
            .set_add(keys::API_KEY_INDEX_KEY, &record.key_id)
            .await?;

        info!(key_id = %record.key_id, "Created API key {}", record.name);
        Ok(record)
    }

    async fn write(&self, record: &ApiKeyRecord) -> ServiceResult<()> {
        self.store
            .put(
                &keys::api_key(&record.key_id),
                &serde_json::to_string(record)?,
                record.remaining_ttl(),
            )
            .await?;
        Ok(())
    }

    async fn read(&self, key_id: &str) -> ServiceResult<Option<ApiKeyRecord>> {
        let key = keys::api_key(key_id);
        let Some(serialized) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<ApiKeyRecord>(&serialized) {
            Ok(record) if record.is_expired() => {
                self.remove(key_id).await?;
                Ok(None)
            }
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key_id, "Discarding unreadable API key record: {}", e);
                Ok(None)
            }
        }
    }

    async fn remove(&self, key_id: &str) -> ServiceResult<()> {
        self.store.delete(&keys::api_key(key_id)).await?;
        self.store
            .set_remove(keys::API_KEY_INDEX_KEY, key_id)
            .await?;
        Ok(())
    }

    /// All live keys, pruning expired entries as they are found.
    pub async fn list(&self) -> ServiceResult<Vec<ApiKeyRecord>> {
        let ids = self.store.set_members(keys::API_KEY_INDEX_KEY).await?;
        let mut records = Vec::new();
        for id in ids {
            if let Some(record) = self.read(&id).await? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete a key by id. Returns whether it existed.
    pub async fn delete(&self, key_id: &str) -> ServiceResult<bool> {
        let existed = self.read(key_id).await?.is_some();
        self.remove(key_id).await?;
        Ok(existed)
    }

    /// Validate a presented secret.
    ///
    /// On success the record's `last_used_at` is refreshed and written back;
    /// concurrent validations race benignly (last writer wins).
    pub async fn validate(&self, secret: &str) -> ServiceResult<Option<ApiKeyRecord>> {
        let ids = self.store.set_members(keys::API_KEY_INDEX_KEY).await?;

        for id in ids {
            let Some(mut record) = self.read(&id).await? else {
                continue;
            };
            if record.key == secret {
                record.last_used_at = Some(Utc::now());
                self.write(&record).await?;
                return Ok(Some(record));
            }
        }

        Ok(None)
    }
}
