//! Redis key layout shared by tasks and credential stores.

use std::time::Duration;

/// Prefix for task records: `task:{id}`
pub const TASK_KEY_PREFIX: &str = "task:";

/// Set of all task ids.
pub const TASK_INDEX_KEY: &str = "task-index";

/// Prefix for auth token records: `auth-token:{token}`
pub const AUTH_TOKEN_PREFIX: &str = "auth-token:";

/// Prefix for API key records: `api-key:{key-id}`
pub const API_KEY_PREFIX: &str = "api-key:";

/// Set of all API key ids.
pub const API_KEY_INDEX_KEY: &str = "api-key-index";

/// Task record TTL (24 hours from creation).
pub const TASK_TTL: Duration = Duration::from_secs(24 * 3600);

/// Key for one task record.
pub fn task(id: &str) -> String {
    format!("{TASK_KEY_PREFIX}{id}")
}

/// Key for one auth token record.
pub fn auth_token(token: &str) -> String {
    format!("{AUTH_TOKEN_PREFIX}{token}")
}

/// Key for one API key record.
pub fn api_key(key_id: &str) -> String {
    format!("{API_KEY_PREFIX}{key_id}")
}
