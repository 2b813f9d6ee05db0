//! DynamoDB session backend for serverless deployments.
//!
//! Table schema:
//! - `session_id` (S): partition key
//! - `data` (S): JSON-encoded session payload
//! - `created_at` (N): Unix timestamp of the first write
//! - `ttl` (N): Unix timestamp for DynamoDB automatic cleanup

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{SESSION_MAX_AGE, SessionBackend, SessionData};

pub struct DynamoDbBackend {
    client: Client,
    table_name: String,
}

impl DynamoDbBackend {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    fn key(session_id: &str) -> AttributeValue {
        AttributeValue::S(session_id.to_string())
    }

    async fn created_at(&self, session_id: &str) -> Option<u64> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("session_id", Self::key(session_id))
            .projection_expression("created_at")
            .send()
            .await
            .ok()?;
        parse_n(result.item()?.get("created_at")?)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn parse_n(value: &AttributeValue) -> Option<u64> {
    value.as_n().ok()?.parse().ok()
}

impl SessionBackend for DynamoDbBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("session_id", Self::key(session_id))
            .send()
            .await
            .map_err(|e| tracing::error!("Failed to load session: {}", e))
            .ok()?;

        let item = result.item()?;

        // DynamoDB TTL deletion lags; enforce the lifetime here too
        let created_at = item.get("created_at").and_then(parse_n).unwrap_or(0);
        if now_secs().saturating_sub(created_at) > SESSION_MAX_AGE.as_secs() {
            self.delete(session_id).await;
            return None;
        }

        let data_json = item.get("data")?.as_s().ok()?;
        serde_json::from_str(data_json).ok()
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        let created_at = self.created_at(session_id).await.unwrap_or_else(now_secs);
        let ttl = created_at + SESSION_MAX_AGE.as_secs();
        let data_json = match serde_json::to_string(data) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize session data: {}", e);
                return;
            }
        };

        let _ = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("session_id", Self::key(session_id))
            .item("data", AttributeValue::S(data_json))
            .item("created_at", AttributeValue::N(created_at.to_string()))
            .item("ttl", AttributeValue::N(ttl.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to save session: {}", e);
            });
    }

    async fn delete(&self, session_id: &str) {
        let _ = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("session_id", Self::key(session_id))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete session: {}", e);
            });
    }
}
