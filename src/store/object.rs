use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::{info, warn};

use super::csv_codec::{decode_ledger, encode_ledger};
use super::{merge_record, LedgerStore, UpsertOutcome};
use crate::errors::AppError;
use crate::models::PriceRecord;

/// Headers attached to every ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutDirectives {
    pub cache_control: String,
    pub content_type: String,
}

impl PutDirectives {
    /// Readers (the dashboard, CDN edges) must never serve a stale ledger.
    pub fn ledger() -> Self {
        Self {
            cache_control: "no-cache".to_string(),
            content_type: "text/csv".to_string(),
        }
    }
}

/// Minimal object-store surface the ledger needs.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// `Ok(None)` when the object does not exist. Any other failure is an error.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn put(&self, key: &str, body: String, directives: &PutDirectives) -> Result<(), AppError>;
}

/// [`ObjectClient`] over any `object_store` backend.
pub struct StoreClient {
    store: Arc<dyn ObjectStore>,
}

impl StoreClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// S3 client; credentials come from the standard AWS environment variables.
    pub fn s3(bucket: &str, region: &str) -> Result<Self, AppError> {
        let store = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| {
                AppError::StorageUnavailable(format!("Failed to create S3 client: {}", e))
            })?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }
}

#[async_trait]
impl ObjectClient for StoreClient {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = ObjectPath::from(key);
        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => {
                return Err(AppError::StorageUnavailable(format!(
                    "Failed to read {}: {}",
                    key, e
                )))
            }
        };

        let bytes = result.bytes().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to read body of {}: {}", key, e))
        })?;

        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| AppError::CorruptLedger(format!("{} is not UTF-8: {}", key, e)))
    }

    async fn put(&self, key: &str, body: String, directives: &PutDirectives) -> Result<(), AppError> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::CacheControl, directives.cache_control.clone().into());
        attributes.insert(Attribute::ContentType, directives.content_type.clone().into());

        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&ObjectPath::from(key), PutPayload::from(body), options)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("Failed to write {}: {}", key, e)))?;

        Ok(())
    }
}

/// Ledger stored as a single object. Each write replaces the whole object.
pub struct ObjectLedger {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    key: String,
}

impl ObjectLedger {
    pub fn new(client: Arc<dyn ObjectClient>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl LedgerStore for ObjectLedger {
    async fn load(&self) -> Result<Vec<PriceRecord>, AppError> {
        match self.client.get(&self.key).await? {
            Some(content) => decode_ledger(&content),
            None => Ok(Vec::new()),
        }
    }

    async fn upsert(&self, record: PriceRecord) -> Result<UpsertOutcome, AppError> {
        // A read error aborts here; falling back to an empty ledger would erase history.
        let mut records = match self.client.get(&self.key).await? {
            Some(content) => decode_ledger(&content)?,
            None => {
                warn!("Creating new ledger at {}", self.location());
                Vec::new()
            }
        };

        let date = record.observation_date;
        let outcome = merge_record(&mut records, record);
        let content = encode_ledger(&records)?;

        self.client
            .put(&self.key, content, &PutDirectives::ledger())
            .await?;

        match outcome {
            UpsertOutcome::Updated { .. } => info!("Updated entry for {}", date),
            UpsertOutcome::Inserted { .. } => info!("Added entry for {}", date),
        }
        info!("Ledger saved to {} (Total: {} records)", self.location(), records.len());

        Ok(outcome)
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_object_is_none() {
        let client = StoreClient::in_memory();
        assert_eq!(client.get("history.csv").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_sets_cache_and_content_headers() {
        let client = StoreClient::in_memory();
        client
            .put("history.csv", "a,b\n".to_string(), &PutDirectives::ledger())
            .await
            .unwrap();

        let result = client.store.get(&ObjectPath::from("history.csv")).await.unwrap();
        let header = |attribute: Attribute| {
            result.attributes.get(&attribute).map(|v| {
                let value: &str = v.as_ref();
                value.to_string()
            })
        };
        let cache = header(Attribute::CacheControl);
        let content_type = header(Attribute::ContentType);

        assert_eq!(cache.as_deref(), Some("no-cache"));
        assert_eq!(content_type.as_deref(), Some("text/csv"));
        assert_eq!(client.get("history.csv").await.unwrap().as_deref(), Some("a,b\n"));
    }

    #[test]
    fn test_location_uses_bucket_and_key() {
        let ledger = ObjectLedger::new(Arc::new(StoreClient::in_memory()), "prices", "history.csv");
        assert_eq!(ledger.location(), "s3://prices/history.csv");
    }
}
