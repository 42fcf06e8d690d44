//! HTTP mapping store client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use cutover_config::MappingStoreConfig;
use cutover_core::{LegacyKey, MappingRecord, RunId};
use cutover_interfaces::{MappingOutcome, MappingStore, StoreError};

/// Structured body of the store's duplicate response
#[derive(Debug, Deserialize)]
struct DuplicateBody {
    existing: MappingRecord,
    duplicate: MappingRecord,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u64,
}

/// Mapping store client over HTTP.
///
/// A logical duplicate comes back from the store as a 409 with a
/// structured `{existing, duplicate}` body and is surfaced as
/// [`MappingOutcome::Duplicate`], never as an error. Network failures and
/// unexpected statuses surface as [`StoreError`] for the caller's retry
/// machinery.
#[derive(Debug, Clone)]
pub struct HttpMappingStore {
    client: Client,
    base_url: Url,
}

impl HttpMappingStore {
    pub fn new(config: &MappingStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Malformed(format!("invalid base_url: {}", e)))?;

        debug!(base_url = %base_url, "created mapping store client");
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::Malformed(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn upstream_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Upstream { status, message }
    }
}

#[async_trait]
impl MappingStore for HttpMappingStore {
    async fn create_mapping(&self, record: MappingRecord) -> Result<MappingOutcome, StoreError> {
        let url = self.endpoint("mapping")?;
        let response = self
            .client
            .post(url)
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(MappingOutcome::Created(record)),
            StatusCode::CONFLICT => {
                let body: DuplicateBody = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Malformed(format!("duplicate body: {}", e)))?;
                warn!(
                    legacy_key = %body.existing.legacy_key,
                    "mapping store reported duplicate"
                );
                Ok(MappingOutcome::Duplicate {
                    existing: body.existing,
                    attempted: body.duplicate,
                })
            }
            _ => Err(Self::upstream_error(response).await),
        }
    }

    async fn find_by_legacy_key(
        &self,
        domain: &str,
        key: &LegacyKey,
    ) -> Result<Option<MappingRecord>, StoreError> {
        let url = self.endpoint("mapping")?;
        let response = self
            .client
            .get(url)
            .query(&[("domain", domain), ("legacyKey", key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record: MappingRecord = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Malformed(format!("mapping body: {}", e)))?;
                Ok(Some(record))
            }
            _ => Err(Self::upstream_error(response).await),
        }
    }

    async fn count_by_label(&self, label: RunId) -> Result<u64, StoreError> {
        let url = self.endpoint("mapping/count")?;
        let response = self
            .client
            .get(url)
            .query(&[("label", label.to_string())])
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: CountBody = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("count body: {}", e)))?;
        Ok(body.count)
    }

    async fn delete_by_legacy_key(&self, domain: &str, key: &LegacyKey) -> Result<(), StoreError> {
        let url = self.endpoint("mapping")?;
        let response = self
            .client
            .delete(url)
            .query(&[("domain", domain), ("legacyKey", key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // Idempotent repair: deleting an absent mapping is fine
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(Self::upstream_error(response).await),
        }
    }
}
