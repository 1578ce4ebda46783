//! Object store backed by the hosted storage REST API.
//!
//! Endpoints used:
//! - `POST {base}/storage/v1/object/list/{bucket}` - paged listing
//! - `DELETE {base}/storage/v1/object/{bucket}` - batch delete
//!
//! Every request is retried on transient failures (timeouts, 408/429/5xx).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::backend::ObjectStore;
use super::types::{DeleteOutcome, DeleteResult, PageRequest, StoredObject, StoreError};
use crate::hosted::{HostedClient, ResponseFailure, check_status};
use crate::reliability::retry_async;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

/// One entry of a listing response. Folders have no `id`.
#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    prefixes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct DeletedEntry {
    name: String,
}

impl From<ResponseFailure> for StoreError {
    fn from(failure: ResponseFailure) -> Self {
        match failure {
            ResponseFailure::Unauthorized(msg) => Self::Unauthorized(msg),
            ResponseFailure::Status { status, body } => Self::Status { status, body },
        }
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

/// Joins a listing entry name onto its partition.
fn qualify(partition: &str, name: &str) -> String {
    if partition.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", partition.trim_end_matches('/'))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidResponse(format!("bad created_at '{raw}': {e}")))
}

/// Converts a listing entry. Folders and entries with an unreadable
/// timestamp come back undated, which the collector always keeps.
fn into_object(partition: &str, entry: ListEntry) -> StoredObject {
    let path = qualify(partition, &entry.name);
    let (Some(_), Some(raw)) = (&entry.id, entry.created_at.as_deref()) else {
        return StoredObject::undated(path);
    };
    match parse_timestamp(raw) {
        Ok(created_at) => StoredObject::new(path, created_at),
        Err(e) => {
            warn!(path = %path, error = %e, "Unreadable created_at, keeping object");
            StoredObject::undated(path)
        },
    }
}

/// Object store for one bucket of the hosted storage API.
#[derive(Debug, Clone)]
pub struct RestObjectStore {
    client: HostedClient,
    bucket: String,
}

impl RestObjectStore {
    pub fn new(client: HostedClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn list_once(
        &self,
        partition: &str,
        page: PageRequest,
    ) -> Result<Vec<StoredObject>, StoreError> {
        let url = self
            .client
            .endpoint(&format!("storage/v1/object/list/{}", self.bucket))
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let body = ListRequest {
            prefix: partition,
            limit: page.limit,
            offset: page.offset,
            sort_by: SortBy {
                column: "created_at",
                order: "asc",
            },
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let entries: Vec<ListEntry> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| into_object(partition, entry))
            .collect())
    }

    async fn delete_once(&self, paths: &[String]) -> Result<Vec<DeleteResult>, StoreError> {
        let url = self
            .client
            .endpoint(&format!("storage/v1/object/{}", self.bucket))
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let response = self
            .client
            .delete(url)
            .json(&DeleteRequest { prefixes: paths })
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let deleted: Vec<DeletedEntry> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        let deleted: HashSet<String> = deleted.into_iter().map(|entry| entry.name).collect();

        // The API only echoes objects it actually removed
        Ok(paths
            .iter()
            .map(|path| {
                let outcome = if deleted.contains(path) {
                    DeleteOutcome::Deleted
                } else {
                    DeleteOutcome::AlreadyGone
                };
                DeleteResult::new(path.clone(), outcome)
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStore for RestObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        partition: &str,
        page: PageRequest,
    ) -> Result<Vec<StoredObject>, StoreError> {
        debug!(
            bucket = %self.bucket,
            partition,
            limit = page.limit,
            offset = page.offset,
            "Listing objects"
        );
        retry_async(
            self.client.retry(),
            "list objects",
            || self.list_once(partition, page),
            StoreError::is_transient,
        )
        .await
    }

    async fn delete_objects(&self, paths: &[String]) -> Result<Vec<DeleteResult>, StoreError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        debug!(bucket = %self.bucket, count = paths.len(), "Deleting objects");
        retry_async(
            self.client.retry(),
            "delete objects",
            || self.delete_once(paths),
            StoreError::is_transient,
        )
        .await
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}storage/v1/object/public/{}/{path}",
            self.client.base_url(),
            self.bucket
        )
    }
}
