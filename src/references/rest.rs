//! Reference source backed by the hosted database REST API.
//!
//! Issues `GET {base}/rest/v1/{table}?select={column}&{column}=not.is.null`
//! ordered by the column, in `limit`/`offset` pages until an empty page is
//! returned. Servers cap rows per response (`db-max-rows`), so a page
//! shorter than `limit` does not mean the table is exhausted.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::backend::ReferenceSource;
use super::types::{ReferenceError, ReferenceRow, validate_identifier};
use crate::constants::MAX_PAGES_PER_QUERY;
use crate::hosted::{HostedClient, ResponseFailure, check_status};
use crate::reliability::retry_async;

impl From<ResponseFailure> for ReferenceError {
    fn from(failure: ResponseFailure) -> Self {
        match failure {
            ResponseFailure::Unauthorized(msg) => Self::Unauthorized(msg),
            ResponseFailure::Status { status, body } => Self::Status { status, body },
        }
    }
}

/// Extracts `column` from a JSON row; non-string values become `None`.
fn row_value(mut row: Map<String, Value>, column: &str) -> ReferenceRow {
    match row.remove(column) {
        Some(Value::String(value)) => ReferenceRow { value: Some(value) },
        _ => ReferenceRow::null(),
    }
}

/// Reference source for the hosted database REST API.
#[derive(Debug, Clone)]
pub struct RestReferenceSource {
    client: HostedClient,
    page_size: u32,
}

impl RestReferenceSource {
    pub fn new(client: HostedClient, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    async fn fetch_page(
        &self,
        table: &str,
        column: &str,
        offset: u32,
    ) -> Result<Vec<ReferenceRow>, ReferenceError> {
        let mut url = self
            .client
            .endpoint(&format!("rest/v1/{table}"))
            .map_err(|e| ReferenceError::InvalidResponse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("select", column)
            .append_pair(column, "not.is.null")
            .append_pair("order", &format!("{column}.asc"))
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReferenceError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let rows: Vec<Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| ReferenceError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row_value(row, column)).collect())
    }
}

#[async_trait]
impl ReferenceSource for RestReferenceSource {
    async fn select_non_null(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<ReferenceRow>, ReferenceError> {
        validate_identifier(table)?;
        validate_identifier(column)?;

        let mut rows = Vec::new();
        let mut offset = 0u32;
        for _ in 0..MAX_PAGES_PER_QUERY {
            let page = retry_async(
                self.client.retry(),
                "select reference rows",
                || self.fetch_page(table, column, offset),
                ReferenceError::is_transient,
            )
            .await?;

            if page.is_empty() {
                debug!(table, column, rows = rows.len(), "Fetched reference rows");
                return Ok(rows);
            }

            // Advance by what was returned, not by what was asked for
            let received = u32::try_from(page.len()).unwrap_or(u32::MAX);
            rows.extend(page);
            match offset.checked_add(received) {
                Some(next) => offset = next,
                None => break,
            }
        }

        Err(ReferenceError::InvalidResponse(format!(
            "{table}.{column} did not stop paging"
        )))
    }
}
