//! Table-scoped vault record operations: bulk insert, per-record update,
//! paginated read.

use std::sync::Arc;

use crate::auth::AuthHeaderProvider;
use crate::error::VaultError;
use crate::record::{InsertBody, ReadOptions, Record, RecordsResponse, UpdateBody, MAX_RECORDS};
use crate::transport::{Method, VaultRequest, VaultTransport};

/// Result of updating one record.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub skyflow_id: String,
    pub result: Result<(), VaultError>,
}

/// Record operations against one vault.
///
/// Cheap to clone; clones share the transport (and therefore its rate
/// limiter) and the auth provider.
#[derive(Clone)]
pub struct VaultClient {
    transport: Arc<dyn VaultTransport>,
    auth: Arc<AuthHeaderProvider>,
    api_base: String,
}

impl VaultClient {
    /// `api_base` is `{vault_url}/v1/vaults/{vault_id}`.
    pub fn new(
        transport: Arc<dyn VaultTransport>,
        auth: Arc<AuthHeaderProvider>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            auth,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.api_base, table)
    }

    pub fn record_url(&self, table: &str, id: &str) -> String {
        format!("{}/{}/{}", self.api_base, table, id)
    }

    /// POST up to [`MAX_RECORDS`] records; returns the vault's echoed
    /// records carrying their new identifiers.
    ///
    /// The batch succeeds or fails as a whole. Server detail of a failure
    /// is logged here and returned in the error.
    pub async fn bulk_insert(
        &self,
        table: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, VaultError> {
        if records.len() > MAX_RECORDS {
            return Err(VaultError::BatchTooLarge {
                len: records.len(),
                max: MAX_RECORDS,
            });
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::to_value(InsertBody::new(records))?;
        let req = VaultRequest::new(Method::Post, self.table_url(table))
            .headers(self.auth.headers().await?)
            .body(body);

        let resp = self.transport.send(req).await.map_err(|e| {
            tracing::error!(
                transport = self.transport.name(),
                table,
                count = records.len(),
                error = %e,
                "bulk insert failed"
            );
            e
        })?;

        // A 2xx means the vault committed the batch, even if the echo is unreadable.
        match resp.json::<RecordsResponse>() {
            Ok(echo) => Ok(echo.records),
            Err(e) => {
                tracing::warn!(
                    transport = self.transport.name(),
                    table,
                    count = records.len(),
                    error = %e,
                    "batch inserted but response body unreadable"
                );
                Ok(Vec::new())
            }
        }
    }

    /// PUT each record to `table/{id}`, one call at a time.
    ///
    /// Records must already be stripped of their identifier and consumed
    /// source column; the identifier travels separately in `updates`.
    /// A failed record is logged and the loop moves on.
    pub async fn bulk_update(
        &self,
        table: &str,
        updates: Vec<(String, Record)>,
    ) -> Result<Vec<UpdateOutcome>, VaultError> {
        if updates.len() > MAX_RECORDS {
            return Err(VaultError::BatchTooLarge {
                len: updates.len(),
                max: MAX_RECORDS,
            });
        }

        let mut outcomes = Vec::with_capacity(updates.len());
        for (skyflow_id, record) in updates {
            let result = match self.update_one(table, &skyflow_id, &record).await {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        transport = self.transport.name(),
                        table,
                        skyflow_id = %skyflow_id,
                        error = %e,
                        "record update failed"
                    );
                    Err(e)
                }
                Ok(()) => Ok(()),
            };
            outcomes.push(UpdateOutcome { skyflow_id, result });
        }
        Ok(outcomes)
    }

    async fn update_one(&self, table: &str, id: &str, record: &Record) -> Result<(), VaultError> {
        let body = serde_json::to_value(UpdateBody::new(record))?;
        let req = VaultRequest::new(Method::Put, self.record_url(table, id))
            .headers(self.auth.headers().await?)
            .body(body);
        self.transport.send(req).await.map(|_| ())
    }

    /// GET one page of `table`.
    ///
    /// A successful empty page means end of data; a failed request is an
    /// error, never an empty page.
    pub async fn read_page(
        &self,
        table: &str,
        opts: &ReadOptions,
    ) -> Result<Vec<Record>, VaultError> {
        let req = VaultRequest::new(Method::Get, self.table_url(table))
            .headers(self.auth.headers().await?)
            .query(opts.query());

        let resp = self.transport.send(req).await.map_err(|e| {
            tracing::error!(
                transport = self.transport.name(),
                table,
                offset = opts.offset,
                error = %e,
                "page read failed"
            );
            e
        })?;
        Ok(resp.json::<RecordsResponse>()?.records)
    }
}
