//! Batch drivers: import from a dataset, copy a column within a table, and
//! copy columns into another table.
//!
//! Each driver is a serial loop; the next request is issued only after the
//! previous one completes. Reruns are not deduplicated: importing twice
//! inserts twice.

use crate::cursor::PageCursor;
use crate::error::VaultError;
use crate::ops::VaultClient;
use crate::record::{ReadOptions, Record, MAX_RECORDS, SKYFLOW_ID};

/// What a failure applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureScope {
    /// A whole insert batch; `start` is the position of its first record
    /// in the driver's input (or in the source table).
    Batch { start: usize, len: usize },
    /// A single record update.
    Record { skyflow_id: String },
}

#[derive(Debug)]
pub struct RecordFailure {
    pub scope: FailureScope,
    pub error: VaultError,
}

/// Summary of one driver run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Insert or update calls issued.
    pub requests: usize,
    /// Non-empty pages read from the source table.
    pub pages_read: usize,
    pub records_read: usize,
    pub records_written: usize,
    /// Records left untouched (no identifier, or no value to copy).
    pub records_skipped: usize,
    pub failures: Vec<RecordFailure>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Walks a table page by page until the vault returns an empty page.
pub struct Pager<'a> {
    client: &'a VaultClient,
    table: &'a str,
    fields: Vec<String>,
    cursor: PageCursor,
    done: bool,
}

impl<'a> Pager<'a> {
    pub fn new(client: &'a VaultClient, table: &'a str, fields: Vec<String>) -> Self {
        Self {
            client,
            table,
            fields,
            cursor: PageCursor::default(),
            done: false,
        }
    }

    /// Next non-empty page, or `None` once a page comes back empty.
    /// A failed read is returned as an error.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>, VaultError> {
        if self.done {
            return Ok(None);
        }
        let opts = ReadOptions::new(self.cursor.limit, self.cursor.offset, self.fields.clone());
        let page = self.client.read_page(self.table, &opts).await?;
        if page.is_empty() {
            tracing::debug!(table = self.table, offset = self.cursor.offset, "empty page, done");
            self.done = true;
            return Ok(None);
        }
        self.cursor.advance();
        Ok(Some(page))
    }
}

/// Insert `records` into `table` in chunks of [`MAX_RECORDS`].
///
/// A failed chunk is logged and recorded; the driver moves on to the next
/// chunk. Fatal errors (auth, config) stop the run.
pub async fn import_records(
    client: &VaultClient,
    table: &str,
    records: &[Record],
) -> Result<MigrationReport, VaultError> {
    let mut report = MigrationReport {
        records_read: records.len(),
        ..Default::default()
    };

    for (i, chunk) in records.chunks(MAX_RECORDS).enumerate() {
        let start = i * MAX_RECORDS;
        tracing::info!(
            table,
            "Inserting records {} to {}",
            start + 1,
            start + chunk.len()
        );
        insert_chunk(client, table, chunk, start, &mut report).await?;
    }

    tracing::info!(
        table,
        written = report.records_written,
        failed_batches = report.failures.len(),
        "import complete"
    );
    Ok(report)
}

/// Copy `from_column` into `to_column` for every record of `table`.
///
/// Each update body carries `to_column` and omits `from_column`, the
/// identifier and tokens. Failed updates are recorded per record.
pub async fn copy_column(
    client: &VaultClient,
    table: &str,
    from_column: &str,
    to_column: &str,
) -> Result<MigrationReport, VaultError> {
    if from_column == to_column {
        return Err(VaultError::Config(format!(
            "source and destination column are both '{from_column}'"
        )));
    }

    let mut report = MigrationReport::default();
    let mut pager = Pager::new(
        client,
        table,
        vec![SKYFLOW_ID.to_string(), from_column.to_string()],
    );

    while let Some(page) = pager.next_page().await? {
        report.pages_read += 1;
        report.records_read += page.len();

        let mut updates = Vec::with_capacity(page.len());
        for mut record in page {
            let Some(id) = record.id().map(str::to_string) else {
                tracing::warn!(table, "record without {SKYFLOW_ID}, skipping");
                report.records_skipped += 1;
                continue;
            };
            if !record.copy_field(from_column, to_column) {
                tracing::debug!(table, skyflow_id = %id, from_column, "no value to copy");
                report.records_skipped += 1;
                continue;
            }
            tracing::info!(table, skyflow_id = %id, "Copying column data");
            updates.push((id, record.into_update_payload(from_column)));
        }

        report.requests += updates.len();
        for outcome in client.bulk_update(table, updates).await? {
            match outcome.result {
                Ok(()) => report.records_written += 1,
                Err(error) => report.failures.push(RecordFailure {
                    scope: FailureScope::Record {
                        skyflow_id: outcome.skyflow_id,
                    },
                    error,
                }),
            }
        }
    }

    tracing::info!(
        table,
        from_column,
        to_column,
        updated = report.records_written,
        failed = report.failures.len(),
        "column copy complete"
    );
    Ok(report)
}

/// Copy `columns` of every record in `from_table` into new records of
/// `to_table`. Values are inserted unmodified.
pub async fn copy_table(
    client: &VaultClient,
    from_table: &str,
    columns: &[String],
    to_table: &str,
) -> Result<MigrationReport, VaultError> {
    let mut report = MigrationReport::default();
    let mut pager = Pager::new(client, from_table, columns.to_vec());

    while let Some(page) = pager.next_page().await? {
        let start = report.records_read;
        report.pages_read += 1;
        report.records_read += page.len();

        let rows: Vec<Record> = page
            .into_iter()
            .map(|mut r| {
                r.retain_fields(columns);
                r.into_insert_payload()
            })
            .collect();

        tracing::info!(
            from_table,
            to_table,
            "Copying records {} to {}",
            start + 1,
            start + rows.len()
        );
        insert_chunk(client, to_table, &rows, start, &mut report).await?;
    }

    tracing::info!(
        from_table,
        to_table,
        written = report.records_written,
        failed_batches = report.failures.len(),
        "table copy complete"
    );
    Ok(report)
}

async fn insert_chunk(
    client: &VaultClient,
    table: &str,
    chunk: &[Record],
    start: usize,
    report: &mut MigrationReport,
) -> Result<(), VaultError> {
    report.requests += 1;
    match client.bulk_insert(table, chunk).await {
        Ok(inserted) => {
            tracing::debug!(table, inserted = inserted.len(), "batch inserted");
            report.records_written += chunk.len();
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(error) => {
            report.failures.push(RecordFailure {
                scope: FailureScope::Batch {
                    start,
                    len: chunk.len(),
                },
                error,
            });
            Ok(())
        }
    }
}
