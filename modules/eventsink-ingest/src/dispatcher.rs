//! The single entry point for submissions.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use eventsink_common::{AppConfig, Header, TableCatalog};
use eventsink_store::{StoreError, TableRef, TableStore};

use crate::clock::{Clock, SystemClock};
use crate::deadline::bounded;
use crate::error::{IngestError, Result};
use crate::locks::TableLocks;
use crate::payload::{parse_submission, IncomingEvent};
use crate::projector::project;
use crate::retention::{RetentionPolicy, RetentionTrimmer};
use crate::schema::reconcile;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub retention: RetentionPolicy,
    pub store_timeout: Duration,
    pub max_batch: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            store_timeout: Duration::from_secs(10),
            max_batch: 500,
        }
    }
}

impl From<&AppConfig> for IngestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            retention: RetentionPolicy::new(config.retention_cap, config.retention_margin),
            store_timeout: config.store_timeout,
            max_batch: config.max_batch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub processed: usize,
}

/// The wire shape every submission resolves to, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<SubmitReport>> for SubmitOutcome {
    fn from(result: &Result<SubmitReport>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                processed: Some(report.processed),
                error: None,
            },
            Err(e) => Self {
                success: false,
                processed: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Tables that did not exist and were created with their catalog header.
    pub created: Vec<String>,
    /// Tables that existed with no columns and were given their catalog header.
    pub filled: Vec<String>,
}

pub struct IngestDispatcher {
    store: Arc<dyn TableStore>,
    catalog: TableCatalog,
    locks: TableLocks,
    clock: Arc<dyn Clock>,
    trimmer: RetentionTrimmer,
    store_timeout: Duration,
    max_batch: usize,
}

impl IngestDispatcher {
    pub fn new(store: Arc<dyn TableStore>, catalog: TableCatalog, config: IngestConfig) -> Self {
        Self {
            store,
            catalog,
            locks: TableLocks::new(),
            clock: Arc::new(SystemClock),
            trimmer: RetentionTrimmer::new(config.retention, config.store_timeout),
            store_timeout: config.store_timeout,
            max_batch: config.max_batch,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Ingest one entry or a batch. Entries run strictly in order; a failure
    /// stops the submission but leaves earlier entries committed.
    pub async fn submit(&self, payload: &Value) -> Result<SubmitReport> {
        let submission_id = Uuid::new_v4();
        let events = parse_submission(payload, self.max_batch).inspect_err(|e| {
            warn!(%submission_id, error = %e, "Submission rejected");
        })?;
        let total = events.len();

        for (entry, mut event) in events.into_iter().enumerate() {
            event.stamp_timestamp(self.clock.now());
            if let Err(source) = self.ingest_entry(&event).await {
                warn!(
                    %submission_id,
                    entry,
                    total,
                    table = %event.domain,
                    error = %source,
                    "Submission failed mid-batch; earlier entries stay committed"
                );
                return Err(IngestError::Store {
                    entry,
                    total,
                    source,
                });
            }
        }

        info!(%submission_id, processed = total, "Submission ingested");
        Ok(SubmitReport { processed: total })
    }

    /// [`submit`](Self::submit), normalized to the wire shape.
    pub async fn submit_outcome(&self, payload: &Value) -> SubmitOutcome {
        SubmitOutcome::from(&self.submit(payload).await)
    }

    async fn ingest_entry(&self, event: &IncomingEvent) -> std::result::Result<(), StoreError> {
        let _guard = self.locks.acquire(&event.domain).await;

        let table = self.resolve_table(&event.domain).await?;

        let current = self.call("header", self.store.header(&table)).await?;
        let current = Header::from_columns(current).map_err(|e| StoreError::InvalidHeader {
            table: event.domain.clone(),
            reason: e.to_string(),
        })?;

        let plan = reconcile(&current, event.fields.keys());
        for column in &plan.added {
            self.call(
                "set_header_cell",
                self.store.set_header_cell(&table, column.index, &column.name),
            )
            .await?;
        }
        if plan.is_widened() {
            let added: Vec<&str> = plan.added.iter().map(|c| c.name.as_str()).collect();
            debug!(
                table = %event.domain,
                ?added,
                width = plan.header.len(),
                "Header widened"
            );
        }

        let row = project(&plan.header, &event.fields);
        self.call("append_row", self.store.append_row(&table, &row)).await?;

        self.trimmer.enforce(self.store.as_ref(), &table).await;
        Ok(())
    }

    /// Find the table, creating it on first sight. Catalog domains start with
    /// their canonical header; others start empty and take the event's keys.
    async fn resolve_table(&self, domain: &str) -> std::result::Result<TableRef, StoreError> {
        if let Some(table) = self.call("get_table", self.store.get_table(domain)).await? {
            return Ok(table);
        }

        let header = self.catalog.schema_for(domain).unwrap_or_default();
        match self.call("create_table", self.store.create_table(domain, header)).await {
            Ok(table) => {
                info!(
                    table = domain,
                    columns = header.len(),
                    from_catalog = self.catalog.is_known(domain),
                    "Created table"
                );
                Ok(table)
            }
            // Someone else created it between the lookup and the insert.
            Err(StoreError::TableExists(_)) => self
                .call("get_table", self.store.get_table(domain))
                .await?
                .ok_or_else(|| StoreError::TableNotFound(domain.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Create every catalog table that is missing, and give its catalog header
    /// to any catalog table that exists with no columns.
    pub async fn provision_catalog(&self) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for (domain, columns) in self.catalog.entries() {
            let _guard = self.locks.acquire(domain).await;
            let failed = |source| IngestError::Provision {
                table: domain.to_string(),
                source,
            };

            match self
                .call("get_table", self.store.get_table(domain))
                .await
                .map_err(failed)?
            {
                None => {
                    self.call("create_table", self.store.create_table(domain, columns))
                        .await
                        .map_err(failed)?;
                    report.created.push(domain.to_string());
                }
                Some(table) => {
                    let header = self
                        .call("header", self.store.header(&table))
                        .await
                        .map_err(failed)?;
                    if !header.is_empty() {
                        continue;
                    }
                    for (index, name) in columns.iter().enumerate() {
                        self.call(
                            "set_header_cell",
                            self.store.set_header_cell(&table, index, name),
                        )
                        .await
                        .map_err(failed)?;
                    }
                    report.filled.push(domain.to_string());
                }
            }
        }

        info!(
            created = report.created.len(),
            filled = report.filled.len(),
            "Catalog provisioned"
        );
        Ok(report)
    }

    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl std::future::Future<Output = std::result::Result<T, StoreError>>,
    ) -> std::result::Result<T, StoreError> {
        bounded(op, self.store_timeout, fut).await
    }
}
