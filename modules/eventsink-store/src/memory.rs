//! In-process table store. Used when no database is configured, and by tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use eventsink_common::{Cell, Row};

use crate::error::{Result, StoreError};
use crate::store::{check_header_cell, check_initial_header, check_row_arity, TableRef, TableStore};

#[derive(Debug, Default)]
struct MemTable {
    header: Vec<String>,
    rows: VecDeque<Row>,
}

/// Point-in-time copy of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl TableSnapshot {
    /// The cell of `row_idx` under `column`. Rows appended before the column
    /// existed read as [`Cell::Empty`] there.
    pub fn cell(&self, row_idx: usize, column: &str) -> Option<&Cell> {
        let row = self.rows.get(row_idx)?;
        let col = self.header.iter().position(|c| c == column)?;
        Some(row.get(col).unwrap_or(&EMPTY_CELL))
    }

    /// Zip a row against the current header, skipping empty cells.
    pub fn record(&self, row_idx: usize) -> Option<Vec<(&str, &Cell)>> {
        let row = self.rows.get(row_idx)?;
        Some(
            self.header
                .iter()
                .zip(row.iter())
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(col, cell)| (col.as_str(), cell))
                .collect(),
        )
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self, name: &str) -> Option<TableSnapshot> {
        let tables = self.tables.read().await;
        tables.get(name).map(|t| TableSnapshot {
            header: t.header.clone(),
            rows: t.rows.iter().cloned().collect(),
        })
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn get_table(&self, name: &str) -> Result<Option<TableRef>> {
        let tables = self.tables.read().await;
        Ok(tables.contains_key(name).then(|| TableRef::new(name)))
    }

    async fn create_table(&self, name: &str, header: &[String]) -> Result<TableRef> {
        check_initial_header(name, header)?;
        let mut tables = self.tables.write().await;
        if tables.contains_key(name) {
            return Err(StoreError::TableExists(name.to_string()));
        }
        tables.insert(
            name.to_string(),
            MemTable {
                header: header.to_vec(),
                rows: VecDeque::new(),
            },
        );
        Ok(TableRef::new(name))
    }

    async fn header(&self, table: &TableRef) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let t = lookup(&tables, table)?;
        Ok(t.header.clone())
    }

    async fn set_header_cell(&self, table: &TableRef, index: usize, name: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let t = lookup_mut(&mut tables, table)?;
        check_header_cell(table.name(), &t.header, index, name)?;
        if index == t.header.len() {
            t.header.push(name.to_string());
        } else {
            t.header[index] = name.to_string();
        }
        Ok(())
    }

    async fn append_row(&self, table: &TableRef, row: &Row) -> Result<()> {
        let mut tables = self.tables.write().await;
        let t = lookup_mut(&mut tables, table)?;
        check_row_arity(table.name(), t.header.len(), row)?;
        t.rows.push_back(row.clone());
        Ok(())
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(lookup(&tables, table)?.rows.len() as u64)
    }

    async fn delete_oldest_rows(&self, table: &TableRef, count: u64) -> Result<()> {
        let mut tables = self.tables.write().await;
        let t = lookup_mut(&mut tables, table)?;
        let n = usize::try_from(count).unwrap_or(usize::MAX).min(t.rows.len());
        t.rows.drain(..n);
        Ok(())
    }
}

fn lookup<'a>(tables: &'a HashMap<String, MemTable>, table: &TableRef) -> Result<&'a MemTable> {
    tables
        .get(table.name())
        .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<String, MemTable>,
    table: &TableRef,
) -> Result<&'a mut MemTable> {
    tables
        .get_mut(table.name())
        .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))
}
