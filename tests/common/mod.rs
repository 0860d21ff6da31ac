// ABOUTME: In-memory source and destination databases for engine tests
// ABOUTME: The destination simulates sequences, unique keys, foreign keys and transactions

#![allow(dead_code)]

use async_trait::async_trait;
use mysql_pg_table_migrator::convert::Value;
use mysql_pg_table_migrator::error::{MigrateError, Result};
use mysql_pg_table_migrator::migration::{DestinationDatabase, SourceColumn, SourceDatabase};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, (Vec<SourceColumn>, Vec<Vec<Value>>)>,
    pub closed: Arc<AtomicBool>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; `columns` are `(name, type)` pairs, rows line up with them
    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> Self {
        let columns = columns
            .iter()
            .map(|(n, t)| SourceColumn::new(*n, *t))
            .collect();
        self.tables.insert(name.to_string(), (columns, rows));
        self
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    async fn table_columns(&self, table: &str) -> Result<Vec<SourceColumn>> {
        Ok(self
            .tables
            .get(table)
            .map(|(columns, _)| columns.clone())
            .unwrap_or_default())
    }

    async fn fetch_rows(&self, table: &str, _columns: &[SourceColumn]) -> Result<Vec<Vec<Value>>> {
        self.tables
            .get(table)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| MigrateError::query("no such table", format!("reading rows from '{}'", table)))
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        self.tables
            .get(table)
            .map(|(_, rows)| rows.len() as i64)
            .ok_or_else(|| MigrateError::query("no such table", format!("counting '{}'", table)))
    }

    async fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, Default)]
pub struct DestTable {
    /// Stored rows, each including its generated `id`
    pub rows: Vec<BTreeMap<String, Value>>,
    /// Last value handed out by the key sequence
    pub sequence: i64,
    /// Columns with a UNIQUE constraint
    pub unique: Vec<String>,
    /// (column, referenced table) pairs checked against the referenced table's ids
    pub foreign_keys: Vec<(String, String)>,
}

impl DestTable {
    pub fn ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|r| match r.get("id") {
                Some(Value::Int(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct DestState {
    pub tables: BTreeMap<String, DestTable>,
    snapshot: Option<BTreeMap<String, DestTable>>,
    /// Every insert call as (table, columns, rows)
    pub inserts: Vec<(String, Vec<String>, Vec<Vec<Value>>)>,
    pub resyncs: Vec<String>,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closed: bool,
}

/// Destination whose state stays inspectable after the orchestrator consumes it
#[derive(Clone, Default)]
pub struct MemoryDestination {
    pub state: Arc<Mutex<DestState>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, unique: &[&str], foreign_keys: &[(&str, &str)]) -> Self {
        self.state.lock().unwrap().tables.insert(
            name.to_string(),
            DestTable {
                unique: unique.iter().map(|s| s.to_string()).collect(),
                foreign_keys: foreign_keys
                    .iter()
                    .map(|(c, t)| (c.to_string(), t.to_string()))
                    .collect(),
                ..DestTable::default()
            },
        );
        self
    }

    /// Insert a row outside the migration, with an explicit id, like a manual INSERT
    pub fn insert_manual(&self, table: &str, id: i64, values: &[(&str, Value)]) {
        let mut state = self.state.lock().unwrap();
        let t = state.tables.get_mut(table).expect("table exists");
        let mut row: BTreeMap<String, Value> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        row.insert("id".to_string(), Value::Int(id));
        t.rows.push(row);
    }

    /// A native insert that draws its id from the sequence
    pub fn insert_native(&self, table: &str, values: &[(&str, Value)]) -> i64 {
        let mut state = self.state.lock().unwrap();
        let t = state.tables.get_mut(table).expect("table exists");
        t.sequence += 1;
        let id = t.sequence;
        let mut row: BTreeMap<String, Value> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        row.insert("id".to_string(), Value::Int(id));
        t.rows.push(row);
        id
    }

    pub fn count(&self, table: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    pub fn table(&self, table: &str) -> DestTable {
        self.state.lock().unwrap().tables[table].clone()
    }
}

#[async_trait]
impl DestinationDatabase for MemoryDestination {
    async fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.begins += 1;
        state.snapshot = Some(state.tables.clone());
        Ok(())
    }

    async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state
            .inserts
            .push((table.to_string(), columns.to_vec(), rows.to_vec()));

        let existing_ids: BTreeMap<String, Vec<i64>> = state
            .tables
            .iter()
            .map(|(name, t)| (name.clone(), t.ids()))
            .collect();

        let dest = state.tables.get_mut(table).ok_or_else(|| {
            MigrateError::query(
                format!("relation \"{}\" does not exist", table),
                format!("inserting into '{}'", table),
            )
        })?;

        let mut inserted = 0;
        for values in rows {
            let mut row: BTreeMap<String, Value> = columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();

            for (column, referenced) in &dest.foreign_keys {
                if let Some(Value::Int(target)) = row.get(column) {
                    let present = existing_ids
                        .get(referenced)
                        .map_or(false, |ids| ids.contains(target));
                    if !present {
                        return Err(MigrateError::query(
                            format!(
                                "insert on table \"{}\" violates foreign key constraint on \"{}\"",
                                table, column
                            ),
                            format!("inserting into '{}'", table),
                        ));
                    }
                }
            }

            let duplicate = dest.unique.iter().any(|column| {
                let value = row.get(column);
                value.is_some()
                    && dest
                        .rows
                        .iter()
                        .any(|existing| existing.get(column) == value)
            });
            if duplicate {
                continue;
            }

            dest.sequence += 1;
            row.insert("id".to_string(), Value::Int(dest.sequence));
            if dest.ids().contains(&dest.sequence) {
                // Generated id collides with an existing key: skipped like ON CONFLICT
                continue;
            }
            dest.rows.push(row);
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn resync_sequence(&self, table: &str, _primary_key: &str) -> Result<Option<i64>> {
        let mut state = self.state.lock().unwrap();
        state.resyncs.push(table.to_string());
        let dest = state
            .tables
            .get_mut(table)
            .ok_or_else(|| MigrateError::query("no such table", "resync"))?;
        let max = dest.ids().into_iter().max();
        if let Some(max) = max {
            dest.sequence = max;
        }
        Ok(max)
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        state.snapshot = None;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.rollbacks += 1;
        if let Some(snapshot) = state.snapshot.take() {
            state.tables = snapshot;
        }
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)
            .map(|t| t.rows.len() as i64)
            .ok_or_else(|| MigrateError::query("no such table", format!("counting '{}'", table)))
    }

    async fn close(self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// A staff-rota shaped source: buildings <- departments <- staff
pub fn staff_rota_source() -> MemorySource {
    MemorySource::new()
        .with_table(
            "buildings",
            &[("id", "int"), ("name", "varchar")],
            vec![
                vec![Value::Int(1), Value::from("North Wing")],
                vec![Value::Int(2), Value::from("South Wing")],
            ],
        )
        .with_table(
            "departments",
            &[
                ("id", "int"),
                ("name", "varchar"),
                ("building_id", "int"),
                ("include_in_reports", "tinyint"),
            ],
            vec![
                vec![Value::Int(1), Value::from("Radiology"), Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::from("Pharmacy"), Value::Int(2), Value::Int(0)],
                vec![Value::Int(3), Value::from("Theatres"), Value::Int(1), Value::Null],
            ],
        )
        .with_table(
            "staff",
            &[
                ("id", "int"),
                ("name", "varchar"),
                ("department_id", "int"),
                ("is_active", "tinyint"),
                ("retry_count", "int"),
                ("status", "enum"),
            ],
            vec![
                vec![
                    Value::Int(1),
                    Value::from("Alex"),
                    Value::Int(1),
                    Value::Int(1),
                    Value::Int(1),
                    Value::from("active"),
                ],
                vec![
                    Value::Int(2),
                    Value::from("Sam"),
                    Value::Int(3),
                    Value::Int(0),
                    Value::Int(0),
                    Value::from("inactive"),
                ],
            ],
        )
}

/// Destination matching [`staff_rota_source`], with FK and natural-key constraints
pub fn staff_rota_destination() -> MemoryDestination {
    MemoryDestination::new()
        .with_table("buildings", &["name"], &[])
        .with_table("departments", &["name"], &[("building_id", "buildings")])
        .with_table("staff", &["name"], &[("department_id", "departments")])
}
