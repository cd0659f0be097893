use crate::errors::StoreError;
use crate::models::{NewRecord, Record, StoredRecord};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistent home of imported records.
///
/// Inserts are independent; callers may issue them from several threads at
/// once and there is no batch transaction.
pub trait RecordStore: Send + Sync + 'static {
    fn insert(&self, record: &NewRecord) -> Result<i64, StoreError>;
    fn all(&self) -> Result<Vec<StoredRecord>, StoreError>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn setup_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            patient_data INTEGER NOT NULL,
            region TEXT,
            imported_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn insert(&self, record: &NewRecord) -> Result<i64, StoreError> {
        let imported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO data (date, patient_data, region, imported_at) VALUES (?1, ?2, ?3, ?4)",
            params![record.date, record.patient_data, record.region, imported_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, patient_data, region, imported_at FROM data ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let patient_data: i64 = row.get(2)?;
                Ok(StoredRecord {
                    id: row.get(0)?,
                    record: Record {
                        date: row.get(1)?,
                        patient_data: patient_data as f64,
                        region: row.get(3)?,
                    },
                    imported_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(date: &str, count: i64) -> NewRecord {
        NewRecord {
            date: date.to_string(),
            patient_data: count,
            region: None,
        }
    }

    #[test]
    fn insert_then_read_back_in_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&new_record("2021-01-02", 4)).unwrap();
        store
            .insert(&NewRecord {
                region: Some("North".into()),
                ..new_record("2021-01-01", 9)
            })
            .unwrap();

        let rows = store.all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record, Record::new("2021-01-02", 4.0));
        assert_eq!(rows[1].record, Record::new("2021-01-01", 9.0).with_region("North"));
        assert!(rows[0].id < rows[1].id);
        assert!(rows[0].imported_at.ends_with('Z'));
    }

    #[test]
    fn duplicate_dates_are_kept_as_separate_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&new_record("2021-01-01", 5)).unwrap();
        store.insert(&new_record("2021-01-01", 3)).unwrap();
        assert_eq!(store.all().unwrap().len(), 2);
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(&new_record("2021-03-04", 1)).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.all().unwrap().len(), 1);
    }
}
