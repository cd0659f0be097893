//! Spreadsheet import: workbook bytes in, stored records out.
//!
//! The pipeline runs in a fixed order: [`parse_sheet`], [`normalize_rows`],
//! [`merge_manual_entry`], [`validate_batch`], [`persist`]. Validation is
//! deliberately narrow and only looks at the first row.

use crate::errors::ImportError;
use crate::models::{ManualEntry, NewRecord, RawRow, Upload, coerce_number};
use crate::storage::RecordStore;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
}

/// Runs the whole import for one upload.
pub async fn run_import(
    store: Arc<dyn RecordStore>,
    upload: Upload,
) -> Result<ImportSummary, ImportError> {
    let manual = upload.manual.filter(ManualEntry::is_complete);
    if upload.file.is_none() && manual.is_none() {
        return Err(ImportError::Rejected("No file uploaded".to_string()));
    }

    let rows = match upload.file {
        Some(bytes) => parse_sheet(&bytes)?,
        None => Vec::new(),
    };
    info!(rows = rows.len(), "parsed uploaded sheet");

    let rows = normalize_rows(rows);
    let rows = merge_manual_entry(rows, manual.as_ref());
    validate_batch(&rows)?;

    let imported = persist(store, rows).await?;
    info!(imported, "import complete");
    Ok(ImportSummary { imported })
}

/// Decodes the first sheet of a workbook into header-keyed rows.
pub fn parse_sheet(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| ImportError::Format(format!("Unreadable workbook: {err}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Format("Workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ImportError::Format(format!("Unreadable sheet {sheet_name}: {err}")))?;

    let mut lines = range.rows();
    let headers = match lines.next() {
        Some(header_cells) => header_names(header_cells),
        None => return Ok(Vec::new()),
    };

    let rows = lines
        .filter_map(|cells| {
            let mut row = RawRow::new();
            for (header, cell) in headers.iter().zip(cells) {
                if let Some(value) = cell_value(cell) {
                    row.insert(header.clone(), value);
                }
            }
            (!row.is_empty()).then_some(row)
        })
        .collect();

    Ok(rows)
}

fn header_names(cells: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let base = match cell.to_string() {
                name if name.is_empty() => "__EMPTY".to_string(),
                name => name,
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => Number::from_f64(dt.as_f64()).map(Value::Number),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(_) | Data::Empty => None,
    }
}

/// Best-effort `month/day/year` to `year-month-day` rewrite.
///
/// Anything that does not split into exactly three `/` parts is returned
/// unchanged. Non-strings yield an empty string.
pub fn normalize_date(raw: Option<&Value>) -> String {
    let Some(Value::String(raw)) = raw else {
        return String::new();
    };

    let parts: Vec<&str> = raw.split('/').collect();
    if let [month, day, year] = parts.as_slice() {
        let year = if year.chars().count() == 2 {
            format!("20{year}")
        } else {
            year.to_string()
        };
        return format!("{year}-{month:0>2}-{day:0>2}");
    }

    raw.clone()
}

pub fn normalize_rows(rows: Vec<RawRow>) -> Vec<RawRow> {
    rows.into_iter()
        .map(|mut row| {
            let date = normalize_date(row.get("date"));
            row.insert("date".to_string(), Value::String(date));
            row
        })
        .collect()
}

/// Appends the manual pair when both halves were filled in.
pub fn merge_manual_entry(mut rows: Vec<RawRow>, manual: Option<&ManualEntry>) -> Vec<RawRow> {
    if let Some(entry) = manual.filter(|entry| entry.is_complete()) {
        let mut row = RawRow::new();
        row.insert("date".to_string(), Value::String(entry.date.clone()));
        row.insert(
            "patient_data".to_string(),
            Value::String(entry.patient_data.clone()),
        );
        rows.push(row);
    }
    rows
}

/// Rejects an empty batch or one whose first row lacks a date or a count.
pub fn validate_batch(rows: &[RawRow]) -> Result<(), ImportError> {
    let Some(first) = rows.first() else {
        return Err(ImportError::Rejected(
            "Please select a date and enter the number of patients, or upload an Excel file."
                .to_string(),
        ));
    };

    if !is_truthy(first.get("date")) || !is_truthy(first.get("patient_data")) {
        return Err(ImportError::Rejected("Invalid data format".to_string()));
    }

    Ok(())
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Converts one sheet row into an insertable record.
pub fn to_new_record(row: &RawRow) -> Result<NewRecord, String> {
    let date = match row.get("date") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err("missing date".to_string()),
    };

    let count = match row.get("patient_data") {
        None | Some(Value::Null) => return Err("missing patient_data".to_string()),
        Some(value) => coerce_number(value),
    };
    if !count.is_finite() || count < 0.0 {
        return Err(format!(
            "patient_data {} is not a non-negative number",
            row.get("patient_data").map(Value::to_string).unwrap_or_default()
        ));
    }
    // i64::MAX rounds up to 2^63 as f64, which no longer fits the column.
    if count.round() >= i64::MAX as f64 {
        return Err(format!("patient_data {count} is out of range"));
    }

    let region = match row.get("region") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(NewRecord {
        date,
        patient_data: count.round() as i64,
        region,
    })
}

/// Inserts every row as its own task and waits for all of them.
///
/// There is no rollback: if any row fails the rows that made it stay in the
/// store and the whole batch is reported as failed.
pub async fn persist(store: Arc<dyn RecordStore>, rows: Vec<RawRow>) -> Result<usize, ImportError> {
    let mut tasks = JoinSet::new();
    for (index, row) in rows.into_iter().enumerate() {
        let store = Arc::clone(&store);
        tasks.spawn_blocking(move || {
            let record = to_new_record(&row).map_err(|reason| (index, reason))?;
            store.insert(&record).map_err(|err| (index, err.to_string()))
        });
    }

    let mut written = 0usize;
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(_)) => written += 1,
            Ok(Err((index, reason))) => {
                warn!("row {}: {reason}", index + 1);
                failures.push((index, format!("row {}: {reason}", index + 1)));
            }
            Err(err) => {
                error!("insert task failed: {err}");
                failures.push((usize::MAX, err.to_string()));
            }
        }
    }

    if failures.is_empty() {
        return Ok(written);
    }

    failures.sort_by_key(|(index, _)| *index);
    let failed = failures.len();
    let (_, reason) = failures.swap_remove(0);
    Err(ImportError::Persist {
        written,
        failed,
        reason,
    })
}
