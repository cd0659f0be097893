use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One row decoded from a sheet, keyed by column header.
pub type RawRow = serde_json::Map<String, Value>;

/// A case-count record as the dashboard sees it.
///
/// `patient_data` is kept as `f64` so that loosely typed input coerces to
/// `NaN` instead of failing; see [`coerce_number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: String,
    #[serde(
        serialize_with = "serialize_count",
        deserialize_with = "deserialize_count"
    )]
    pub patient_data: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Record {
    pub fn new(date: impl Into<String>, patient_data: f64) -> Self {
        Self {
            date: date.into(),
            patient_data,
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// A validated row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub date: String,
    pub patient_data: i64,
    pub region: Option<String>,
}

/// A row as it comes back from the `data` table.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: Record,
    pub imported_at: String,
}

/// Manual `(date, patient_data)` pair entered next to an upload.
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub date: String,
    pub patient_data: String,
}

impl ManualEntry {
    pub fn is_complete(&self) -> bool {
        !self.date.is_empty() && !self.patient_data.is_empty()
    }
}

/// Everything a client sent to the import endpoint.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file: Option<Vec<u8>>,
    pub manual: Option<ManualEntry>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub imported: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Loose numeric conversion used for every untyped count.
///
/// Numbers pass through, strings are trimmed and parsed (empty means 0),
/// `null` is 0, booleans are 1 or 0, anything else is `NaN`.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Integral counts go out as JSON integers; `NaN` becomes `null`.
pub fn serialize_count<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_number_follows_loose_rules() {
        assert_eq!(coerce_number(&json!(12)), 12.0);
        assert_eq!(coerce_number(&json!(" 7 ")), 7.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert!(coerce_number(&json!("abc")).is_nan());
        assert!(coerce_number(&json!([1])).is_nan());
    }

    #[test]
    fn record_deserializes_non_numeric_count_as_nan() {
        let record: Record =
            serde_json::from_value(json!({ "date": "2021-01-01", "patient_data": "many" }))
                .unwrap();
        assert!(record.patient_data.is_nan());
        assert_eq!(record.region, None);
    }

    #[test]
    fn record_serializes_integral_count_as_integer() {
        let record = Record::new("2021-01-01", 8.0).with_region("North");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({ "date": "2021-01-01", "patient_data": 8, "region": "North" })
        );

        let nan = serde_json::to_value(Record::new("2021-01-02", f64::NAN)).unwrap();
        assert_eq!(nan["patient_data"], Value::Null);
    }

    #[test]
    fn manual_entry_needs_both_fields() {
        let partial = ManualEntry {
            date: "2021-01-01".into(),
            patient_data: String::new(),
        };
        assert!(!partial.is_complete());
        let full = ManualEntry {
            date: "2021-01-01".into(),
            patient_data: "4".into(),
        };
        assert!(full.is_complete());
    }
}
