use crate::models::{Record, serialize_count};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// How many entries the dashboard keeps after sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TopN {
    One,
    #[default]
    Ten,
    Fifty,
    Hundred,
    FiveHundred,
    All,
}

impl TopN {
    pub fn limit(self) -> Option<usize> {
        match self {
            TopN::One => Some(1),
            TopN::Ten => Some(10),
            TopN::Fifty => Some(50),
            TopN::Hundred => Some(100),
            TopN::FiveHundred => Some(500),
            TopN::All => None,
        }
    }
}

impl FromStr for TopN {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "1" => Ok(TopN::One),
            "10" => Ok(TopN::Ten),
            "50" => Ok(TopN::Fifty),
            "100" => Ok(TopN::Hundred),
            "500" => Ok(TopN::FiveHundred),
            "All" => Ok(TopN::All),
            other => Err(format!(
                "topN must be one of 1, 10, 50, 100, 500 or All (got {other:?})"
            )),
        }
    }
}

impl TryFrom<String> for TopN {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit() {
            Some(limit) => write!(f, "{limit}"),
            None => f.write_str("All"),
        }
    }
}

impl From<TopN> for String {
    fn from(value: TopN) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardQuery {
    pub filter_date: String,
    pub top_n: TopN,
    pub search_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub date: String,
    #[serde(serialize_with = "serialize_count")]
    pub patient_data: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPoint {
    pub label: String,
    #[serde(serialize_with = "serialize_count")]
    pub patient_data: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffPoint {
    pub date: String,
    #[serde(serialize_with = "serialize_count")]
    pub patient_data: f64,
    #[serde(serialize_with = "serialize_count")]
    pub previous_patient_data: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub cumulative: Vec<CumulativePoint>,
    pub region: Vec<RegionPoint>,
    pub diff: Vec<DiffPoint>,
    pub unique_dates: Vec<String>,
}

/// Sums counts per date, keeping the first-seen region and first-seen order.
pub fn group_by_date(records: &[Record]) -> Vec<Record> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<Record> = Vec::new();

    for record in records {
        match positions.get(record.date.as_str()) {
            Some(&index) => grouped[index].patient_data += record.patient_data,
            None => {
                positions.insert(record.date.as_str(), grouped.len());
                grouped.push(record.clone());
            }
        }
    }

    grouped
}

/// Group, search, date filter, sort by count descending, then top-N.
pub fn filter_records(records: &[Record], query: &DashboardQuery) -> Vec<Record> {
    let mut filtered: Vec<Record> = group_by_date(records)
        .into_iter()
        .filter(|row| row.date.contains(query.search_query.as_str()))
        .filter(|row| query.filter_date.is_empty() || row.date == query.filter_date)
        .collect();

    filtered.sort_by(|a, b| b.patient_data.total_cmp(&a.patient_data));

    if let Some(limit) = query.top_n.limit() {
        filtered.truncate(limit);
    }

    filtered
}

pub fn region_label(record: &Record) -> &str {
    match record.region.as_deref() {
        None | Some("Unknown") => &record.date,
        Some(region) => region,
    }
}

pub fn build_view(records: &[Record], query: &DashboardQuery) -> DashboardView {
    let filtered = filter_records(records, query);

    let cumulative = filtered
        .iter()
        .map(|row| CumulativePoint {
            date: row.date.clone(),
            patient_data: row.patient_data,
        })
        .collect();

    let region = filtered
        .iter()
        .map(|row| RegionPoint {
            label: region_label(row).to_string(),
            patient_data: row.patient_data,
        })
        .collect();

    // The predecessor is positional in count order, not the previous day.
    let diff = filtered
        .iter()
        .enumerate()
        .map(|(index, row)| DiffPoint {
            date: row.date.clone(),
            patient_data: row.patient_data,
            previous_patient_data: match index {
                0 => 0.0,
                _ => filtered[index - 1].patient_data,
            },
        })
        .collect();

    let unique_dates = filtered
        .iter()
        .map(|row| row.date.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    DashboardView {
        cumulative,
        region,
        diff,
        unique_dates,
    }
}
