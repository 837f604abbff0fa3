use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;

use crate::record::{PredictionRecord, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Correct,
    Wrong,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == Status::Pending,
            StatusFilter::Correct => status == Status::Correct,
            StatusFilter::Wrong => status == Status::Wrong,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "correct" => Ok(StatusFilter::Correct),
            "wrong" => Ok(StatusFilter::Wrong),
            other => Err(anyhow!("unknown filter '{other}' (all|pending|correct|wrong)")),
        }
    }
}

pub fn filter_by_status(records: &[PredictionRecord], filter: StatusFilter) -> Vec<&PredictionRecord> {
    records.iter().filter(|r| filter.matches(r.status)).collect()
}

/// Bucket key. Ordering puts later dates first and `Undated` after every date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateKey {
    Dated(NaiveDate),
    Undated,
}

impl DateKey {
    fn of(record: &PredictionRecord) -> Self {
        record.scheduled_date.map_or(DateKey::Undated, DateKey::Dated)
    }

    pub fn contains(&self, record: &PredictionRecord) -> bool {
        DateKey::of(record) == *self
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (DateKey::Dated(a), DateKey::Dated(b)) => b.cmp(a),
            (DateKey::Dated(_), DateKey::Undated) => Ordering::Less,
            (DateKey::Undated, DateKey::Dated(_)) => Ordering::Greater,
            (DateKey::Undated, DateKey::Undated) => Ordering::Equal,
        }
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateKey::Dated(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateKey::Undated => f.write_str("undated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DateBucket<'a> {
    pub key: DateKey,
    pub records: Vec<&'a PredictionRecord>,
}

/// Partition by scheduled date, newest date first. Records inside a bucket
/// keep their ledger order.
pub fn group_by_date(records: &[PredictionRecord]) -> Vec<DateBucket<'_>> {
    let mut buckets: BTreeMap<DateKey, Vec<&PredictionRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(DateKey::of(record)).or_default().push(record);
    }
    buckets
        .into_iter()
        .map(|(key, records)| DateBucket { key, records })
        .collect()
}
