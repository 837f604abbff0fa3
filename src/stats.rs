use chrono::NaiveDate;

use crate::record::{PredictionRecord, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub pending: usize,
}

impl Counts {
    pub fn resolved(&self) -> usize {
        self.correct + self.wrong
    }

    /// `None` when nothing is resolved.
    pub fn success_rate(&self) -> Option<u8> {
        percent_half_up(self.correct, self.resolved())
    }
}

/// Display bands used for the success-rate badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBand {
    Strong,
    Fair,
    Weak,
}

impl RateBand {
    pub fn from_rate(rate: u8) -> Self {
        if rate >= 60 {
            RateBand::Strong
        } else if rate >= 40 {
            RateBand::Fair
        } else {
            RateBand::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RateBand::Strong => "strong",
            RateBand::Fair => "fair",
            RateBand::Weak => "weak",
        }
    }
}

/// Breakdown of the picks scheduled on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: usize,
    pub checked: usize,
    pub correct: usize,
    pub wrong: usize,
    pub unchecked: usize,
    pub rate: Option<u8>,
}

pub fn counts(records: &[PredictionRecord]) -> Counts {
    counts_iter(records.iter())
}

fn counts_iter<'a>(records: impl Iterator<Item = &'a PredictionRecord>) -> Counts {
    let mut out = Counts::default();
    for record in records {
        out.total += 1;
        match record.status {
            Status::Pending => out.pending += 1,
            Status::Correct => out.correct += 1,
            Status::Wrong => out.wrong += 1,
        }
    }
    out
}

pub fn success_rate(records: &[PredictionRecord]) -> Option<u8> {
    counts(records).success_rate()
}

/// Outcomes of the `n` most recent resolved records, most recent first.
///
/// The ledger keeps records most-recent-first, so this walks from the front
/// of the slice and skips pending entries.
pub fn streak(records: &[PredictionRecord], n: usize) -> Vec<Status> {
    records
        .iter()
        .map(|r| r.status)
        .filter(|s| s.is_resolved())
        .take(n)
        .collect()
}

/// Compact trail for terminals, e.g. `✓✓✗✓`.
pub fn streak_trail(records: &[PredictionRecord], n: usize) -> String {
    streak(records, n).into_iter().map(Status::glyph).collect()
}

pub fn rate_for_subset<P>(records: &[PredictionRecord], predicate: P) -> Option<u8>
where
    P: Fn(&PredictionRecord) -> bool,
{
    counts_iter(records.iter().filter(|&r| predicate(r))).success_rate()
}

pub fn rate_for_date(records: &[PredictionRecord], date: NaiveDate) -> Option<u8> {
    rate_for_subset(records, |r| r.scheduled_date == Some(date))
}

pub fn day_summary(records: &[PredictionRecord], date: NaiveDate) -> DaySummary {
    let c = counts_iter(records.iter().filter(|r| r.scheduled_date == Some(date)));
    DaySummary {
        date,
        total: c.total,
        checked: c.resolved(),
        correct: c.correct,
        wrong: c.wrong,
        unchecked: c.pending,
        rate: c.success_rate(),
    }
}

// Integer round-half-up of part/whole*100; avoids float ties like 0.5.
fn percent_half_up(part: usize, whole: usize) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let scaled = part as u128 * 200 + whole as u128;
    let pct = scaled / (whole as u128 * 2);
    Some(pct.min(100) as u8)
}
