use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::http_client;
use crate::ledger::Ledger;
use crate::record::{DEFAULT_MARKET, ModeledProbabilities, NewRecord};
use crate::store::RecordStore;

/// One fixture from the prediction service's weekly feed.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyFixture {
    pub fixture_id: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub home: String,
    pub away: String,
    pub league: Option<String>,
    pub flag: Option<String>,
    pub probabilities: Option<ModeledProbabilities>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub fetched: usize,
    pub added: usize,
    pub skipped_existing: usize,
}

/// Stable ledger id for a fixture on a given day.
pub fn fixture_record_id(fixture_id: &str, date: NaiveDate) -> String {
    format!("{}-{}", fixture_id.trim(), date.format("%Y-%m-%d"))
}

impl WeeklyFixture {
    pub fn record_id(&self) -> String {
        fixture_record_id(&self.fixture_id, self.date)
    }

    /// The model's favourite outcome, e.g. `"Arsenal 58%"` or `"Draw 31%"`.
    /// Ties go home, then draw.
    pub fn favourite(&self) -> Option<String> {
        let p = self.probabilities?;
        let (label, pct) = if p.home >= p.draw && p.home >= p.away {
            (self.home.as_str(), p.home)
        } else if p.draw >= p.away {
            ("Draw", p.draw)
        } else {
            (self.away.as_str(), p.away)
        };
        Some(format!("{label} {}%", pct.round() as i64))
    }

    pub fn to_new_record(&self) -> NewRecord {
        NewRecord {
            home_team: self.home.clone(),
            away_team: self.away.clone(),
            competition: self.league.clone(),
            competition_emblem: self.flag.clone(),
            scheduled_date: Some(self.date),
            scheduled_time: self.time.clone(),
            market: DEFAULT_MARKET.to_string(),
            predicted_outcome: self
                .favourite()
                .unwrap_or_else(|| format!("{} vs {}", self.home, self.away)),
            modeled_probabilities: self.probabilities,
        }
    }
}

pub fn fetch_weekly(api_url: &str, timeout_secs: u64) -> Result<Vec<WeeklyFixture>> {
    let client = http_client(timeout_secs)?;
    let url = format!("{}/api/weekly", api_url.trim_end_matches('/'));
    let resp = client.get(&url).send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body));
    }
    parse_weekly_json(&body)
}

/// Add every fixture scheduled on `date` that is not tracked yet.
pub fn seed_ledger<S: RecordStore>(
    ledger: &mut Ledger<S>,
    fixtures: &[WeeklyFixture],
    date: NaiveDate,
    today: NaiveDate,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    // Reverse so the feed's first fixture ends up on top after prepending.
    for fixture in fixtures.iter().filter(|f| f.date == date).rev() {
        summary.fetched += 1;
        if ledger.seed(&fixture.record_id(), fixture.to_new_record(), today)? {
            summary.added += 1;
        } else {
            summary.skipped_existing += 1;
        }
    }
    tracing::info!(
        date = %date,
        fetched = summary.fetched,
        added = summary.added,
        "seeded ledger from weekly fixtures"
    );
    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct WeeklyResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    days: BTreeMap<String, WeeklyDay>,
}

#[derive(Debug, Deserialize)]
struct WeeklyDay {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    matches: Vec<WeeklyMatch>,
}

#[derive(Debug, Deserialize)]
struct WeeklyMatch {
    fixture_id: Value,
    home: String,
    away: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    league: Option<WeeklyLeague>,
    #[serde(default)]
    markets: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WeeklyLeague {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    flag: Option<String>,
}

pub fn parse_weekly_json(raw: &str) -> Result<Vec<WeeklyFixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: WeeklyResponse = serde_json::from_str(trimmed).context("invalid weekly json")?;
    if let Some(err) = data.error {
        return Err(anyhow!("prediction service error: {err}"));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for day in data.days.into_values() {
        let day_date = day.date.as_deref().and_then(parse_day);
        for m in day.matches {
            let Some(fixture_id) = fixture_id_string(&m.fixture_id) else {
                continue;
            };
            let Some(date) = m.date.as_deref().and_then(parse_day).or(day_date) else {
                continue;
            };
            let fixture = WeeklyFixture {
                fixture_id,
                date,
                time: non_empty(m.time),
                home: m.home.trim().to_string(),
                away: m.away.trim().to_string(),
                league: m.league.as_ref().and_then(|l| non_empty(l.name.clone())),
                flag: m.league.as_ref().and_then(|l| non_empty(l.flag.clone())),
                probabilities: m.markets.as_ref().and_then(match_result_probs),
            };
            if fixture.home.is_empty() || fixture.away.is_empty() {
                continue;
            }
            if seen.insert(fixture.record_id()) {
                out.push(fixture);
            }
        }
    }
    out.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(out)
}

fn match_result_probs(markets: &Value) -> Option<ModeledProbabilities> {
    let rows = markets
        .get("match_result")
        .and_then(|v| v.get("markets"))
        .and_then(Value::as_array)?;
    let prob = |idx: usize| {
        rows.get(idx)
            .and_then(|row| row.get("probability"))
            .and_then(Value::as_f64)
    };
    Some(ModeledProbabilities {
        home: prob(0)?,
        draw: prob(1)?,
        away: prob(2)?,
    })
}

fn fixture_id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "TBD")
}
