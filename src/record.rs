use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKET: &str = "1X2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Correct,
    Wrong,
}

impl Status {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Status::Pending)
    }

    /// Resolution only moves out of `Pending` or back into it.
    pub fn can_transition_to(self, next: Status) -> bool {
        match (self, next) {
            (Status::Pending, _) => true,
            (_, Status::Pending) => true,
            (a, b) => a == b,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Correct => "correct",
            Status::Wrong => "wrong",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Status::Pending => '·',
            Status::Correct => '✓',
            Status::Wrong => '✗',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "reset" => Ok(Status::Pending),
            "correct" | "won" | "win" => Ok(Status::Correct),
            "wrong" | "lost" | "loss" => Ok(Status::Wrong),
            other => Err(anyhow!("unknown status '{other}'")),
        }
    }
}

/// Model percentages shown next to a pick. Never read by the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeledProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl ModeledProbabilities {
    pub fn is_finite(&self) -> bool {
        self.home.is_finite() && self.draw.is_finite() && self.away.is_finite()
    }

    /// Every component is a finite percentage in `0..=100`.
    pub fn is_valid(&self) -> bool {
        [self.home, self.draw, self.away]
            .iter()
            .all(|p| p.is_finite() && (0.0..=100.0).contains(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    #[serde(rename = "home")]
    pub home_team: String,
    #[serde(rename = "away")]
    pub away_team: String,
    #[serde(rename = "league", default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
    #[serde(rename = "flag", default, skip_serializing_if = "Option::is_none")]
    pub competition_emblem: Option<String>,
    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(rename = "prediction")]
    pub predicted_outcome: String,
    #[serde(rename = "probs", default, skip_serializing_if = "Option::is_none")]
    pub modeled_probabilities: Option<ModeledProbabilities>,
    #[serde(rename = "result")]
    pub status: Status,
    #[serde(rename = "addedAt")]
    pub created_at: NaiveDate,
}

impl PredictionRecord {
    pub fn from_new(id: String, input: NewRecord, created_at: NaiveDate) -> Self {
        Self {
            id,
            home_team: input.home_team,
            away_team: input.away_team,
            competition: input.competition,
            competition_emblem: input.competition_emblem,
            scheduled_date: input.scheduled_date,
            scheduled_time: input.scheduled_time,
            market: input.market,
            predicted_outcome: input.predicted_outcome,
            modeled_probabilities: input.modeled_probabilities,
            status: Status::Pending,
            created_at,
        }
    }

    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// A record as accepted by the ledger: everything except the fields the
/// ledger assigns itself (`id`, `status`, `created_at`).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub home_team: String,
    pub away_team: String,
    pub competition: Option<String>,
    pub competition_emblem: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub market: String,
    pub predicted_outcome: String,
    pub modeled_probabilities: Option<ModeledProbabilities>,
}

fn default_market() -> String {
    DEFAULT_MARKET.to_string()
}
