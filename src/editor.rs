use chrono::NaiveDate;
use thiserror::Error;

use crate::record::{DEFAULT_MARKET, ModeledProbabilities, NewRecord};

pub const DEFAULT_COMPETITION: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("probabilities must be finite percentages between 0 and 100")]
    InvalidProbabilities,
}

/// Raw form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub home_team: String,
    pub away_team: String,
    pub predicted_outcome: String,
    pub competition: Option<String>,
    pub competition_emblem: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub market: Option<String>,
    pub modeled_probabilities: Option<ModeledProbabilities>,
}

impl RecordDraft {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        predicted_outcome: impl Into<String>,
    ) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            predicted_outcome: predicted_outcome.into(),
            ..Self::default()
        }
    }

    /// Build a ledger-ready record, or say why the form can't be submitted.
    /// `today` fills in a missing date.
    pub fn validate(&self, today: NaiveDate) -> Result<NewRecord, EditorError> {
        let home_team = required(&self.home_team, "home team")?;
        let away_team = required(&self.away_team, "away team")?;
        let predicted_outcome = required(&self.predicted_outcome, "prediction")?;

        if self
            .modeled_probabilities
            .is_some_and(|p| !p.is_valid())
        {
            return Err(EditorError::InvalidProbabilities);
        }

        let scheduled_date = match optional(self.scheduled_date.as_deref()) {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| EditorError::InvalidDate(raw.clone()))?,
            None => today,
        };

        Ok(NewRecord {
            home_team,
            away_team,
            competition: Some(
                optional(self.competition.as_deref())
                    .unwrap_or_else(|| DEFAULT_COMPETITION.to_string()),
            ),
            competition_emblem: optional(self.competition_emblem.as_deref()),
            scheduled_date: Some(scheduled_date),
            scheduled_time: optional(self.scheduled_time.as_deref()),
            market: optional(self.market.as_deref()).unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            predicted_outcome,
            modeled_probabilities: self.modeled_probabilities,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, EditorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EditorError::Missing(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
