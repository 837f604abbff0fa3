use std::collections::HashSet;

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, Utc};
use rand::Rng;

use crate::record::{NewRecord, PredictionRecord, Status};
use crate::store::RecordStore;

/// Proof that the caller asked for a full erase before performing it.
/// Single use: `confirm_clear` consumes it, and a newer request replaces it.
#[derive(Debug, PartialEq, Eq)]
pub struct ClearToken {
    nonce: u64,
    records: usize,
}

impl ClearToken {
    /// How many records the erase will remove, as of the request.
    pub fn records(&self) -> usize {
        self.records
    }
}

/// Ordered prediction records (most recent first), kept in step with a
/// `RecordStore`. Each mutation is written through before it becomes
/// visible; a failed write leaves memory and storage at the prior state.
pub struct Ledger<S: RecordStore> {
    store: S,
    records: Vec<PredictionRecord>,
    pending_clear: Option<u64>,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl<S: RecordStore> Ledger<S> {
    pub fn open(store: S) -> Self {
        let records = store.load();
        tracing::debug!(records = records.len(), "ledger opened");
        Self {
            store,
            records,
            pending_clear: None,
        }
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&PredictionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn add(&mut self, input: NewRecord) -> Result<&PredictionRecord> {
        self.add_on(input, today())
    }

    pub fn add_on(&mut self, input: NewRecord, today: NaiveDate) -> Result<&PredictionRecord> {
        let id = self.fresh_id();
        self.insert_front(PredictionRecord::from_new(id, input, today))?;
        Ok(&self.records[0])
    }

    /// Insert a record under a caller-chosen stable id, e.g. one derived from
    /// an upstream fixture. Returns `false` when that id is already tracked.
    pub fn seed(&mut self, id: &str, input: NewRecord, today: NaiveDate) -> Result<bool> {
        if id.trim().is_empty() {
            return Err(anyhow!("seeded record id must not be empty"));
        }
        if self.position(id).is_some() {
            return Ok(false);
        }
        self.insert_front(PredictionRecord::from_new(id.to_string(), input, today))?;
        Ok(true)
    }

    /// Returns `false` when `id` is unknown, the record already holds
    /// `status`, or the move is not a valid transition.
    pub fn set_status(&mut self, id: &str, status: Status) -> Result<bool> {
        let Some(idx) = self.position(id) else {
            tracing::debug!(id, "set_status on unknown id ignored");
            return Ok(false);
        };
        let current = self.records[idx].status;
        if current == status {
            return Ok(false);
        }
        if !current.can_transition_to(status) {
            tracing::debug!(id, from = %current, to = %status, "invalid status transition ignored");
            return Ok(false);
        }

        self.records[idx].status = status;
        if let Err(err) = self.persist() {
            self.records[idx].status = current;
            return Err(err);
        }
        tracing::debug!(id, from = %current, to = %status, "status updated");
        Ok(true)
    }

    /// Result-checker semantics: choosing the status a record already has
    /// resets it to pending. Returns the status after the call, or `None`
    /// for an unknown id.
    pub fn toggle_status(&mut self, id: &str, status: Status) -> Result<Option<Status>> {
        let Some(current) = self.get(id).map(|r| r.status) else {
            return Ok(None);
        };
        let next = if current == status {
            Status::Pending
        } else {
            status
        };
        self.set_status(id, next)?;
        Ok(self.get(id).map(|r| r.status))
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<PredictionRecord>> {
        let Some(idx) = self.position(id) else {
            tracing::debug!(id, "remove on unknown id ignored");
            return Ok(None);
        };
        let removed = self.records.remove(idx);
        if let Err(err) = self.persist() {
            self.records.insert(idx, removed);
            return Err(err);
        }
        tracing::debug!(id, "record removed");
        Ok(Some(removed))
    }

    pub fn request_clear(&mut self) -> ClearToken {
        let nonce = rand::thread_rng().gen_range(1..u64::MAX);
        self.pending_clear = Some(nonce);
        ClearToken {
            nonce,
            records: self.records.len(),
        }
    }

    /// Erase every record, irrecoverably. Fails without touching anything
    /// if `token` was not the latest one issued by this ledger.
    pub fn confirm_clear(&mut self, token: ClearToken) -> Result<()> {
        if self.pending_clear != Some(token.nonce) {
            tracing::warn!("rejected stale clear token");
            return Err(anyhow!("clear was not requested or the request is stale"));
        }
        self.store.clear().context("clear ledger store")?;
        self.pending_clear = None;
        let erased = self.records.len();
        self.records.clear();
        tracing::info!(erased, "ledger cleared");
        Ok(())
    }

    /// Drop an outstanding clear request, if any.
    pub fn cancel_clear(&mut self) {
        self.pending_clear = None;
    }

    fn insert_front(&mut self, record: PredictionRecord) -> Result<()> {
        let id = record.id.clone();
        self.records.insert(0, record);
        if let Err(err) = self.persist() {
            self.records.remove(0);
            return Err(err);
        }
        tracing::debug!(id = %id, total = self.records.len(), "record added");
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        self.store
            .save(&self.records)
            .context("persist prediction ledger")
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn fresh_id(&self) -> String {
        let taken: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        let mut rng = rand::thread_rng();
        loop {
            let millis = Utc::now().timestamp_millis().max(0) as u64;
            let id = format!("{millis:x}-{:08x}", rng.gen_range(0..u32::MAX));
            if !taken.contains(id.as_str()) {
                return id;
            }
        }
    }
}
