use chrono::NaiveDate;

use fp_ledger::editor::RecordDraft;
use fp_ledger::grouping::{DateKey, StatusFilter, filter_by_status, group_by_date};
use fp_ledger::ledger::Ledger;
use fp_ledger::record::{ModeledProbabilities, NewRecord, Status};
use fp_ledger::stats::{Counts, counts, streak, success_rate};
use fp_ledger::store::{MemoryStore, RecordStore};

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

fn draft(home: &str, away: &str, date: &str, pick: &str) -> NewRecord {
    let mut draft = RecordDraft::new(home, away, pick);
    draft.scheduled_date = Some(date.to_string());
    draft.validate(day("2024-12-31")).expect("draft should validate")
}

#[test]
fn scenario_walkthrough() {
    let mut ledger = Ledger::open(MemoryStore::new());

    // A: a fresh pick is pending and the rate is undefined.
    let a_id = ledger
        .add_on(
            draft("Arsenal", "Chelsea", "2025-01-01", "Arsenal 58%"),
            day("2024-12-31"),
        )
        .expect("add should persist")
        .id
        .clone();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].status, Status::Pending);
    assert_eq!(ledger.records()[0].created_at, day("2024-12-31"));
    assert_eq!(success_rate(ledger.records()), None);

    // B: resolving it correct.
    assert!(ledger.set_status(&a_id, Status::Correct).expect("persist"));
    assert_eq!(
        counts(ledger.records()),
        Counts {
            total: 1,
            correct: 1,
            wrong: 0,
            pending: 0
        }
    );
    assert_eq!(success_rate(ledger.records()), Some(100));

    // C: a second pick on the same day, later marked wrong.
    let b_id = ledger
        .add_on(
            draft("Liverpool", "Everton", "2025-01-01", "Draw 31%"),
            day("2024-12-31"),
        )
        .expect("add should persist")
        .id
        .clone();
    assert_ne!(a_id, b_id);
    assert_eq!(ledger.records()[0].id, b_id, "new records go first");
    assert!(ledger.set_status(&b_id, Status::Wrong).expect("persist"));
    assert_eq!(success_rate(ledger.records()), Some(50));
    let buckets = group_by_date(ledger.records());
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].key, DateKey::Dated(day("2025-01-01")));
    assert_eq!(buckets[0].records.len(), 2);

    // D: filtering on correct yields only A.
    let correct = filter_by_status(ledger.records(), StatusFilter::Correct);
    assert_eq!(correct.len(), 1);
    assert_eq!(correct[0].id, a_id);

    // E: removing B brings the rate back.
    let removed = ledger.remove(&b_id).expect("persist");
    assert!(removed.is_some());
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].id, a_id);
    assert_eq!(success_rate(ledger.records()), Some(100));

    // Everything above was written through.
    let reopened = Ledger::open(ledger.into_store());
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.records()[0].status, Status::Correct);
}

#[test]
fn add_then_remove_restores_collection() {
    let mut ledger = Ledger::open(MemoryStore::new());
    for i in 0..3 {
        ledger
            .add_on(
                draft(&format!("H{i}"), &format!("A{i}"), "2025-02-01", "home"),
                day("2025-01-30"),
            )
            .expect("add");
    }
    let before = ledger.records().to_vec();
    let id = ledger
        .add_on(draft("X", "Y", "2025-02-02", "away"), day("2025-01-30"))
        .expect("add")
        .id
        .clone();
    ledger.remove(&id).expect("remove");
    assert_eq!(ledger.records(), before.as_slice());
    assert_eq!(ledger.store().load(), before);
}

#[test]
fn unknown_ids_and_invalid_transitions_are_ignored() {
    let mut ledger = Ledger::open(MemoryStore::new());
    let id = ledger
        .add_on(draft("H", "A", "2025-01-01", "H"), day("2025-01-01"))
        .expect("add")
        .id
        .clone();

    assert!(!ledger.set_status("missing", Status::Correct).expect("no-op"));
    assert!(ledger.remove("missing").expect("no-op").is_none());

    assert!(ledger.set_status(&id, Status::Correct).expect("persist"));
    assert!(!ledger.set_status(&id, Status::Wrong).expect("no-op"));
    assert_eq!(ledger.get(&id).map(|r| r.status), Some(Status::Correct));

    assert!(ledger.set_status(&id, Status::Pending).expect("persist"));
    assert!(ledger.set_status(&id, Status::Wrong).expect("persist"));
    assert_eq!(ledger.get(&id).map(|r| r.status), Some(Status::Wrong));
}

#[test]
fn toggle_resets_when_repeated() {
    let mut ledger = Ledger::open(MemoryStore::new());
    let id = ledger
        .add_on(draft("H", "A", "2025-01-01", "H"), day("2025-01-01"))
        .expect("add")
        .id
        .clone();

    assert_eq!(
        ledger.toggle_status(&id, Status::Correct).expect("persist"),
        Some(Status::Correct)
    );
    assert_eq!(
        ledger.toggle_status(&id, Status::Correct).expect("persist"),
        Some(Status::Pending)
    );
    assert_eq!(ledger.toggle_status("nope", Status::Wrong).expect("no-op"), None);
}

#[test]
fn failed_write_leaves_ledger_unchanged() {
    let mut ledger = Ledger::open(MemoryStore::new());
    let id = ledger
        .add_on(draft("H", "A", "2025-01-01", "H"), day("2025-01-01"))
        .expect("add")
        .id
        .clone();
    let snapshot = ledger.records().to_vec();

    let mut store = ledger.into_store();
    store.set_read_only(true);
    let mut ledger = Ledger::open(store);

    assert!(
        ledger
            .add_on(draft("X", "Y", "2025-01-02", "X"), day("2025-01-01"))
            .is_err()
    );
    assert!(ledger.set_status(&id, Status::Correct).is_err());
    assert!(ledger.remove(&id).is_err());
    assert_eq!(ledger.records(), snapshot.as_slice());
    assert_eq!(ledger.store().load(), snapshot);
}

#[test]
fn clear_needs_the_latest_token() {
    let mut ledger = Ledger::open(MemoryStore::new());
    for i in 0..2 {
        ledger
            .add_on(draft(&format!("H{i}"), "A", "2025-01-01", "H"), day("2025-01-01"))
            .expect("add");
    }

    let stale = ledger.request_clear();
    let fresh = ledger.request_clear();
    assert_eq!(fresh.records(), 2);
    assert!(ledger.confirm_clear(stale).is_err());
    assert_eq!(ledger.len(), 2);

    ledger.confirm_clear(fresh).expect("clear");
    assert!(ledger.is_empty());
    assert!(ledger.store().raw().is_none());

    let token = ledger.request_clear();
    ledger.cancel_clear();
    assert!(ledger.confirm_clear(token).is_err());
}

#[test]
fn seeded_ids_are_stable_and_not_duplicated() {
    let mut ledger = Ledger::open(MemoryStore::new());
    let input = draft("H", "A", "2025-01-01", "H 55%");
    assert!(ledger.seed("1001-2025-01-01", input.clone(), day("2025-01-01")).expect("seed"));
    assert!(!ledger.seed("1001-2025-01-01", input, day("2025-01-01")).expect("seed"));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].id, "1001-2025-01-01");
}

#[test]
fn streak_reads_newest_first() {
    let mut ledger = Ledger::open(MemoryStore::new());
    let mut ids = Vec::new();
    for i in 0..4 {
        let id = ledger
            .add_on(draft(&format!("H{i}"), "A", "2025-01-01", "H"), day("2025-01-01"))
            .expect("add")
            .id
            .clone();
        ids.push(id);
    }
    // oldest two correct, then wrong, newest stays pending
    ledger.set_status(&ids[0], Status::Correct).expect("persist");
    ledger.set_status(&ids[1], Status::Correct).expect("persist");
    ledger.set_status(&ids[2], Status::Wrong).expect("persist");

    assert_eq!(
        streak(ledger.records(), 2),
        vec![Status::Wrong, Status::Correct]
    );
}

#[test]
fn unreadable_probabilities_are_refused_before_saving() {
    let mut ledger = Ledger::open(MemoryStore::new());
    ledger
        .add_on(draft("Arsenal", "Chelsea", "2025-01-01", "Arsenal 58%"), day("2025-01-01"))
        .expect("add");

    let mut bad = draft("Liverpool", "Everton", "2025-01-01", "Liverpool");
    bad.modeled_probabilities = Some(ModeledProbabilities {
        home: f64::NAN,
        draw: 25.0,
        away: 20.0,
    });
    assert!(ledger.add_on(bad.clone(), day("2025-01-01")).is_err());
    assert!(ledger.seed("77-2025-01-01", bad, day("2025-01-01")).is_err());
    assert_eq!(ledger.len(), 1);

    let reopened = Ledger::open(ledger.into_store());
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.records()[0].home_team, "Arsenal");
}
