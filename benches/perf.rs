use chrono::{Duration, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fp_ledger::grouping::{StatusFilter, filter_by_status, group_by_date};
use fp_ledger::record::{PredictionRecord, Status};
use fp_ledger::stats::{counts, rate_for_date, streak, success_rate};
use fp_ledger::store::{decode, encode};
use fp_ledger::weekly_fetch::parse_weekly_json;

const LEDGER_SIZE: usize = 5_000;

fn sample_ledger(n: usize) -> Vec<PredictionRecord> {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
    (0..n)
        .map(|i| {
            let status = match i % 5 {
                0 | 1 => Status::Correct,
                2 => Status::Wrong,
                _ => Status::Pending,
            };
            let date = base + Duration::days((i / 12) as i64);
            PredictionRecord {
                id: format!("{i}-{date}"),
                home_team: format!("Home {}", i % 20),
                away_team: format!("Away {}", i % 17),
                competition: Some("Premier League".to_string()),
                competition_emblem: None,
                scheduled_date: if i % 50 == 0 { None } else { Some(date) },
                scheduled_time: Some("20:00".to_string()),
                market: "1X2".to_string(),
                predicted_outcome: format!("Home {} 55%", i % 20),
                modeled_probabilities: None,
                status,
                created_at: date,
            }
        })
        .rev()
        .collect()
}

fn bench_aggregates(c: &mut Criterion) {
    let records = sample_ledger(LEDGER_SIZE);
    let day = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    c.bench_function("ledger_aggregates", |b| {
        b.iter(|| {
            let c = counts(black_box(&records));
            black_box(c.total);
            black_box(success_rate(&records));
            black_box(rate_for_date(&records, day));
            black_box(streak(&records, 10).len());
        })
    });
}

fn bench_group_by_date(c: &mut Criterion) {
    let records = sample_ledger(LEDGER_SIZE);
    c.bench_function("group_by_date", |b| {
        b.iter(|| {
            let buckets = group_by_date(black_box(&records));
            black_box(buckets.len());
        })
    });
}

fn bench_filter(c: &mut Criterion) {
    let records = sample_ledger(LEDGER_SIZE);
    c.bench_function("filter_by_status", |b| {
        b.iter(|| {
            let kept = filter_by_status(black_box(&records), StatusFilter::Pending);
            black_box(kept.len());
        })
    });
}

fn bench_blob_codec(c: &mut Criterion) {
    let records = sample_ledger(LEDGER_SIZE);
    let raw = encode(&records).expect("encode");
    c.bench_function("ledger_blob_decode", |b| {
        b.iter(|| {
            let loaded = decode(black_box(&raw));
            black_box(loaded.len());
        })
    });
}

fn bench_weekly_parse(c: &mut Criterion) {
    c.bench_function("weekly_parse", |b| {
        b.iter(|| {
            let rows = parse_weekly_json(black_box(WEEKLY_JSON)).expect("fixture parses");
            black_box(rows.len());
        })
    });
}

criterion_group!(
    perf,
    bench_aggregates,
    bench_group_by_date,
    bench_filter,
    bench_blob_codec,
    bench_weekly_parse
);
criterion_main!(perf);

static WEEKLY_JSON: &str = include_str!("../tests/fixtures/weekly.json");
