use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate};

use fp_ledger::config::{Backend, LedgerConfig};
use fp_ledger::editor::RecordDraft;
use fp_ledger::grouping::{StatusFilter, filter_by_status, group_by_date};
use fp_ledger::ledger::{Ledger, today};
use fp_ledger::record::{PredictionRecord, Status};
use fp_ledger::stats::{self, DaySummary, RateBand};
use fp_ledger::store::{JsonFileStore, RecordStore, SqliteStore};
use fp_ledger::weekly_fetch;

const USAGE: &str = "\
usage: fp_ledger <command> [options]

commands:
  add --home H --away A --pick P [--date YYYY-MM-DD] [--time HH:MM]
      [--league L] [--flag F] [--market M]
  list [--filter all|pending|correct|wrong]
  days
  resolve <id> <pending|correct|wrong>
  toggle <id> <correct|wrong>
  remove <id>
  stats [--date YYYY-MM-DD]
  seed [--date YYYY-MM-DD]
  clear";

fn main() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{USAGE}");
        return Ok(());
    }

    let cfg = LedgerConfig::from_env()?;
    tracing::debug!(path = %cfg.path.display(), backend = ?cfg.backend, "using ledger store");
    match cfg.backend {
        Backend::Json => {
            let ledger = Ledger::open(JsonFileStore::new(cfg.path.clone()));
            dispatch(ledger, &cfg, command, &args[1..])
        }
        Backend::Sqlite => {
            let store = SqliteStore::open(&cfg.path)
                .with_context(|| format!("open ledger db {}", cfg.path.display()))?;
            dispatch(Ledger::open(store), &cfg, command, &args[1..])
        }
    }
}

fn dispatch<S: RecordStore>(
    mut ledger: Ledger<S>,
    cfg: &LedgerConfig,
    command: &str,
    args: &[String],
) -> Result<()> {
    match command {
        "add" => cmd_add(&mut ledger, args),
        "list" => {
            let filter = flag_value(args, "--filter")
                .map(|raw| raw.parse::<StatusFilter>())
                .transpose()?
                .unwrap_or_default();
            print_list(ledger.records(), filter);
            Ok(())
        }
        "days" => {
            print_days(ledger.records());
            Ok(())
        }
        "resolve" => {
            let (id, status) = id_and_status(args)?;
            if ledger.set_status(&id, status)? {
                println!("{id} -> {status}");
            } else {
                println!("{id}: nothing changed");
            }
            Ok(())
        }
        "toggle" => {
            let (id, status) = id_and_status(args)?;
            match ledger.toggle_status(&id, status)? {
                Some(now) => println!("{id} -> {now}"),
                None => println!("{id}: not found"),
            }
            Ok(())
        }
        "remove" => {
            let id = positional(args, 0).ok_or_else(|| anyhow!("remove needs an id"))?;
            match ledger.remove(&id)? {
                Some(record) => println!("removed {} ({})", id, record.fixture_label()),
                None => println!("{id}: not found"),
            }
            Ok(())
        }
        "stats" => {
            let date = parse_date_flag(args)?;
            print_stats(ledger.records(), date, cfg.streak_len);
            Ok(())
        }
        "seed" => {
            let date = parse_date_flag(args)?.unwrap_or_else(today);
            let fixtures = weekly_fetch::fetch_weekly(&cfg.api_url, cfg.http_timeout_secs)
                .context("fetch weekly fixtures")?;
            let summary = weekly_fetch::seed_ledger(&mut ledger, &fixtures, date, today())?;
            println!(
                "{}: {} fixtures, {} added, {} already tracked",
                date, summary.fetched, summary.added, summary.skipped_existing
            );
            Ok(())
        }
        "clear" => cmd_clear(&mut ledger),
        other => Err(anyhow!("unknown command '{other}'\n\n{USAGE}")),
    }
}

fn cmd_add<S: RecordStore>(ledger: &mut Ledger<S>, args: &[String]) -> Result<()> {
    let draft = RecordDraft {
        home_team: flag_value(args, "--home").unwrap_or_default(),
        away_team: flag_value(args, "--away").unwrap_or_default(),
        predicted_outcome: flag_value(args, "--pick").unwrap_or_default(),
        competition: flag_value(args, "--league"),
        competition_emblem: flag_value(args, "--flag"),
        scheduled_date: flag_value(args, "--date"),
        scheduled_time: flag_value(args, "--time"),
        market: flag_value(args, "--market"),
        modeled_probabilities: None,
    };
    let input = draft.validate(today()).context("cannot submit prediction")?;
    let record = ledger.add(input)?;
    println!("added {} ({})", record.id, record.fixture_label());
    Ok(())
}

fn cmd_clear<S: RecordStore>(ledger: &mut Ledger<S>) -> Result<()> {
    let token = ledger.request_clear();
    if token.records() == 0 {
        ledger.cancel_clear();
        println!("ledger is already empty");
        return Ok(());
    }
    print!(
        "This permanently erases {} predictions. Type 'yes' to confirm: ",
        token.records()
    );
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read confirmation")?;
    if answer.trim() != "yes" {
        ledger.cancel_clear();
        println!("cancelled");
        return Ok(());
    }
    ledger.confirm_clear(token)?;
    println!("ledger cleared");
    Ok(())
}

fn print_list(records: &[PredictionRecord], filter: StatusFilter) {
    let shown = filter_by_status(records, filter);
    if shown.is_empty() {
        println!("no predictions");
        return;
    }
    for record in shown {
        println!("{}", format_row(record));
    }
}

fn print_days(records: &[PredictionRecord]) {
    for bucket in group_by_date(records) {
        let rate = stats::rate_for_subset(records, |r| bucket.key.contains(r))
            .map(|r| format!("{r}%"))
            .unwrap_or_else(|| "-".to_string());
        println!("{}  ({} picks, rate {})", bucket.key, bucket.records.len(), rate);
        for record in bucket.records {
            println!("  {}", format_row(record));
        }
    }
}

fn print_stats(records: &[PredictionRecord], date: Option<NaiveDate>, streak_len: usize) {
    let counts = stats::counts(records);
    println!(
        "total {}  correct {}  wrong {}  pending {}",
        counts.total, counts.correct, counts.wrong, counts.pending
    );
    match counts.success_rate() {
        Some(rate) => println!(
            "success rate {}% ({})",
            rate,
            RateBand::from_rate(rate).label()
        ),
        None => println!("success rate -"),
    }
    let trail = stats::streak_trail(records, streak_len);
    if !trail.is_empty() {
        println!("last {}: {}", streak_len, trail);
    }

    let days = match date {
        Some(date) => vec![date],
        None => {
            let now = today();
            vec![now - ChronoDuration::days(1), now]
        }
    };
    for day in days {
        print_day(&stats::day_summary(records, day));
    }
}

fn print_day(summary: &DaySummary) {
    if summary.total == 0 {
        return;
    }
    let rate = summary
        .rate
        .map(|r| format!("{r}%"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}: {} picks, {} correct, {} wrong, {} unchecked, rate {}",
        summary.date, summary.total, summary.correct, summary.wrong, summary.unchecked, rate
    );
}

fn format_row(record: &PredictionRecord) -> String {
    let when = match (record.scheduled_date, record.scheduled_time.as_deref()) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        (Some(date), None) => date.to_string(),
        (None, _) => "undated".to_string(),
    };
    format!(
        "{} {}  {}  {}  [{}] {}  {}",
        record.status.glyph(),
        record.id,
        when,
        record.fixture_label(),
        record.market,
        record.predicted_outcome,
        record.competition.as_deref().unwrap_or(""),
    )
}

fn id_and_status(args: &[String]) -> Result<(String, Status)> {
    let id = positional(args, 0).ok_or_else(|| anyhow!("missing record id"))?;
    let status = positional(args, 1)
        .ok_or_else(|| anyhow!("missing status"))?
        .parse::<Status>()?;
    Ok((id, status))
}

fn parse_date_flag(args: &[String]) -> Result<Option<NaiveDate>> {
    flag_value(args, "--date")
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid --date '{raw}'"))
        })
        .transpose()
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == name {
            if let Some(next) = args.get(idx + 1) {
                return Some(next.clone());
            }
        }
    }
    None
}

fn positional(args: &[String], index: usize) -> Option<String> {
    let mut skip_next = false;
    let mut found = 0usize;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !arg.contains('=');
            continue;
        }
        if found == index {
            return Some(arg.clone());
        }
        found += 1;
    }
    None
}
