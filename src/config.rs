use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::store::STORE_KEY;

const APP_DIR: &str = "fp_ledger";
const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_STREAK_LEN: usize = 10;
const MAX_STREAK_LEN: usize = 50;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub backend: Backend,
    pub path: PathBuf,
    pub api_url: String,
    pub streak_len: usize,
    pub http_timeout_secs: u64,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("FP_LEDGER_BACKEND")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "json" => Backend::Json,
            "sqlite" | "db" => Backend::Sqlite,
            other => return Err(anyhow!("FP_LEDGER_BACKEND must be json or sqlite, got '{other}'")),
        };

        let path = match env::var("FP_LEDGER_PATH") {
            Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
            _ => default_data_dir()
                .ok_or_else(|| anyhow!("unable to resolve data dir; set FP_LEDGER_PATH"))?
                .join(default_file_name(backend)),
        };

        let api_url = env::var("FP_API_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let streak_len = env::var("FP_STREAK_LEN")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_STREAK_LEN)
            .clamp(1, MAX_STREAK_LEN);

        let http_timeout_secs = env::var("FP_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .max(1);

        Ok(Self {
            backend,
            path,
            api_url,
            streak_len,
            http_timeout_secs,
        })
    }
}

fn default_file_name(backend: Backend) -> String {
    match backend {
        Backend::Json => format!("{STORE_KEY}.json"),
        Backend::Sqlite => format!("{STORE_KEY}.sqlite"),
    }
}

fn default_data_dir() -> Option<PathBuf> {
    // Prefer XDG data dir.
    if let Ok(base) = env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}
