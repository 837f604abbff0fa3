use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;

const USER_AGENT: &str = concat!("fp_ledger/", env!("CARGO_PKG_VERSION"));

/// Built clients keyed by timeout in seconds. `Client` is a handle over a
/// shared pool, so handing out clones is cheap.
static CLIENTS: Lazy<Mutex<HashMap<u64, Client>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Shared blocking client for the given request timeout.
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    let mut clients = CLIENTS
        .lock()
        .map_err(|_| anyhow!("http client cache poisoned"))?;
    if let Some(client) = clients.get(&timeout_secs) {
        return Ok(client.clone());
    }
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")?;
    clients.insert(timeout_secs, client.clone());
    Ok(client)
}
