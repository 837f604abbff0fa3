pub mod config;
pub mod editor;
pub mod grouping;
pub mod http_client;
pub mod ledger;
pub mod record;
pub mod stats;
pub mod store;
pub mod weekly_fetch;
