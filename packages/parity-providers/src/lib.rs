pub mod search;
pub mod status;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::Client;

/// One HTTP client per run; the configured timeout applies to every call made through it.
pub fn client(cfg: &parity_config::Executor) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?)
}
