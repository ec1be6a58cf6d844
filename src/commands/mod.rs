pub mod factor;
pub mod run;
pub mod summary;

pub use factor::handle_factor;
pub use run::handle_run;
pub use summary::handle_summary;

use anyhow::{Context, Result};

/// Shared HTTP client for the feed and the authoritative fetch
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("co2track/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}
