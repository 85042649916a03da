//! Subcommand implementations.
//!
//! Every command writes its report to the given writer so tests can capture
//! it; diagnostics go through `tracing` to stderr.

pub mod health;
pub mod low_stock;
pub mod stats;

use atelier_client::{ApiClient, ApiError, ClientConfig};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Upstream call failed.
    #[error("Upstream error: {0}")]
    Api(#[from] ApiError),

    /// The credentials belong to a customer account.
    #[error("{0} is not an admin account")]
    NotAdmin(String),

    /// Unknown `--range` value.
    #[error("Invalid range: {0}. Valid ranges: 7d, 30d, 90d, ytd, all")]
    InvalidRange(String),

    /// A required service is down.
    #[error("Unhealthy: {0}")]
    Unhealthy(String),

    /// Writing the report failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build an API client from `ATELIER_API_URL` and `ATELIER_RECOMMEND_URL`.
///
/// The recommendation URL falls back to the backend URL when unset.
///
/// # Errors
///
/// Returns an error if `ATELIER_API_URL` is missing or the client cannot be built.
pub fn client_from_env() -> Result<ApiClient, CliError> {
    let api_url =
        std::env::var("ATELIER_API_URL").map_err(|_| CliError::MissingEnvVar("ATELIER_API_URL"))?;
    let recommend_url = std::env::var("ATELIER_RECOMMEND_URL").unwrap_or_else(|_| api_url.clone());
    Ok(ApiClient::new(&ClientConfig::new(api_url, recommend_url))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use atelier_client::{ApiClient, ClientConfig};
    use mockito::Server;

    /// Client pointed at a mock server for both upstreams.
    pub fn client_for(server: &Server) -> ApiClient {
        ApiClient::new(&ClientConfig::new(server.url(), server.url())).unwrap()
    }
}
