//! Upstream health check.

use std::io::Write;

use atelier_client::ApiClient;

use super::CliError;

/// Ping the backend and the recommendation service.
///
/// A down recommender is reported but not fatal: the storefront renders
/// without its panels.
///
/// # Errors
///
/// Returns [`CliError::Unhealthy`] when the backend does not answer.
pub async fn run(api: &ApiClient, out: &mut impl Write) -> Result<(), CliError> {
    let (backend, recommender) = tokio::join!(api.backend_health(), api.recommender_health());

    match &backend {
        Ok(()) => writeln!(out, "backend         ok")?,
        Err(e) => writeln!(out, "backend         FAILED ({e})")?,
    }
    match &recommender {
        Ok(()) => writeln!(out, "recommendation  ok")?,
        Err(e) => {
            tracing::warn!(error = %e, "Recommendation service unhealthy");
            writeln!(out, "recommendation  degraded ({e})")?;
        }
    }

    backend.map_err(|e| CliError::Unhealthy(format!("backend: {e}")))
}
