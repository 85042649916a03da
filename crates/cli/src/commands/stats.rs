//! Order statistics report.

use std::io::Write;

use atelier_client::{AccessToken, ApiClient};
use atelier_core::stats::{OrderStatistics, StatsRange};
use secrecy::{ExposeSecret, SecretString};

use super::CliError;

/// Parse a `--range` value strictly; unlike the dashboard, typos are errors.
///
/// # Errors
///
/// Returns [`CliError::InvalidRange`] for unknown values.
pub fn parse_range(value: &str) -> Result<StatsRange, CliError> {
    StatsRange::OPTIONS
        .iter()
        .find(|(_, param, _)| *param == value)
        .map(|(range, _, _)| *range)
        .ok_or_else(|| CliError::InvalidRange(value.to_string()))
}

/// Sign in as an admin, fetch every order and print the statistics.
///
/// # Errors
///
/// Fails on an unknown range, bad or non-admin credentials, or upstream errors.
pub async fn run(
    api: &ApiClient,
    range: &str,
    email: &str,
    password: &SecretString,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let range = parse_range(range)?;

    let auth = api.login(email, password.expose_secret()).await?;
    if !auth.user.is_admin() {
        return Err(CliError::NotAdmin(email.to_string()));
    }
    let token = AccessToken::new(auth.token);

    let orders = api.all_orders(None, &token).await?;
    tracing::info!(orders = orders.len(), range = range.as_param(), "Fetched orders");

    let stats = OrderStatistics::compute(&orders, range, chrono::Utc::now().date_naive());
    write_report(&stats, out)?;
    Ok(())
}

/// Render the statistics as plain text.
///
/// # Errors
///
/// Returns any write error.
pub fn write_report(stats: &OrderStatistics, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Orders {} to {}", stats.start, stats.end)?;
    writeln!(out)?;
    writeln!(out, "  total orders       {}", stats.total_orders)?;
    writeln!(out, "  revenue            {} ({} orders)", stats.revenue, stats.revenue_orders)?;
    writeln!(out, "  average order      {}", stats.average_order_value)?;
    writeln!(out, "  cancellation rate  {:.1}%", stats.cancellation_rate)?;

    writeln!(out)?;
    writeln!(out, "By status")?;
    for (status, count) in &stats.by_status {
        writeln!(out, "  {:<10} {count}", status.label())?;
    }

    if !stats.top_products.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top products")?;
        for product in &stats.top_products {
            writeln!(
                out,
                "  #{:<6} {:<32} {:>4} units  {}",
                product.product_id, product.name, product.units, product.revenue
            )?;
        }
    }

    if !stats.categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "Revenue by category")?;
        for category in &stats.categories {
            writeln!(
                out,
                "  {:<20} {:>12}  {:.1}%",
                category.name,
                category.revenue.to_string(),
                category.share
            )?;
        }
    }

    Ok(())
}
