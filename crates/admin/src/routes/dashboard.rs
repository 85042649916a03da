//! Dashboard: order statistics over a selectable range.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::stats::{OrderStatistics, StatsRange};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::routes::upstream_failure;
use crate::state::AppState;
use crate::views::{SelectOption, Shell, status_class};

/// Dashboard query parameters.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub range: Option<String>,
}

/// Order count for one status.
#[derive(Debug, Clone)]
pub struct StatusCount {
    pub label: &'static str,
    pub class: String,
    pub count: usize,
}

/// One bar of the revenue chart.
#[derive(Debug, Clone)]
pub struct SeriesBar {
    pub label: String,
    pub orders: usize,
    pub revenue: String,
    /// Bar height relative to the busiest bucket, 0..=100.
    pub height: u32,
}

/// Row of the top sellers table.
#[derive(Debug, Clone)]
pub struct TopProductRow {
    pub product_id: i32,
    pub name: String,
    pub units: u32,
    pub revenue: String,
}

/// Row of the revenue-by-category table.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub name: String,
    pub revenue: String,
    pub share: f64,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub shell: Shell,
    pub ranges: Vec<SelectOption>,
    pub period: String,
    pub total_orders: usize,
    pub revenue_orders: usize,
    pub revenue: String,
    pub average_order_value: String,
    pub cancellation_rate: f64,
    pub statuses: Vec<StatusCount>,
    pub series: Vec<SeriesBar>,
    pub top_products: Vec<TopProductRow>,
    pub categories: Vec<CategoryRow>,
}

impl DashboardTemplate {
    fn from_stats(shell: Shell, stats: &OrderStatistics) -> Self {
        let peak = stats.peak_revenue().to_f64();
        let series = stats
            .series
            .iter()
            .map(|point| SeriesBar {
                label: point.label.clone(),
                orders: point.orders,
                revenue: point.revenue.to_string(),
                height: bar_height(point.revenue.to_f64(), peak),
            })
            .collect();

        Self {
            shell,
            ranges: StatsRange::OPTIONS
                .iter()
                .map(|(range, param, label)| SelectOption::new(*param, *label, *range == stats.range))
                .collect(),
            period: format!("{} to {}", stats.start, stats.end),
            total_orders: stats.total_orders,
            revenue_orders: stats.revenue_orders,
            revenue: stats.revenue.to_string(),
            average_order_value: stats.average_order_value.to_string(),
            cancellation_rate: stats.cancellation_rate,
            statuses: stats
                .by_status
                .iter()
                .map(|(status, count)| StatusCount {
                    label: status.label(),
                    class: status_class(*status),
                    count: *count,
                })
                .collect(),
            series,
            top_products: stats
                .top_products
                .iter()
                .map(|p| TopProductRow {
                    product_id: p.product_id.as_i32(),
                    name: p.name.clone(),
                    units: p.units,
                    revenue: p.revenue.to_string(),
                })
                .collect(),
            categories: stats
                .categories
                .iter()
                .map(|c| CategoryRow {
                    name: c.name.clone(),
                    revenue: c.revenue.to_string(),
                    share: c.share,
                })
                .collect(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_height(value: f64, peak: f64) -> u32 {
    if peak <= 0.0 {
        return 0;
    }
    (value / peak * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Dashboard page handler.
#[instrument(skip(admin, state, session), fields(admin_id = %admin.id))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let range = StatsRange::from_param(query.range.as_deref());

    let orders = match state.api().all_orders(None, &admin.token()).await {
        Ok(orders) => orders,
        Err(e) => return upstream_failure(&session, e).await,
    };

    let today = chrono::Utc::now().date_naive();
    let stats = OrderStatistics::compute(&orders, range, today);
    tracing::debug!(
        orders = orders.len(),
        in_range = stats.total_orders,
        "Computed dashboard statistics"
    );

    let shell = Shell::load(&session, &admin, "/").await;
    Ok(DashboardTemplate::from_stats(shell, &stats).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_height() {
        assert_eq!(bar_height(50.0, 200.0), 25);
        assert_eq!(bar_height(200.0, 200.0), 100);
        assert_eq!(bar_height(10.0, 0.0), 0);
    }
}
