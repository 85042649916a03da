//! Order statistics for the admin dashboard.
//!
//! The backend only lists orders; every number on the dashboard is derived
//! here so the same figures show up in the admin console and the CLI report.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::order::Order;
use crate::types::{Money, OrderStatus, ProductId};

/// How many products the "top sellers" table shows.
pub const TOP_PRODUCTS: usize = 5;

/// Dashboard date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatsRange {
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
    YearToDate,
    All,
}

/// Granularity of the revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Day,
    Month,
}

impl StatsRange {
    /// Every range with its query value and label, for the range selector.
    pub const OPTIONS: [(Self, &'static str, &'static str); 5] = [
        (Self::Last7Days, "7d", "Last 7 days"),
        (Self::Last30Days, "30d", "Last 30 days"),
        (Self::Last90Days, "90d", "Last 90 days"),
        (Self::YearToDate, "ytd", "Year to date"),
        (Self::All, "all", "All time"),
    ];

    /// Parse a query value, falling back to the default range.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        Self::OPTIONS
            .iter()
            .find(|(_, param, _)| Some(*param) == value)
            .map_or_else(Self::default, |(range, _, _)| *range)
    }

    /// Query value.
    #[must_use]
    pub fn as_param(self) -> &'static str {
        Self::OPTIONS
            .iter()
            .find(|(range, _, _)| *range == self)
            .map_or("30d", |(_, param, _)| param)
    }

    /// First day included in the range. `earliest` is the oldest order date,
    /// used by [`StatsRange::All`].
    #[must_use]
    pub fn start(self, today: NaiveDate, earliest: Option<NaiveDate>) -> NaiveDate {
        let days_back = |n: u64| {
            today
                .checked_sub_days(chrono::Days::new(n - 1))
                .unwrap_or(today)
        };
        match self {
            Self::Last7Days => days_back(7),
            Self::Last30Days => days_back(30),
            Self::Last90Days => days_back(90),
            Self::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            Self::All => earliest.unwrap_or(today).min(today),
        }
    }

    /// Series granularity.
    #[must_use]
    pub const fn bucket(self) -> Bucket {
        match self {
            Self::Last7Days | Self::Last30Days | Self::Last90Days => Bucket::Day,
            Self::YearToDate | Self::All => Bucket::Month,
        }
    }
}

/// One point of the revenue series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPoint {
    /// `YYYY-MM-DD` for daily buckets, `YYYY-MM` for monthly ones.
    pub label: String,
    pub orders: usize,
    pub revenue: Money,
}

/// Sales of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units: u32,
    pub revenue: Money,
}

/// Revenue attributed to one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRevenue {
    pub name: String,
    pub revenue: Money,
    /// Share of total revenue, 0..=100.
    pub share: f64,
}

/// Everything the statistics dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatistics {
    pub range: StatsRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Orders placed in the range, any status.
    pub total_orders: usize,
    /// Order count per status, in lifecycle order, zeros included.
    pub by_status: Vec<(OrderStatus, usize)>,
    /// Orders whose status counts as revenue.
    pub revenue_orders: usize,
    pub revenue: Money,
    pub average_order_value: Money,
    /// Cancelled orders as a percentage of all orders.
    pub cancellation_rate: f64,
    pub series: Vec<SeriesPoint>,
    pub top_products: Vec<ProductSales>,
    pub categories: Vec<CategoryRevenue>,
}

impl OrderStatistics {
    /// Aggregate `orders` over `range`, ending at `today` inclusive.
    #[must_use]
    pub fn compute(orders: &[Order], range: StatsRange, today: NaiveDate) -> Self {
        let earliest = orders.iter().map(|o| o.created_at.date_naive()).min();
        let start = range.start(today, earliest);

        let in_range: Vec<&Order> = orders
            .iter()
            .filter(|o| {
                let day = o.created_at.date_naive();
                day >= start && day <= today
            })
            .collect();

        let by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| (status, in_range.iter().filter(|o| o.status == status).count()))
            .collect::<Vec<_>>();

        let revenue_orders: Vec<&Order> = in_range
            .iter()
            .copied()
            .filter(|o| o.status.counts_as_revenue())
            .collect();
        let revenue: Money = revenue_orders.iter().map(|o| o.total_price).sum();

        let cancelled = in_range
            .iter()
            .filter(|o| o.status == OrderStatus::Cancelled)
            .count();
        #[allow(clippy::cast_precision_loss)] // order counts stay far below f64 precision
        let cancellation_rate = if in_range.is_empty() {
            0.0
        } else {
            cancelled as f64 / in_range.len() as f64 * 100.0
        };

        Self {
            range,
            start,
            end: today,
            total_orders: in_range.len(),
            by_status,
            revenue_orders: revenue_orders.len(),
            revenue,
            average_order_value: revenue.average_over(revenue_orders.len()),
            cancellation_rate,
            series: series(&in_range, range.bucket(), start, today),
            top_products: top_products(&revenue_orders, TOP_PRODUCTS),
            categories: category_revenue(&revenue_orders),
        }
    }

    /// Count for one status.
    #[must_use]
    pub fn status_count(&self, status: OrderStatus) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    }

    /// Largest revenue in the series, for chart scaling.
    #[must_use]
    pub fn peak_revenue(&self) -> Money {
        self.series
            .iter()
            .map(|p| p.revenue)
            .max()
            .unwrap_or(Money::ZERO)
    }
}

fn bucket_label(day: NaiveDate, bucket: Bucket) -> String {
    match bucket {
        Bucket::Day => day.format("%Y-%m-%d").to_string(),
        Bucket::Month => day.format("%Y-%m").to_string(),
    }
}

/// Zero-filled series: every bucket between `start` and `end` is present.
fn series(orders: &[&Order], bucket: Bucket, start: NaiveDate, end: NaiveDate) -> Vec<SeriesPoint> {
    let mut points = Vec::new();
    let mut cursor = match bucket {
        Bucket::Day => start,
        Bucket::Month => start.with_day(1).unwrap_or(start),
    };

    while cursor <= end {
        points.push(SeriesPoint {
            label: bucket_label(cursor, bucket),
            orders: 0,
            revenue: Money::ZERO,
        });
        let next = match bucket {
            Bucket::Day => cursor.succ_opt(),
            Bucket::Month => cursor.checked_add_months(Months::new(1)),
        };
        match next {
            Some(next) => cursor = next,
            None => break,
        }
    }

    for order in orders {
        let label = bucket_label(order.created_at.date_naive(), bucket);
        if let Some(point) = points.iter_mut().find(|p| p.label == label) {
            point.orders += 1;
            if order.status.counts_as_revenue() {
                point.revenue = point.revenue + order.total_price;
            }
        }
    }

    points
}

fn top_products(orders: &[&Order], limit: usize) -> Vec<ProductSales> {
    let mut sales: HashMap<ProductId, ProductSales> = HashMap::new();

    for item in orders.iter().flat_map(|o| &o.items) {
        let entry = sales.entry(item.product_id).or_insert_with(|| ProductSales {
            product_id: item.product_id,
            name: item.name.clone(),
            units: 0,
            revenue: Money::ZERO,
        });
        entry.units += item.quantity;
        entry.revenue = entry.revenue + item.line_total();
    }

    let mut ranked: Vec<ProductSales> = sales.into_values().collect();
    ranked.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}

fn category_revenue(orders: &[&Order]) -> Vec<CategoryRevenue> {
    let mut totals: HashMap<String, Money> = HashMap::new();

    for item in orders.iter().flat_map(|o| &o.items) {
        let name = item
            .category_name
            .clone()
            .unwrap_or_else(|| "Uncategorized".to_string());
        let total = totals.entry(name).or_insert(Money::ZERO);
        *total = *total + item.line_total();
    }

    let grand_total: Money = totals.values().sum();
    let mut categories: Vec<CategoryRevenue> = totals
        .into_iter()
        .map(|(name, revenue)| CategoryRevenue {
            share: if grand_total.is_zero() {
                0.0
            } else {
                revenue.to_f64() / grand_total.to_f64() * 100.0
            },
            name,
            revenue,
        })
        .collect();
    categories.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    categories
}
