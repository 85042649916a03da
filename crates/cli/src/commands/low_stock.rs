//! Low stock report.

use std::io::Write;

use atelier_client::ApiClient;
use atelier_core::catalog::{MAX_PAGE_SIZE, Product, ProductQuery};

use super::CliError;

/// A product at or below the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockRow {
    pub product_id: i32,
    pub name: String,
    pub total: u32,
    /// Variants with nothing left, as `size/color`.
    pub sold_out: Vec<String>,
}

/// Products whose total stock is at most `threshold`, emptiest first.
#[must_use]
pub fn low_stock(products: &[Product], threshold: u32) -> Vec<LowStockRow> {
    let mut rows: Vec<LowStockRow> = products
        .iter()
        .filter(|p| p.total_stock() <= threshold)
        .map(|p| LowStockRow {
            product_id: p.id.as_i32(),
            name: p.name.clone(),
            total: p.total_stock(),
            sold_out: p
                .variants
                .iter()
                .filter(|v| v.stock == 0)
                .map(|v| format!("{}/{}", v.size, v.color))
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| a.total.cmp(&b.total).then(a.product_id.cmp(&b.product_id)));
    rows
}

/// Every product in the catalog, one listing page at a time.
///
/// Stops at the last page, at an empty page, or when the backend answers
/// with an earlier page than the one asked for.
///
/// # Errors
///
/// Returns the upstream error.
pub async fn all_products(api: &ApiClient) -> Result<Vec<Product>, CliError> {
    let query = ProductQuery {
        page_size: Some(MAX_PAGE_SIZE),
        ..ProductQuery::default()
    };

    let mut products = Vec::new();
    let mut page_number = 1;
    loop {
        let page = api.products(&query.with_page(page_number)).await?;
        if page.items.is_empty() || page.page < page_number {
            break;
        }
        let has_next = page.has_next();
        products.extend(page.items);
        if !has_next {
            break;
        }
        page_number += 1;
    }
    tracing::info!(products = products.len(), pages = page_number, "Scanned catalog");
    Ok(products)
}

/// Walk the whole catalog and print products running low.
///
/// # Errors
///
/// Returns upstream or write errors.
pub async fn run(api: &ApiClient, threshold: u32, out: &mut impl Write) -> Result<(), CliError> {
    let products = all_products(api).await?;

    let rows = low_stock(&products, threshold);
    if rows.is_empty() {
        writeln!(out, "No products at or below {threshold} units.")?;
        return Ok(());
    }

    writeln!(out, "{} products at or below {threshold} units:", rows.len())?;
    for row in rows {
        write!(out, "  #{:<6} {:<32} {:>4}", row.product_id, row.name, row.total)?;
        if !row.sold_out.is_empty() {
            write!(out, "  sold out: {}", row.sold_out.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    fn product(id: i32, variants: &[(&str, &str, u32)]) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("Item {id}"),
            "brand": {"id": 1, "name": "Maison"},
            "category": {"id": 1, "name": "Tops"},
            "price": "20.00",
            "variants": variants
                .iter()
                .map(|(size, color, stock)| serde_json::json!({"size": size, "color": color, "stock": stock}))
                .collect::<Vec<_>>(),
            "created_at": "2026-01-01T00:00:00Z"
        })
    }

    fn parse(values: &[serde_json::Value]) -> Vec<Product> {
        serde_json::from_value(serde_json::Value::Array(values.to_vec())).unwrap()
    }

    #[test]
    fn test_low_stock_filters_and_sorts() {
        let products = parse(&[
            product(1, &[("S", "red", 10)]),
            product(2, &[("S", "red", 3), ("M", "red", 0)]),
            product(3, &[("L", "blue", 0)]),
        ]);

        let rows = low_stock(&products, 5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, 3);
        assert_eq!(rows[0].sold_out, ["L/blue"]);
        assert_eq!(rows[1].product_id, 2);
        assert_eq!(rows[1].total, 3);
        assert_eq!(rows[1].sold_out, ["M/red"]);
    }

    #[tokio::test]
    async fn test_walks_every_page() {
        let mut server = Server::new_async().await;
        let page = |n: u32, items: Vec<serde_json::Value>| {
            serde_json::json!({"items": items, "page": n, "pages": 2, "total": 2}).to_string()
        };
        server
            .mock("GET", "/products")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("content-type", "application/json")
            .with_body(page(1, vec![product(1, &[("S", "red", 1)])]))
            .create_async()
            .await;
        server
            .mock("GET", "/products")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("content-type", "application/json")
            .with_body(page(2, vec![product(2, &[("S", "red", 50)])]))
            .create_async()
            .await;

        let client = crate::commands::tests::client_for(&server);
        let mut out = Vec::new();
        run(&client, 5, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("1 products at or below 5 units:"));
        assert!(text.contains("Item 1"));
        assert!(!text.contains("Item 2"));
    }

    #[tokio::test]
    async fn test_stops_when_backend_ignores_page_parameter() {
        let mut server = Server::new_async().await;
        let listing = server
            .mock("GET", "/products")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "items": [product(1, &[("S", "red", 1)])],
                    "page": 1,
                    "pages": 3,
                    "total": 3
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = crate::commands::tests::client_for(&server);
        let products = all_products(&client).await.unwrap();
        assert_eq!(products.len(), 1);
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn test_requests_the_largest_page_size() {
        let mut server = Server::new_async().await;
        let listing = server
            .mock("GET", "/products")
            .match_query(Matcher::UrlEncoded(
                "page_size".into(),
                MAX_PAGE_SIZE.to_string(),
            ))
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [], "page": 1, "pages": 0, "total": 0}"#)
            .create_async()
            .await;

        let client = crate::commands::tests::client_for(&server);
        assert!(all_products(&client).await.unwrap().is_empty());
        listing.assert_async().await;
    }
}
