//! Recommendation panel assembly.
//!
//! The recommendation service only returns scored product IDs. The panels on
//! the product page hydrate those IDs with catalog data and then filter and
//! group them: "You might also like" is a ranked list of similar items,
//! "Complete the look" picks one piece per complementary category.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{CategoryId, Money, ProductId};

/// Which model the recommendation service should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationModel {
    /// Graph neural network over co-purchase data.
    Gnn,
    /// Blend of collaborative and content signals.
    #[default]
    Hybrid,
    /// Content-based filtering on product attributes.
    Cbf,
}

impl RecommendationModel {
    /// Parse a query value, falling back to the default model.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("gnn") => Self::Gnn,
            Some("cbf") => Self::Cbf,
            _ => Self::Hybrid,
        }
    }

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gnn => "gnn",
            Self::Hybrid => "hybrid",
            Self::Cbf => "cbf",
        }
    }
}

/// A product ID with a relevance score from the recommendation service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product_id: ProductId,
    pub score: f32,
}

/// A hydrated recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub product: Product,
    pub score: f32,
}

/// One piece of a suggested outfit.
#[derive(Debug, Clone, PartialEq)]
pub struct OutfitSlot {
    pub category_id: CategoryId,
    pub category_name: String,
    pub product: Product,
    pub score: f32,
}

/// A suggested outfit around a source product.
#[derive(Debug, Clone, PartialEq)]
pub struct Outfit {
    pub source: ProductId,
    pub slots: Vec<OutfitSlot>,
    /// Sale price of the source product plus every slot.
    pub bundle_price: Money,
}

impl Outfit {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Keep the best score per product ID and drop the source product.
fn best_scores(source: ProductId, scored: &[ScoredProduct]) -> HashMap<ProductId, f32> {
    let mut best: HashMap<ProductId, f32> = HashMap::new();
    for candidate in scored.iter().filter(|c| c.product_id != source) {
        best.entry(candidate.product_id)
            .and_modify(|s| *s = s.max(candidate.score))
            .or_insert(candidate.score);
    }
    best
}

fn by_score_then_id(a: (f32, ProductId), b: (f32, ProductId)) -> std::cmp::Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

/// Build the "You might also like" list.
///
/// IDs the catalog no longer knows and out-of-stock products are dropped,
/// duplicates keep their best score, and the result is ordered by score
/// (ties broken by ID) and truncated to `limit`.
#[must_use]
pub fn rank_similar(
    source: ProductId,
    scored: &[ScoredProduct],
    products: &[Product],
    limit: usize,
) -> Vec<Recommendation> {
    let best = best_scores(source, scored);

    let mut ranked: Vec<Recommendation> = products
        .iter()
        .filter(|p| p.in_stock())
        .filter_map(|p| {
            best.get(&p.id).map(|score| Recommendation {
                product: p.clone(),
                score: *score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| by_score_then_id((a.score, a.product.id), (b.score, b.product.id)));
    ranked.dedup_by_key(|r| r.product.id);
    ranked.truncate(limit);
    ranked
}

/// Build the "Complete the look" outfit.
///
/// Candidates in the source product's own category are skipped (nobody
/// needs a second pair of jeans to go with the first), then the best
/// in-stock candidate per remaining category becomes a slot. Slots are
/// ordered by score.
#[must_use]
pub fn assemble_outfit(source: &Product, scored: &[ScoredProduct], products: &[Product]) -> Outfit {
    let best = best_scores(source.id, scored);
    let mut per_category: HashMap<CategoryId, OutfitSlot> = HashMap::new();

    for product in products
        .iter()
        .filter(|p| p.in_stock() && p.category.id != source.category.id)
    {
        let Some(score) = best.get(&product.id).copied() else {
            continue;
        };
        let better = per_category
            .get(&product.category.id)
            .is_none_or(|current| {
                by_score_then_id((score, product.id), (current.score, current.product.id)).is_lt()
            });
        if better {
            per_category.insert(
                product.category.id,
                OutfitSlot {
                    category_id: product.category.id,
                    category_name: product.category.name.clone(),
                    product: product.clone(),
                    score,
                },
            );
        }
    }

    let mut slots: Vec<OutfitSlot> = per_category.into_values().collect();
    slots.sort_by(|a, b| by_score_then_id((a.score, a.product.id), (b.score, b.product.id)));

    let bundle_price =
        source.sale_price() + slots.iter().map(|s| s.product.sale_price()).sum::<Money>();

    Outfit {
        source: source.id,
        slots,
        bundle_price,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    fn scored(pairs: &[(i32, f32)]) -> Vec<ScoredProduct> {
        pairs
            .iter()
            .map(|(id, score)| ScoredProduct {
                product_id: ProductId::new(*id),
                score: *score,
            })
            .collect()
    }

    #[test]
    fn test_model_param() {
        assert_eq!(RecommendationModel::from_param(Some("gnn")), RecommendationModel::Gnn);
        assert_eq!(RecommendationModel::from_param(Some("nope")), RecommendationModel::Hybrid);
        assert_eq!(RecommendationModel::Cbf.as_str(), "cbf");
    }

    #[test]
    fn test_rank_similar_filters_and_orders() {
        let products = vec![
            product(1, 1, &[("M", "black", 1)]), // source
            product(2, 1, &[("M", "black", 1)]),
            product(3, 1, &[("M", "black", 0)]), // sold out
            product(4, 2, &[("M", "black", 1)]),
            product(5, 2, &[("M", "black", 1)]),
        ];
        let scores = scored(&[(1, 0.99), (2, 0.4), (3, 0.9), (4, 0.7), (2, 0.8), (5, 0.7), (9, 1.0)]);

        let ranked = rank_similar(ProductId::new(1), &scores, &products, 10);
        let ids: Vec<i32> = ranked.iter().map(|r| r.product.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 4, 5]);
        assert!((ranked[0].score - 0.8).abs() < f32::EPSILON);

        let limited = rank_similar(ProductId::new(1), &scores, &products, 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_outfit_one_slot_per_other_category() {
        let source = product(1, 1, &[("M", "blue", 3)]); // jeans
        let products = vec![
            product(2, 1, &[("M", "blue", 3)]), // more jeans, skipped
            product(3, 2, &[("M", "white", 3)]),
            product(4, 2, &[("M", "white", 3)]),
            product(5, 3, &[("42", "brown", 1)]),
            product(6, 4, &[("OS", "red", 0)]), // sold out
        ];
        let scores = scored(&[(2, 0.99), (3, 0.5), (4, 0.6), (5, 0.9), (6, 0.95)]);

        let outfit = assemble_outfit(&source, &scores, &products);
        let picks: Vec<(i32, i32)> = outfit
            .slots
            .iter()
            .map(|s| (s.category_id.as_i32(), s.product.id.as_i32()))
            .collect();
        assert_eq!(picks, vec![(3, 5), (2, 4)]);
        // source plus two slots at 50.00 each
        assert_eq!(outfit.bundle_price, Money::from_cents(15_000));
    }

    #[test]
    fn test_outfit_empty_when_nothing_matches() {
        let source = product(1, 1, &[("M", "blue", 3)]);
        let outfit = assemble_outfit(&source, &scored(&[(1, 1.0)]), &[source.clone()]);
        assert!(outfit.is_empty());
        assert_eq!(outfit.bundle_price, source.sale_price());
    }
}
