//! Keyed query cache with invalidation rules.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use atelier_core::catalog::{Brand, Category, Page, Product, ProductQuery, Review};
use atelier_core::recommend::{RecommendationModel, ScoredProduct};
use atelier_core::{ProductId, UserId};

use crate::error::ApiError;

/// One cached read.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products(ProductQuery),
    TopProducts,
    Brands,
    Categories,
    Reviews(ProductId),
    Favorites(UserId),
    Similar {
        product: ProductId,
        model: RecommendationModel,
    },
    Outfit {
        product: ProductId,
        model: RecommendationModel,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    ProductList(Vec<Product>),
    Brands(Vec<Brand>),
    Categories(Vec<Category>),
    Reviews(Vec<Review>),
    Scored(Vec<ScoredProduct>),
}

/// Which cached reads a mutation makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// A product was created, updated or deleted.
    Product(ProductId),
    /// A review was posted for a product.
    Review(ProductId),
    /// A brand was created, renamed or deleted.
    Brands,
    /// A category was created, renamed or deleted.
    Categories,
    /// A user's favorites changed.
    Favorites(UserId),
}

impl Invalidation {
    /// Whether `key` is stale after this mutation.
    #[must_use]
    pub fn matches(&self, key: &CacheKey) -> bool {
        match (self, key) {
            (
                Self::Product(id),
                CacheKey::Product(k)
                | CacheKey::Similar { product: k, .. }
                | CacheKey::Outfit { product: k, .. },
            ) => id == k,
            (Self::Product(_), CacheKey::Products(_) | CacheKey::TopProducts) => true,
            (Self::Review(id), CacheKey::Reviews(k) | CacheKey::Product(k)) => id == k,
            (Self::Review(_), CacheKey::TopProducts) => true,
            // Products embed brand and category names.
            (Self::Brands, CacheKey::Brands)
            | (Self::Categories, CacheKey::Categories)
            | (
                Self::Brands | Self::Categories,
                CacheKey::Products(_) | CacheKey::Product(_) | CacheKey::TopProducts,
            ) => true,
            (Self::Favorites(user), CacheKey::Favorites(k)) => user == k,
            _ => false,
        }
    }
}

/// Conversion between a typed read and its [`CacheValue`].
pub(crate) trait Cached: Sized {
    fn into_value(self) -> CacheValue;
    fn from_value(value: CacheValue) -> Option<Self>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_value(self) -> CacheValue {
                CacheValue::$variant(self)
            }

            fn from_value(value: CacheValue) -> Option<Self> {
                match value {
                    CacheValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

cached!(Page<Product>, Products);
cached!(Vec<Product>, ProductList);
cached!(Vec<Brand>, Brands);
cached!(Vec<Category>, Categories);
cached!(Vec<Review>, Reviews);
cached!(Vec<ScoredProduct>, Scored);

impl Cached for Product {
    fn into_value(self) -> CacheValue {
        CacheValue::Product(Box::new(self))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Product(p) => Some(*p),
            _ => None,
        }
    }
}

/// Read-through cache shared by every request.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl QueryCache {
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    /// Return the cached value for `key`, or run `fetch` to fill it.
    ///
    /// Concurrent callers missing on the same key wait for a single fetch.
    /// Failures are not cached.
    pub(crate) async fn get_or_fetch<T, F>(&self, key: CacheKey, fetch: F) -> Result<T, ApiError>
    where
        T: Cached,
        F: Future<Output = Result<T, ApiError>> + Send,
    {
        let value = self
            .cache
            .try_get_with(key.clone(), async move { fetch.await.map(Cached::into_value) })
            .await
            .map_err(|err| (*err).clone())?;

        if let Some(typed) = T::from_value(value) {
            return Ok(typed);
        }

        warn!(?key, "Cached value has unexpected type, evicting");
        self.cache.invalidate(&key).await;
        Err(ApiError::Status {
            status: 500,
            message: "cache entry type mismatch".to_string(),
        })
    }

    /// Drop every entry the mutation made stale.
    pub fn invalidate(&self, rule: Invalidation) {
        debug!(?rule, "Invalidating cached reads");
        if let Err(e) = self.cache.invalidate_entries_if(move |key, _| rule.matches(key)) {
            warn!(error = %e, "Predicate invalidation failed, clearing cache");
            self.cache.invalidate_all();
        }
    }

    /// Flush moka's pending maintenance, so counts are exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub(crate) async fn contains(&self, key: &CacheKey) -> bool {
        self.cache.get(key).await.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pid(id: i32) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_product_change_rules() {
        let rule = Invalidation::Product(pid(1));
        assert!(rule.matches(&CacheKey::Product(pid(1))));
        assert!(!rule.matches(&CacheKey::Product(pid(2))));
        assert!(rule.matches(&CacheKey::Products(ProductQuery::default())));
        assert!(rule.matches(&CacheKey::TopProducts));
        assert!(rule.matches(&CacheKey::Similar {
            product: pid(1),
            model: RecommendationModel::Gnn
        }));
        assert!(!rule.matches(&CacheKey::Outfit {
            product: pid(2),
            model: RecommendationModel::Hybrid
        }));
        assert!(!rule.matches(&CacheKey::Brands));
    }

    #[test]
    fn test_review_rules() {
        let rule = Invalidation::Review(pid(3));
        assert!(rule.matches(&CacheKey::Reviews(pid(3))));
        assert!(rule.matches(&CacheKey::Product(pid(3))));
        assert!(rule.matches(&CacheKey::TopProducts));
        assert!(!rule.matches(&CacheKey::Reviews(pid(4))));
        assert!(!rule.matches(&CacheKey::Products(ProductQuery::default())));
    }

    #[test]
    fn test_taxonomy_and_favorites_rules() {
        assert!(Invalidation::Brands.matches(&CacheKey::Brands));
        assert!(!Invalidation::Brands.matches(&CacheKey::Categories));
        assert!(Invalidation::Categories.matches(&CacheKey::Products(ProductQuery::default())));

        let user = UserId::new(9);
        assert!(Invalidation::Favorites(user).matches(&CacheKey::Favorites(user)));
        assert!(!Invalidation::Favorites(user).matches(&CacheKey::Favorites(UserId::new(1))));
        assert!(!Invalidation::Favorites(user).matches(&CacheKey::TopProducts));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let result: Result<Vec<Brand>, _> = cache
                .get_or_fetch(CacheKey::Brands, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::NotFound("nope".to_string()))
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_matching_entries() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        let _: Vec<Brand> = cache
            .get_or_fetch(CacheKey::Brands, async { Ok(Vec::new()) })
            .await
            .unwrap();
        let _: Vec<Category> = cache
            .get_or_fetch(CacheKey::Categories, async { Ok(Vec::new()) })
            .await
            .unwrap();

        cache.invalidate(Invalidation::Brands);

        assert!(!cache.contains(&CacheKey::Brands).await);
        assert!(cache.contains(&CacheKey::Categories).await);
    }
}
