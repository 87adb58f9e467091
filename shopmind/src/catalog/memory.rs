//! In-memory catalog fixture for tests and demos.

use async_trait::async_trait;

use super::{
    Catalog, CatalogError, Policy, Product, ProductFilters, Review, ReviewStats, Sentiment,
};

/// [`Catalog`] over plain vectors. Build with the `with_*` methods.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
    reviews: Vec<Review>,
    policies: Vec<Policy>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products.extend(products);
        self
    }

    pub fn with_review(mut self, review: Review) -> Self {
        self.reviews.push(review);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    fn sorted_by_rating(mut products: Vec<Product>, limit: usize) -> Vec<Product> {
        products.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        products.truncate(limit);
        products
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn search_products(
        &self,
        filters: &ProductFilters,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let query = filters.query.as_deref().map(str::to_lowercase);
        let category = filters.category.as_deref().map(str::to_lowercase);
        let matches: Vec<Product> = self
            .products
            .iter()
            .filter(|p| {
                if let Some(ref q) = query {
                    let haystack =
                        format!("{} {} {}", p.name, p.description, p.brand).to_lowercase();
                    if !q.split_whitespace().any(|w| haystack.contains(w)) {
                        return false;
                    }
                }
                if let Some(ref c) = category {
                    if p.category.to_lowercase() != *c {
                        return false;
                    }
                }
                if let Some(min) = filters.min_price {
                    if p.price < min {
                        return false;
                    }
                }
                if let Some(max) = filters.max_price {
                    if p.price > max {
                        return false;
                    }
                }
                if let Some(min) = filters.min_rating {
                    if p.rating < min {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_rating(matches, limit))
    }

    async fn search_products_by_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let needle = name.to_lowercase();
        let matches: Vec<Product> = self
            .products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(Self::sorted_by_rating(matches, limit))
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let mut cats: Vec<String> = self
            .products
            .iter()
            .map(|p| p.category.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        cats.sort();
        Ok(cats)
    }

    async fn review_stats(&self, product_id: &str) -> Result<ReviewStats, CatalogError> {
        let mut stats = ReviewStats::default();
        let mut rating_sum = 0i64;
        for r in self.reviews.iter().filter(|r| r.product_id == product_id) {
            stats.total += 1;
            rating_sum += r.rating;
            match r.sentiment {
                Sentiment::Positive => stats.positive += 1,
                Sentiment::Negative => stats.negative += 1,
                Sentiment::Neutral => stats.neutral += 1,
            }
        }
        if stats.total > 0 {
            stats.average_rating = rating_sum as f64 / stats.total as f64;
        }
        Ok(stats)
    }

    async fn review_samples(
        &self,
        product_id: &str,
        sentiment: Sentiment,
        limit: usize,
    ) -> Result<Vec<Review>, CatalogError> {
        let mut samples: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id && r.sentiment == sentiment)
            .cloned()
            .collect();
        samples.sort_by(|a, b| b.date.cmp(&a.date));
        samples.truncate(limit);
        Ok(samples)
    }

    async fn policies(&self) -> Result<Vec<Policy>, CatalogError> {
        Ok(self.policies.clone())
    }

    async fn policy_count(&self) -> Result<usize, CatalogError> {
        Ok(self.policies.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(id: &str, name: &str, price: f64, rating: f64) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            description: "a phone".into(),
            price,
            brand: "Acme".into(),
            category: "smartphones".into(),
            stock: 10,
            rating,
            image_url: None,
        }
    }

    /// **Scenario**: Filters combine (price band + category) and results come
    /// back best rating first.
    #[tokio::test]
    async fn search_products_applies_filters_and_sorts() {
        let catalog = InMemoryCatalog::new()
            .with_product(phone("p1", "Budget One", 199.0, 4.1))
            .with_product(phone("p2", "Flagship X", 999.0, 4.8))
            .with_product(phone("p3", "Mid Two", 450.0, 4.6));

        let filters = ProductFilters {
            max_price: Some(500.0),
            category: Some("smartphones".into()),
            ..Default::default()
        };
        let hits = catalog.search_products(&filters, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "p3");
        assert_eq!(hits[1].id, "p1");
    }

    /// **Scenario**: Name search is a case-insensitive substring match.
    #[tokio::test]
    async fn name_search_is_case_insensitive() {
        let catalog = InMemoryCatalog::new().with_product(phone("p1", "Flagship X", 999.0, 4.8));
        let hits = catalog.search_products_by_name("flagship", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    /// **Scenario**: Review stats aggregate counts and average; empty set is
    /// all zeros.
    #[tokio::test]
    async fn review_stats_aggregate() {
        let catalog = InMemoryCatalog::new()
            .with_review(Review {
                product_id: "p1".into(),
                rating: 5,
                text: "great".into(),
                date: "2025-05-01".into(),
                sentiment: Sentiment::Positive,
            })
            .with_review(Review {
                product_id: "p1".into(),
                rating: 2,
                text: "meh".into(),
                date: "2025-05-02".into(),
                sentiment: Sentiment::Negative,
            });

        let stats = catalog.review_stats("p1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.negative, 1);
        assert!((stats.average_rating - 3.5).abs() < 1e-9);

        let empty = catalog.review_stats("nope").await.unwrap();
        assert_eq!(empty.total, 0);
        assert_eq!(empty.average_rating, 0.0);
    }

    /// **Scenario**: Samples filter by sentiment, newest first, capped.
    #[tokio::test]
    async fn review_samples_filter_and_cap() {
        let mut catalog = InMemoryCatalog::new();
        for i in 0..4 {
            catalog = catalog.with_review(Review {
                product_id: "p1".into(),
                rating: 5,
                text: format!("pos {}", i),
                date: format!("2025-05-0{}", i + 1),
                sentiment: Sentiment::Positive,
            });
        }
        let samples = catalog
            .review_samples("p1", Sentiment::Positive, 2)
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].text, "pos 3");
    }

    /// **Scenario**: Categories are distinct and sorted.
    #[tokio::test]
    async fn categories_are_distinct() {
        let catalog = InMemoryCatalog::new()
            .with_product(phone("p1", "A", 1.0, 4.0))
            .with_product(phone("p2", "B", 2.0, 4.0));
        assert_eq!(catalog.categories().await.unwrap(), vec!["smartphones"]);
    }
}
