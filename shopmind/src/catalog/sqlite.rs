//! SQLite catalog adapter.
//!
//! Read-only over the collaborator's schema: `products`, `reviews`,
//! `policies`. Opens a connection per query inside `spawn_blocking` so the
//! async runtime never blocks on SQLite I/O.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::params;

use super::{
    Catalog, CatalogError, Policy, Product, ProductFilters, Review, ReviewStats, Sentiment,
};

/// [`Catalog`] over an SQLite file.
pub struct SqliteCatalog {
    db_path: PathBuf,
}

fn query_err(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Query(e.to_string())
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        price: row.get("price")?,
        brand: row.get("brand")?,
        category: row.get("category")?,
        stock: row.get("stock")?,
        rating: row.get("rating")?,
        image_url: row.get("image_url")?,
    })
}

fn parse_sentiment(raw: &str) -> Sentiment {
    match raw {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

impl SqliteCatalog {
    /// Opens the catalog at `path`, verifying the file is readable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        // Probe one table so a wrong path fails at startup, not mid-turn.
        conn.prepare("SELECT COUNT(*) FROM products")
            .map_err(|e| CatalogError::Unavailable(format!("missing products table: {}", e)))?;
        Ok(Self { db_path })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, CatalogError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| CatalogError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn search_products(
        &self,
        filters: &ProductFilters,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let filters = filters.clone();
        self.with_conn(move |conn| {
            let mut sql = String::from(
                "SELECT id, name, description, price, brand, category, stock, rating, image_url \
                 FROM products WHERE 1=1",
            );
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(q) = &filters.query {
                sql.push_str(" AND (name LIKE ?1 OR description LIKE ?1 OR brand LIKE ?1)");
                args.push(Box::new(format!("%{}%", q)));
            }
            if let Some(c) = &filters.category {
                sql.push_str(&format!(" AND LOWER(category) = LOWER(?{})", args.len() + 1));
                args.push(Box::new(c.clone()));
            }
            if let Some(min) = filters.min_price {
                sql.push_str(&format!(" AND price >= ?{}", args.len() + 1));
                args.push(Box::new(min));
            }
            if let Some(max) = filters.max_price {
                sql.push_str(&format!(" AND price <= ?{}", args.len() + 1));
                args.push(Box::new(max));
            }
            if let Some(min) = filters.min_rating {
                sql.push_str(&format!(" AND rating >= ?{}", args.len() + 1));
                args.push(Box::new(min));
            }
            sql.push_str(&format!(" ORDER BY rating DESC LIMIT ?{}", args.len() + 1));
            args.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql).map_err(query_err)?;
            let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
            let rows = stmt
                .query_map(params.as_slice(), row_to_product)
                .map_err(query_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
        })
        .await
    }

    async fn search_products_by_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let pattern = format!("%{}%", name);
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, description, price, brand, category, stock, rating, image_url \
                     FROM products WHERE name LIKE ?1 COLLATE NOCASE \
                     ORDER BY rating DESC LIMIT ?2",
                )
                .map_err(query_err)?;
            let rows = stmt
                .query_map(params![pattern, limit as i64], row_to_product)
                .map_err(query_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
        })
        .await
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, description, price, brand, category, stock, rating, image_url \
                     FROM products WHERE id = ?1",
                )
                .map_err(query_err)?;
            let mut rows = stmt.query_map(params![id], row_to_product).map_err(query_err)?;
            match rows.next() {
                Some(row) => Ok(Some(row.map_err(query_err)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT DISTINCT category FROM products ORDER BY category")
                .map_err(query_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(query_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
        })
        .await
    }

    async fn review_stats(&self, product_id: &str) -> Result<ReviewStats, CatalogError> {
        let product_id = product_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(AVG(rating), 0.0), \
                 COALESCE(SUM(CASE WHEN sentiment = 'positive' THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN sentiment = 'negative' THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN sentiment = 'neutral' THEN 1 ELSE 0 END), 0) \
                 FROM reviews WHERE product_id = ?1",
                params![product_id],
                |row| {
                    Ok(ReviewStats {
                        total: row.get(0)?,
                        average_rating: row.get(1)?,
                        positive: row.get(2)?,
                        negative: row.get(3)?,
                        neutral: row.get(4)?,
                    })
                },
            )
            .map_err(query_err)
        })
        .await
    }

    async fn review_samples(
        &self,
        product_id: &str,
        sentiment: Sentiment,
        limit: usize,
    ) -> Result<Vec<Review>, CatalogError> {
        let product_id = product_id.to_string();
        let sentiment_str = sentiment.as_str().to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT product_id, rating, text, date, sentiment FROM reviews \
                     WHERE product_id = ?1 AND sentiment = ?2 \
                     ORDER BY date DESC LIMIT ?3",
                )
                .map_err(query_err)?;
            let rows = stmt
                .query_map(params![product_id, sentiment_str, limit as i64], |row| {
                    let raw: String = row.get(4)?;
                    Ok(Review {
                        product_id: row.get(0)?,
                        rating: row.get(1)?,
                        text: row.get(2)?,
                        date: row.get(3)?,
                        sentiment: parse_sentiment(&raw),
                    })
                })
                .map_err(query_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
        })
        .await
    }

    async fn policies(&self) -> Result<Vec<Policy>, CatalogError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT policy_type, description, conditions, timeframe FROM policies")
                .map_err(query_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Policy {
                        policy_type: row.get(0)?,
                        description: row.get(1)?,
                        conditions: row.get(2)?,
                        timeframe: row.get(3)?,
                    })
                })
                .map_err(query_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
        })
        .await
    }

    async fn policy_count(&self) -> Result<usize, CatalogError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM policies", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .map_err(query_err)
        })
        .await
    }
}
