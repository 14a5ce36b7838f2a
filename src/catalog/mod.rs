pub mod models;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use models::{Product, ProductSearch, Term};

/// Read-only view of the product catalog used by the search aggregator
/// This allows swapping catalog implementations (SQLite, a remote shop API, ...)
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Whether a taxonomy with this exact name is registered
    async fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool>;

    /// Non-empty terms of `taxonomy` whose name contains `text`, at most `limit`
    async fn search_terms(&self, taxonomy: &str, text: &str, limit: u32) -> Result<Vec<Term>>;

    /// Id of a term looked up by taxonomy and slug
    async fn term_id_by_slug(&self, taxonomy: &str, slug: &str) -> Result<Option<i64>>;

    /// Published products matching the search filters
    async fn search_products(&self, search: &ProductSearch) -> Result<Vec<Product>>;
}
