use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{
    models::{
        CatalogFixture, Product, ProductSearch, Term, PRODUCT_CATEGORY_TAXONOMY, STATUS_PUBLISH,
    },
    CatalogBackend,
};

type ProductRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// SQLite implementation of CatalogBackend
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("Connecting to SQLite catalog: {}", database_url);

        // Parse connection options and enable create_if_missing
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database is its own database
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect_options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(connect_options)
                .await?
        };

        // Run migrations
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS taxonomies (
                name TEXT PRIMARY KEY
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS terms (
                id INTEGER PRIMARY KEY,
                taxonomy TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                UNIQUE (taxonomy, slug)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        // Create index on taxonomy for term lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_terms_taxonomy ON terms(taxonomy)
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'publish',
                price TEXT,
                price_html TEXT,
                thumbnail TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS product_terms (
                product_id INTEGER NOT NULL,
                term_id INTEGER NOT NULL,
                PRIMARY KEY (product_id, term_id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        // Create index on term_id for category and visibility filters
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_product_terms_term ON product_terms(term_id)
            "#,
        )
        .execute(&pool)
        .await?;

        info!("SQLite catalog initialized successfully");

        Ok(Self { pool })
    }

    /// Register a taxonomy name
    pub async fn register_taxonomy(&self, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO taxonomies (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert or replace a term; its taxonomy is registered if needed
    pub async fn upsert_term(&self, term: &Term) -> Result<()> {
        self.register_taxonomy(&term.taxonomy).await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO terms (id, taxonomy, name, slug, count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(term.id)
        .bind(&term.taxonomy)
        .bind(&term.name)
        .bind(&term.slug)
        .bind(term.count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a product and attach it to its `taxonomy:slug` terms
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO products (id, title, slug, content, status, price, price_html, thumbnail)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.content)
        .bind(&product.status)
        .bind(&product.price)
        .bind(&product.price_html)
        .bind(&product.thumbnail)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM product_terms WHERE product_id = ?")
            .bind(product.id)
            .execute(&self.pool)
            .await?;

        for reference in &product.terms {
            let Some((taxonomy, slug)) = reference.split_once(':') else {
                warn!("Product {} has malformed term reference {:?}", product.id, reference);
                continue;
            };

            match self.term_id_by_slug(taxonomy, slug).await? {
                Some(term_id) => {
                    sqlx::query(
                        "INSERT OR IGNORE INTO product_terms (product_id, term_id) VALUES (?, ?)",
                    )
                    .bind(product.id)
                    .bind(term_id)
                    .execute(&self.pool)
                    .await?;
                }
                None => warn!("Product {} references unknown term {}", product.id, reference),
            }
        }

        Ok(())
    }

    /// Recount terms that have products attached, counting published products only
    pub async fn refresh_term_counts(&self) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE terms
            SET count = (
                SELECT COUNT(*)
                FROM product_terms pt
                JOIN products p ON p.id = pt.product_id
                WHERE pt.term_id = terms.id AND p.status = ?
            )
            WHERE id IN (SELECT term_id FROM product_terms)
            "#,
        )
        .bind(STATUS_PUBLISH)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a whole fixture: taxonomies, then terms, then products
    pub async fn load_fixture(&self, fixture: &CatalogFixture) -> Result<()> {
        for taxonomy in &fixture.taxonomies {
            self.register_taxonomy(taxonomy).await?;
        }
        for term in &fixture.terms {
            self.upsert_term(term).await?;
        }
        for product in &fixture.products {
            self.upsert_product(product).await?;
        }
        self.refresh_term_counts().await?;

        info!(
            "Loaded fixture with {} taxonomies, {} terms, {} products",
            fixture.taxonomies.len(),
            fixture.terms.len(),
            fixture.products.len()
        );
        Ok(())
    }
}

/// Wrap `text` in a LIKE substring pattern, escaping LIKE metacharacters with `\`
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl CatalogBackend for SqliteCatalog {
    async fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, (String,)>("SELECT name FROM taxonomies WHERE name = ?")
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn search_terms(&self, taxonomy: &str, text: &str, limit: u32) -> Result<Vec<Term>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, i64)>(
            r#"
            SELECT id, taxonomy, name, slug, count
            FROM terms
            WHERE taxonomy = ? AND count > 0 AND name LIKE ? ESCAPE '\'
            ORDER BY name ASC
            LIMIT ?
            "#,
        )
        .bind(taxonomy)
        .bind(like_pattern(text))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        debug!("Term search in {} for {:?}: {} hits", taxonomy, text, rows.len());

        Ok(rows
            .into_iter()
            .map(|(id, taxonomy, name, slug, count)| Term {
                id,
                taxonomy,
                name,
                slug,
                count,
            })
            .collect())
    }

    async fn term_id_by_slug(&self, taxonomy: &str, slug: &str) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM terms WHERE taxonomy = ? AND slug = ?")
            .bind(taxonomy)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn search_products(&self, search: &ProductSearch) -> Result<Vec<Product>> {
        let words: Vec<&str> = search.text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.title, p.slug, p.content, p.status, p.price, p.price_html, p.thumbnail \
             FROM products p WHERE p.status = ",
        );
        query.push_bind(STATUS_PUBLISH);

        // Every word must appear in the title or the description
        for word in &words {
            let pattern = like_pattern(word);
            query.push(" AND (p.title LIKE ");
            query.push_bind(pattern.clone());
            query.push(" ESCAPE '\\' OR p.content LIKE ");
            query.push_bind(pattern);
            query.push(" ESCAPE '\\')");
        }

        if let Some(slug) = &search.category_slug {
            query.push(
                " AND EXISTS (SELECT 1 FROM product_terms pt JOIN terms t ON t.id = pt.term_id \
                 WHERE pt.product_id = p.id AND t.taxonomy = ",
            );
            query.push_bind(PRODUCT_CATEGORY_TAXONOMY);
            query.push(" AND t.slug = ");
            query.push_bind(slug.clone());
            query.push(")");
        }

        if let Some(term_id) = search.exclude_term_id {
            query.push(
                " AND NOT EXISTS (SELECT 1 FROM product_terms pt WHERE pt.product_id = p.id AND pt.term_id = ",
            );
            query.push_bind(term_id);
            query.push(")");
        }

        // Whole-phrase title matches first, then newest
        query.push(" ORDER BY (p.title LIKE ");
        query.push_bind(like_pattern(&search.text));
        query.push(" ESCAPE '\\') DESC, p.id DESC LIMIT ");
        query.push_bind(i64::from(search.limit));

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!("Product search for {:?}: {} hits", search.text, rows.len());

        Ok(rows
            .into_iter()
            .map(
                |(id, title, slug, content, status, price, price_html, thumbnail)| Product {
                    id,
                    title,
                    slug,
                    content,
                    status,
                    price,
                    price_html,
                    thumbnail,
                    terms: Vec::new(),
                },
            )
            .collect())
    }
}
