use serde::{Deserialize, Serialize};

/// Taxonomy holding product categories
pub const PRODUCT_CATEGORY_TAXONOMY: &str = "product_cat";

/// Taxonomy holding visibility flags
pub const PRODUCT_VISIBILITY_TAXONOMY: &str = "product_visibility";

/// Visibility term that hides a product from search
pub const EXCLUDE_FROM_SEARCH: &str = "exclude-from-search";

/// Status of products visible on the storefront
pub const STATUS_PUBLISH: &str = "publish";

/// A taxonomy term (brand, collection, reference number, category, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: i64,

    /// Taxonomy this term belongs to
    pub taxonomy: String,

    pub name: String,

    pub slug: String,

    /// Number of products attached to the term
    #[serde(default)]
    pub count: i64,
}

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,

    pub title: String,

    pub slug: String,

    /// Long description, searched alongside the title
    #[serde(default)]
    pub content: String,

    /// Publication status; only "publish" is searchable
    #[serde(default = "default_status")]
    pub status: String,

    /// Raw active price, e.g. "1250" or "99.5"
    #[serde(default)]
    pub price: Option<String>,

    /// Pre-rendered price markup (ranges for variable products)
    #[serde(default)]
    pub price_html: Option<String>,

    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Slugs of terms attached to this product, as `taxonomy:slug`
    #[serde(default)]
    pub terms: Vec<String>,
}

fn default_status() -> String {
    STATUS_PUBLISH.to_string()
}

/// Filters for a product search
#[derive(Debug, Clone)]
pub struct ProductSearch {
    /// Normalized search text
    pub text: String,
    /// Restrict to products in this `product_cat` slug
    pub category_slug: Option<String>,
    /// Skip products attached to this term id
    pub exclude_term_id: Option<i64>,
    pub limit: u32,
}

/// JSON fixture accepted by the `seed` command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub taxonomies: Vec<String>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub products: Vec<Product>,
}
