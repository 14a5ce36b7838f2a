pub mod models;
pub mod sanitize;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{
    models::{Product, ProductSearch, EXCLUDE_FROM_SEARCH, PRODUCT_VISIBILITY_TAXONOMY},
    CatalogBackend,
};
use models::{ProductResult, SearchParams, SearchResponse, TermResult, WatchResults};
use sanitize::{clamp_limit, escape_html, normalize_text, sanitize_slug};

/// Queries shorter than this (in characters) return empty results
pub const MIN_QUERY_CHARS: usize = 2;

pub const DEFAULT_TERM_LIMIT: u32 = 6;
pub const DEFAULT_PRODUCT_LIMIT: u32 = 8;
pub const DEFAULT_WATCH_CATEGORY: &str = "watches";
pub const DEFAULT_COLLECTIONS_ATTR: &str = "brand_collection";
pub const DEFAULT_BRANDS_ATTR: &str = "lux_g_brand";
pub const DEFAULT_REFS_ATTR: &str = "lux_g_referencenumber";

/// Namespace prefix of product attribute taxonomies
pub const ATTRIBUTE_PREFIX: &str = "pa_";

/// A validated search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub text: String,
    pub term_limit: u32,
    pub product_limit: u32,
    /// Empty disables the category restriction
    pub watch_category: String,
    pub collections_attr: String,
    pub brands_attr: String,
    pub refs_attr: String,
}

impl SearchRequest {
    /// Normalize raw request fields, filling defaults and clamping limits
    pub fn from_params(params: &SearchParams) -> Self {
        let slug_or = |raw: &Option<String>, default: &str| {
            raw.as_deref()
                .map(sanitize_slug)
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            text: params.q.as_deref().map(normalize_text).unwrap_or_default(),
            term_limit: clamp_limit(params.term_limit.as_deref(), DEFAULT_TERM_LIMIT),
            product_limit: clamp_limit(params.product_limit.as_deref(), DEFAULT_PRODUCT_LIMIT),
            watch_category: slug_or(&params.watch_cat, DEFAULT_WATCH_CATEGORY),
            collections_attr: slug_or(&params.collections_attr, DEFAULT_COLLECTIONS_ATTR),
            brands_attr: slug_or(&params.brands_attr, DEFAULT_BRANDS_ATTR),
            refs_attr: slug_or(&params.refs_attr, DEFAULT_REFS_ATTR),
        }
    }

    pub fn is_too_short(&self) -> bool {
        self.text.chars().count() < MIN_QUERY_CHARS
    }
}

/// Storefront presentation settings used to build result rows
#[derive(Debug, Clone)]
pub struct Storefront {
    /// Base URL for term and product links, without trailing slash
    pub site_url: String,
    pub placeholder_image_url: String,
    pub currency_symbol: String,
}

impl Storefront {
    pub fn term_url(&self, taxonomy: &str, slug: &str) -> String {
        format!("{}/{}/{}/", self.site_url, taxonomy, slug)
    }

    pub fn product_url(&self, slug: &str) -> String {
        format!("{}/product/{}/", self.site_url, slug)
    }

    /// Shop amount markup for a raw price, None when the price is not numeric
    pub fn format_price(&self, raw: &str) -> Option<String> {
        let amount: f64 = raw.trim().parse().ok()?;
        if !amount.is_finite() {
            return None;
        }
        Some(format!(
            "<span class=\"woocommerce-Price-amount amount\"><bdi><span class=\"woocommerce-Price-currencySymbol\">{}</span>{}</bdi></span>",
            escape_html(&self.currency_symbol),
            group_thousands(&format!("{:.2}", amount))
        ))
    }

    /// Formatted active price, else the stored price markup, else nothing
    pub fn price_markup(&self, product: &Product) -> Option<String> {
        product
            .price
            .as_deref()
            .and_then(|raw| self.format_price(raw))
            .or_else(|| product.price_html.clone().filter(|html| !html.trim().is_empty()))
    }

    /// Product image, else the placeholder image
    pub fn thumbnail_url(&self, product: &Product) -> String {
        product
            .thumbnail
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.placeholder_image_url.clone())
    }
}

/// Insert `,` between thousands in a formatted amount: "13950.00" is "13,950.00"
fn group_thousands(amount: &str) -> String {
    let (sign, unsigned) = match amount.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", amount),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut grouped = String::with_capacity(amount.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, fraction)
    }
}

/// Aggregates term and product matches into one response
#[derive(Clone)]
pub struct SearchService {
    catalog: Arc<dyn CatalogBackend>,
    storefront: Storefront,
}

impl SearchService {
    pub fn new(catalog: Arc<dyn CatalogBackend>, storefront: Storefront) -> Self {
        Self {
            catalog,
            storefront,
        }
    }

    /// Resolve an attribute identifier to a registered taxonomy, trying it
    /// as-is and then under the attribute prefix
    pub async fn resolve_taxonomy(&self, identifier: &str) -> Option<String> {
        if identifier.is_empty() {
            return None;
        }

        let prefixed = format!("{}{}", ATTRIBUTE_PREFIX, identifier.trim_start_matches('_'));
        for candidate in [identifier.to_string(), prefixed] {
            match self.catalog.taxonomy_exists(&candidate).await {
                Ok(true) => return Some(candidate),
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to look up taxonomy {}: {}", candidate, e);
                    return None;
                }
            }
        }

        debug!("Taxonomy {} is not registered", identifier);
        None
    }

    /// Run a search; a failing category degrades to an empty list
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        if request.is_too_short() {
            return SearchResponse::default();
        }

        let (collections_tax, brands_tax, refs_tax) = futures::join!(
            self.resolve_taxonomy(&request.collections_attr),
            self.resolve_taxonomy(&request.brands_attr),
            self.resolve_taxonomy(&request.refs_attr),
        );

        let (collections, brands, references, products) = futures::join!(
            self.collect_terms(collections_tax.as_deref(), request),
            self.collect_terms(brands_tax.as_deref(), request),
            self.collect_terms(refs_tax.as_deref(), request),
            self.collect_products(request),
        );

        let watches = WatchResults {
            collections,
            brands,
            references,
            products,
        };

        info!(
            "Search {:?}: {} results ({} collections, {} brands, {} references, {} products)",
            request.text,
            watches.total(),
            watches.collections.len(),
            watches.brands.len(),
            watches.references.len(),
            watches.products.len()
        );

        SearchResponse {
            watches,
            ..Default::default()
        }
    }

    async fn collect_terms(&self, taxonomy: Option<&str>, request: &SearchRequest) -> Vec<TermResult> {
        let Some(taxonomy) = taxonomy else {
            return Vec::new();
        };

        match self
            .catalog
            .search_terms(taxonomy, &request.text, request.term_limit)
            .await
        {
            Ok(terms) => terms
                .into_iter()
                .take(request.term_limit as usize)
                .map(|term| TermResult {
                    url: self.storefront.term_url(taxonomy, &term.slug),
                    id: term.id,
                    name: term.name,
                    slug: term.slug,
                    count: term.count,
                })
                .collect(),
            Err(e) => {
                warn!("Term search in {} failed: {}", taxonomy, e);
                Vec::new()
            }
        }
    }

    /// Id of the visibility flag that hides products from search, if the store has one
    async fn excluded_visibility_term(&self) -> Option<i64> {
        match self
            .catalog
            .term_id_by_slug(PRODUCT_VISIBILITY_TAXONOMY, EXCLUDE_FROM_SEARCH)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to look up search visibility flag: {}", e);
                None
            }
        }
    }

    async fn collect_products(&self, request: &SearchRequest) -> Vec<ProductResult> {
        let search = ProductSearch {
            text: request.text.clone(),
            category_slug: Some(request.watch_category.clone()).filter(|slug| !slug.is_empty()),
            exclude_term_id: self.excluded_visibility_term().await,
            limit: request.product_limit,
        };

        match self.catalog.search_products(&search).await {
            Ok(products) => products
                .into_iter()
                .take(request.product_limit as usize)
                .map(|product| ProductResult {
                    id: product.id,
                    url: self.storefront.product_url(&product.slug),
                    price_html: self.storefront.price_markup(&product),
                    thumbnail: Some(self.storefront.thumbnail_url(&product)),
                    title: product.title,
                })
                .collect(),
            Err(e) => {
                warn!("Product search failed: {}", e);
                Vec::new()
            }
        }
    }
}
