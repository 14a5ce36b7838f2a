use serde::{Deserialize, Serialize};

/// A taxonomy term matching the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermResult {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    #[serde(default)]
    pub count: i64,
}

/// A product matching the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResult {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Results shown on the "watches" tab
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchResults {
    #[serde(default)]
    pub collections: Vec<TermResult>,
    #[serde(default)]
    pub brands: Vec<TermResult>,
    #[serde(default)]
    pub references: Vec<TermResult>,
    #[serde(default)]
    pub products: Vec<ProductResult>,
}

impl WatchResults {
    /// Number of rows across all four categories
    pub fn total(&self) -> usize {
        self.collections.len() + self.brands.len() + self.references.len() + self.products.len()
    }
}

/// Placeholder for the jewelry tab; always `{}` on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JewelryResults {}

/// Payload of a successful search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub watches: WatchResults,
    #[serde(default, skip_deserializing)]
    pub jewelry: JewelryResults,
}

/// Error payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// `{ success, data }` envelope returned by the search action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl Envelope<SearchResponse> {
    pub fn ok(data: SearchResponse) -> Self {
        Self { success: true, data }
    }
}

impl Envelope<ErrorMessage> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

/// A search as the widget sends it, one per debounced input
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    /// Client-side threshold; never sent
    pub min_chars: usize,
    pub term_limit: u32,
    pub product_limit: u32,
    pub watch_category_slug: String,
    pub collections_attr: String,
    pub brands_attr: String,
    pub refs_attr: String,
}

impl SearchQuery {
    /// Form fields of the search action, as read back by `SearchParams`
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.text.clone()),
            ("term_limit", self.term_limit.to_string()),
            ("product_limit", self.product_limit.to_string()),
            ("watch_cat", self.watch_category_slug.clone()),
            ("collections_attr", self.collections_attr.clone()),
            ("brands_attr", self.brands_attr.clone()),
            ("refs_attr", self.refs_attr.clone()),
        ]
    }
}

/// Raw request fields, form body or query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub term_limit: Option<String>,
    pub product_limit: Option<String>,
    pub watch_cat: Option<String>,
    pub collections_attr: Option<String>,
    pub brands_attr: Option<String>,
    pub refs_attr: Option<String>,
    pub nonce: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_wire_shape() {
        let response = SearchResponse {
            watches: WatchResults {
                brands: vec![TermResult {
                    id: 3,
                    name: "Rolex".to_string(),
                    slug: "rolex".to_string(),
                    url: "http://shop/pa_brand/rolex/".to_string(),
                    count: 12,
                }],
                ..Default::default()
            },
            jewelry: JewelryResults::default(),
        };

        let value = serde_json::to_value(Envelope::ok(response)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["watches"]["brands"][0]["name"], "Rolex");
        assert_eq!(value["data"]["watches"]["collections"], json!([]));
        assert_eq!(value["data"]["jewelry"], json!({}));
    }

    #[test]
    fn test_response_decodes_partial_payloads() {
        // Jewelry may come back as an empty array and missing lists default to empty
        let decoded: SearchResponse = serde_json::from_value(json!({
            "watches": { "brands": [{ "id": 1, "name": "Rolex", "slug": "rolex", "url": "/b/rolex/" }] },
            "jewelry": []
        }))
        .unwrap();

        assert_eq!(decoded.watches.brands.len(), 1);
        assert_eq!(decoded.watches.brands[0].count, 0);
        assert!(decoded.watches.products.is_empty());
        assert_eq!(decoded.watches.total(), 1);
    }

    #[test]
    fn test_query_form_fields() {
        let query = SearchQuery {
            text: "rol".to_string(),
            min_chars: 2,
            term_limit: 6,
            product_limit: 8,
            watch_category_slug: "watches".to_string(),
            collections_attr: "brand_collection".to_string(),
            brands_attr: "lux_g_brand".to_string(),
            refs_attr: "lux_g_referencenumber".to_string(),
        };

        let fields = query.form_fields();
        assert!(fields.contains(&("q", "rol".to_string())));
        assert!(fields.contains(&("watch_cat", "watches".to_string())));
        assert!(fields.contains(&("term_limit", "6".to_string())));
        assert!(fields.iter().all(|(name, _)| *name != "min_chars"));
    }
}
