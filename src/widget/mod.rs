//! Headless live-search widget: configuration, independent per-widget
//! controllers, rendering and the HTTP transport.

pub mod controller;
pub mod render;
pub mod shell;
pub mod transport;
pub mod view;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::search::models::SearchQuery;
use crate::search::{
    DEFAULT_BRANDS_ATTR, DEFAULT_COLLECTIONS_ATTR, DEFAULT_PRODUCT_LIMIT, DEFAULT_REFS_ATTR,
    DEFAULT_TERM_LIMIT, DEFAULT_WATCH_CATEGORY, MIN_QUERY_CHARS,
};
use controller::SearchController;
use render::RenderOptions;
use transport::SearchTransport;

/// Settings one widget is rendered with
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub min_chars: usize,
    pub term_limit: u32,
    pub product_limit: u32,
    pub watch_category: String,
    pub collections_attr: String,
    pub brands_attr: String,
    pub refs_attr: String,
    pub show_price: bool,
    pub show_image: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            min_chars: MIN_QUERY_CHARS,
            term_limit: DEFAULT_TERM_LIMIT,
            product_limit: DEFAULT_PRODUCT_LIMIT,
            watch_category: DEFAULT_WATCH_CATEGORY.to_string(),
            collections_attr: DEFAULT_COLLECTIONS_ATTR.to_string(),
            brands_attr: DEFAULT_BRANDS_ATTR.to_string(),
            refs_attr: DEFAULT_REFS_ATTR.to_string(),
            show_price: true,
            show_image: true,
        }
    }
}

impl WidgetConfig {
    /// Build from shortcode-style attributes; unknown keys are ignored and
    /// missing or unparsable values keep their defaults
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| attrs.get(key).cloned().unwrap_or(default);
        let flag = |key: &str, default: bool| {
            attrs
                .get(key)
                .map(|value| value.trim() == "yes")
                .unwrap_or(default)
        };

        Self {
            min_chars: attrs
                .get("min_chars")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.min_chars),
            term_limit: attrs
                .get("term_limit")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.term_limit),
            product_limit: attrs
                .get("product_limit")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.product_limit),
            watch_category: text("watch_cat", defaults.watch_category),
            collections_attr: text("collections_attr", defaults.collections_attr),
            brands_attr: text("brands_attr", defaults.brands_attr),
            refs_attr: text("refs_attr", defaults.refs_attr),
            show_price: flag("show_price", defaults.show_price),
            show_image: flag("show_image", defaults.show_image),
        }
    }

    /// The request for `text` under this widget's settings
    pub fn query(&self, text: &str) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            min_chars: self.min_chars,
            term_limit: self.term_limit,
            product_limit: self.product_limit,
            watch_category_slug: self.watch_category.clone(),
            collections_attr: self.collections_attr.clone(),
            brands_attr: self.brands_attr.clone(),
            refs_attr: self.refs_attr.clone(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_price: self.show_price,
            show_image: self.show_image,
        }
    }
}

/// Parse one `key=value` widget attribute
pub fn parse_attribute(pair: &str) -> Result<(String, String), String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("attribute {:?} is not key=value", pair))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("attribute {:?} has no name", pair));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse a comma-separated attribute list such as `min_chars=3,show_price=no`
pub fn parse_attribute_list(list: &str) -> Result<HashMap<String, String>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(parse_attribute)
        .collect()
}

/// Every widget on a page, each with its own controller
pub struct WidgetSet {
    controllers: Vec<SearchController>,
}

impl WidgetSet {
    /// Start one controller per configuration
    pub fn init(configs: Vec<WidgetConfig>, transport: Arc<dyn SearchTransport>) -> Self {
        let controllers: Vec<SearchController> = configs
            .into_iter()
            .map(|config| SearchController::spawn(config, transport.clone()))
            .collect();

        info!("Initialized {} search widget(s)", controllers.len());
        Self { controllers }
    }

    /// Widget by position, in initialization order
    pub fn get(&self, index: usize) -> Option<&SearchController> {
        self.controllers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchController> {
        self.controllers.iter()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// A click somewhere on the page: every widget it did not land in closes
    pub fn click(&self, inside: Option<Uuid>) {
        for controller in &self.controllers {
            if Some(controller.id()) != inside {
                controller.click_outside();
            }
        }
    }

    pub async fn shutdown(self) {
        for controller in self.controllers {
            controller.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::models::{SearchResponse, TermResult, WatchResults};
    use async_trait::async_trait;
    use tokio::time::{sleep, Duration};
    use super::transport::{SearchOutcome, TransportError};

    #[test]
    fn test_config_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.min_chars, 2);
        assert_eq!(config.term_limit, 6);
        assert_eq!(config.product_limit, 8);
        assert_eq!(config.watch_category, "watches");
        assert!(config.show_price);
        assert!(config.show_image);
    }

    #[test]
    fn test_config_from_attributes() {
        let attrs = HashMap::from([
            ("min_chars".to_string(), "3".to_string()),
            ("term_limit".to_string(), "oops".to_string()),
            ("brands_attr".to_string(), "pa_brand".to_string()),
            ("show_price".to_string(), "no".to_string()),
        ]);

        let config = WidgetConfig::from_attributes(&attrs);
        assert_eq!(config.min_chars, 3);
        assert_eq!(config.term_limit, 6);
        assert_eq!(config.brands_attr, "pa_brand");
        assert!(!config.show_price);
        assert!(config.show_image);

        let query = config.query("rolex");
        assert_eq!(query.text, "rolex");
        assert_eq!(query.min_chars, 3);
        assert_eq!(query.brands_attr, "pa_brand");
    }

    #[test]
    fn test_parse_attributes() {
        assert_eq!(
            parse_attribute("min_chars=3"),
            Ok(("min_chars".to_string(), "3".to_string()))
        );
        assert_eq!(
            parse_attribute(" refs_attr = pa_ref "),
            Ok(("refs_attr".to_string(), "pa_ref".to_string()))
        );
        assert!(parse_attribute("show_price").is_err());
        assert!(parse_attribute("=yes").is_err());

        let attrs = parse_attribute_list("min_chars=3, show_price=no,").unwrap();
        assert_eq!(attrs.len(), 2);
        let config = WidgetConfig::from_attributes(&attrs);
        assert_eq!(config.min_chars, 3);
        assert!(!config.show_price);

        assert!(parse_attribute_list("min_chars=3,oops").is_err());
        assert!(parse_attribute_list("").unwrap().is_empty());
    }

    struct EchoTransport;

    #[async_trait]
    impl SearchTransport for EchoTransport {
        async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, TransportError> {
            Ok(SearchOutcome::Results(SearchResponse {
                watches: WatchResults {
                    brands: vec![TermResult {
                        id: 1,
                        name: query.text.clone(),
                        slug: query.text.clone(),
                        url: "/".to_string(),
                        count: 1,
                    }],
                    ..Default::default()
                },
                ..Default::default()
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_widgets_are_independent() {
        let widgets = WidgetSet::init(
            vec![WidgetConfig::default(), WidgetConfig::default()],
            Arc::new(EchoTransport),
        );
        assert_eq!(widgets.len(), 2);

        let ids: Vec<Uuid> = widgets.iter().map(|c| c.id()).collect();
        assert_ne!(ids[0], ids[1]);

        widgets.get(0).unwrap().input("rolex");
        widgets.get(1).unwrap().input("omega");
        sleep(Duration::from_millis(300)).await;

        assert!(widgets.get(0).unwrap().view().brands.html.contains("rolex"));
        assert!(widgets.get(1).unwrap().view().brands.html.contains("omega"));
        assert!(widgets.get(2).is_none());

        // A click inside the first widget closes only the second
        widgets.click(Some(ids[0]));
        sleep(Duration::from_millis(10)).await;
        assert!(widgets.get(0).unwrap().view().expanded);
        assert!(!widgets.get(1).unwrap().view().expanded);

        widgets.shutdown().await;
    }
}
