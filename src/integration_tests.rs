#[cfg(test)]
mod integration_tests {
    use crate::api::create_router;
    use crate::auth::NonceConfig;
    use crate::catalog::{models::CatalogFixture, sqlite::SqliteCatalog};
    use crate::search::{SearchService, Storefront};
    use crate::widget::controller::SearchController;
    use crate::widget::transport::HttpTransport;
    use crate::widget::view::{ResultsView, FAILURE_MESSAGE, NETWORK_ERROR_MESSAGE};
    use crate::widget::{parse_attribute_list, shell, WidgetConfig, WidgetSet};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tokio::net::TcpListener;
    use tokio::time::Duration;
    use tokio_test::assert_ok;

    const FIXTURE: &str = include_str!("../fixtures/catalog.json");

    /// A live server on an ephemeral port backed by a seeded file database
    struct TestServer {
        base_url: String,
        _dir: TempDir,
    }

    async fn start_server(catalog_enabled: bool) -> TestServer {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let catalog = SqliteCatalog::new(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();

        let fixture: CatalogFixture = serde_json::from_str(FIXTURE).unwrap();
        assert_ok!(catalog.load_fixture(&fixture).await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let service = SearchService::new(
            Arc::new(catalog),
            Storefront {
                site_url: base_url.clone(),
                placeholder_image_url: format!("{}/placeholder.png", base_url),
                currency_symbol: "$".to_string(),
            },
        );
        let router = create_router(
            catalog_enabled.then_some(service),
            NonceConfig {
                secret: "integration-secret".to_string(),
                lifetime_hours: 1,
            },
            &base_url,
        );

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            base_url,
            _dir: dir,
        }
    }

    async fn settle(controller: &SearchController) -> ResultsView {
        assert_ok!(
            controller
                .wait_until_within(Duration::from_secs(10), |view| view.expanded && !view.loading)
                .await
        )
    }

    /// Typing a brand prefix renders the brand and the matching product
    #[tokio::test]
    async fn test_live_search_end_to_end() {
        let server = start_server(true).await;
        let transport = assert_ok!(HttpTransport::connect(&server.base_url).await);
        assert_eq!(transport.endpoint(), format!("{}/api/search", server.base_url));

        let controller = SearchController::spawn(WidgetConfig::default(), Arc::new(transport));
        controller.input("r");
        controller.input("ro");
        controller.input("rol");

        let view = settle(&controller).await;

        assert_eq!(view.brands.rows, 1);
        assert!(view.brands.html.contains(">Rolex<"));
        assert!(view
            .brands
            .html
            .contains(&format!("{}/pa_lux_g_brand/rolex/", server.base_url)));
        assert!(view.collections.hidden);
        assert!(view.references.hidden);

        // Excluded, draft and jewelry products stay out
        assert_eq!(view.products.rows, 1);
        assert!(view.products.html.contains("Rolex Submariner Date 126610LN"));
        assert!(view.products.html.contains("13,950.00"));
        assert!(!view.products.html.contains("Display Box"));
        assert!(!view.products.html.contains("Pendant"));
        assert!(!view.products.html.contains("Daytona"));
        assert!(!view.message_visible);

        controller.shutdown().await;
    }

    /// Attribute ids without the `pa_` prefix still find their taxonomy
    #[tokio::test]
    async fn test_collection_attribute_prefix_resolution() {
        let server = start_server(true).await;
        let transport = assert_ok!(HttpTransport::connect(&server.base_url).await);

        let controller = SearchController::spawn(WidgetConfig::default(), Arc::new(transport));
        controller.input("speed");

        let view = settle(&controller).await;

        assert_eq!(view.collections.rows, 1);
        assert!(view
            .collections
            .html
            .contains(&format!("{}/pa_brand_collection/speedmaster/", server.base_url)));

        // Stored price markup is used when there is no raw price
        assert_eq!(view.products.rows, 1);
        assert!(view.products.html.contains("$7,000.00"));
        // And the placeholder stands in for the missing image
        assert!(view.products.html.contains("/placeholder.png"));

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_match_shows_empty_state() {
        let server = start_server(true).await;
        let transport = assert_ok!(HttpTransport::connect(&server.base_url).await);

        let controller = SearchController::spawn(WidgetConfig::default(), Arc::new(transport));
        controller.input("zzzz");

        let view = settle(&controller).await;
        assert_eq!(view.row_count(), 0);
        assert!(view.message_visible);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_nonce_is_network_error() {
        let server = start_server(true).await;
        let transport = assert_ok!(HttpTransport::new(
            format!("{}/api/search", server.base_url),
            "not-a-nonce"
        ));

        let controller = SearchController::spawn(WidgetConfig::default(), Arc::new(transport));
        controller.input("rol");

        let view = settle(&controller).await;
        assert_eq!(view.message, NETWORK_ERROR_MESSAGE);
        assert!(view.message_visible);
        assert_eq!(view.row_count(), 0);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_inactive_catalog_is_failure() {
        let server = start_server(false).await;
        let transport = assert_ok!(HttpTransport::connect(&server.base_url).await);

        let controller = SearchController::spawn(WidgetConfig::default(), Arc::new(transport));
        controller.input("rol");

        let view = settle(&controller).await;
        assert_eq!(view.message, FAILURE_MESSAGE);
        assert!(view.message_visible);

        controller.shutdown().await;
    }

    /// Two widgets with their own attributes share one page
    #[tokio::test]
    async fn test_shell_drives_page_of_widgets() {
        let server = start_server(true).await;
        let transport = assert_ok!(HttpTransport::connect(&server.base_url).await);

        let configs = vec![
            WidgetConfig::default(),
            WidgetConfig::from_attributes(&parse_attribute_list("show_price=no,show_image=no").unwrap()),
        ];
        let widgets = WidgetSet::init(configs, Arc::new(transport));

        let mut out = Vec::new();
        let script = "type 1 submariner\ntype 2 submariner\nclick 2\n";
        assert_ok!(shell::run(&widgets, script.as_bytes(), &mut out).await);
        let out = String::from_utf8(out).unwrap();
        let replies: Vec<&str> = out.lines().collect();

        assert!(replies[0].contains("wcls-price"));
        assert!(replies[0].contains("wcls-thumb"));
        assert!(replies[1].contains("Rolex Submariner Date 126610LN"));
        assert!(!replies[1].contains("wcls-price"));
        assert!(!replies[1].contains("wcls-thumb"));
        assert!(out.contains("[1] closed, 0 row(s)"));
        assert!(out.contains("[2] open, 2 row(s)"));

        widgets.shutdown().await;
    }
}
