mod api;
mod auth;
mod catalog;
mod config;
mod search;
mod widget;

#[cfg(test)]
mod integration_tests;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog::{models::CatalogFixture, sqlite::SqliteCatalog, CatalogBackend};
use search::{SearchService, Storefront};
use widget::{
    controller::SearchController, parse_attribute, parse_attribute_list, shell,
    transport::HttpTransport, view::Tab, WidgetConfig, WidgetSet,
};

/// Longest wait for the `query` command's results
const RESULT_TIMEOUT: Duration = Duration::from_secs(35);

#[derive(Parser)]
#[command(name = "live-search", version, about = "Live product search service and headless widget")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the search action
    Serve {
        /// Port to listen on (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one widget against a server and print its results region
    Query {
        text: String,
        /// Base URL of a running server
        #[arg(long, env = "SEARCH_ENDPOINT", default_value = "http://localhost:3000")]
        endpoint: String,
        /// Widget attribute, e.g. `--attr min_chars=3 --attr show_price=no`
        #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
        attrs: Vec<(String, String)>,
        /// Tab to show once results arrive
        #[arg(long, default_value = "watches")]
        tab: Tab,
    },
    /// Drive a page of widgets with commands read from stdin
    Shell {
        /// Base URL of a running server
        #[arg(long, env = "SEARCH_ENDPOINT", default_value = "http://localhost:3000")]
        endpoint: String,
        /// Attributes of one widget, e.g. "min_chars=3,show_price=no"; repeat for more widgets
        #[arg(long = "widget", value_name = "ATTRS", value_parser = parse_attribute_list)]
        widgets: Vec<HashMap<String, String>>,
    },
    /// Load a JSON catalog fixture into the database
    Seed { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => serve(port).await,
        Command::Query {
            text,
            endpoint,
            attrs,
            tab,
        } => {
            let widget = WidgetConfig::from_attributes(&attrs.into_iter().collect());
            query(&endpoint, widget, &text, tab).await
        }
        Command::Shell { endpoint, widgets } => run_shell(&endpoint, widgets).await,
        Command::Seed { file } => seed(&file).await,
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    info!("🚀 Starting live search server");

    let config = Config::from_env()?;
    let api_port = port.unwrap_or(config.api_port);

    info!("📝 Configuration:");
    info!("  API Port: {}", api_port);
    info!("  Database: {}", config.database_url);
    info!("  Site URL: {}", config.site_url);
    info!("  Catalog: {}", if config.catalog_enabled { "enabled" } else { "disabled" });

    let search = if config.catalog_enabled {
        let catalog: Arc<dyn CatalogBackend> = Arc::new(SqliteCatalog::new(&config.database_url).await?);
        Some(SearchService::new(
            catalog,
            Storefront {
                site_url: config.site_url.clone(),
                placeholder_image_url: config.placeholder_image_url.clone(),
                currency_symbol: config.currency_symbol.clone(),
            },
        ))
    } else {
        None
    };

    let router = api::create_router(search, config.nonce.clone(), &config.site_url);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("🛑 Received Ctrl+C signal");
            },
            _ = terminate => {
                info!("🛑 Received terminate signal");
            },
        }
    };

    match api::start_server_with_shutdown(router, api_port, shutdown_signal).await {
        Ok(_) => {
            info!("✅ Server shutdown completed gracefully");
            Ok(())
        }
        Err(e) => {
            error!("❌ Server error: {}", e);
            Err(e)
        }
    }
}

async fn query(endpoint: &str, widget: WidgetConfig, text: &str, tab: Tab) -> Result<()> {
    if text.trim().chars().count() < widget.min_chars {
        println!("Query shorter than {} characters, nothing to search", widget.min_chars);
        return Ok(());
    }

    let transport = HttpTransport::connect(endpoint).await?;
    info!("Searching via {}", transport.endpoint());
    let controller = SearchController::spawn(widget, Arc::new(transport));

    controller.input(text);
    let mut view = controller
        .wait_until_within(RESULT_TIMEOUT, |view| view.expanded && !view.loading)
        .await?;

    if view.active_tab != tab {
        controller.switch_tab(tab);
        view = controller
            .wait_until_within(RESULT_TIMEOUT, |view| view.active_tab == tab)
            .await?;
    }

    println!("{}", view.markup());
    controller.shutdown().await;
    Ok(())
}

async fn run_shell(endpoint: &str, attributes: Vec<HashMap<String, String>>) -> Result<()> {
    let configs: Vec<WidgetConfig> = if attributes.is_empty() {
        vec![WidgetConfig::default()]
    } else {
        attributes.iter().map(WidgetConfig::from_attributes).collect()
    };

    let transport = HttpTransport::connect(endpoint).await?;
    info!("Searching via {}", transport.endpoint());

    let widgets = WidgetSet::init(configs, Arc::new(transport));
    shell::run(&widgets, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    widgets.shutdown().await;
    Ok(())
}

async fn seed(file: &Path) -> Result<()> {
    let config = Config::from_env()?;

    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let fixture: CatalogFixture = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let catalog = SqliteCatalog::new(&config.database_url).await?;
    catalog.load_fixture(&fixture).await?;

    info!("✅ Seeded {} from {}", config.database_url, file.display());
    Ok(())
}
