use std::sync::Arc;

use secrecy::ExposeSecret;

use site_wizard::bot::SiteBot;
use site_wizard::cards::AdaptiveCardRenderer;
use site_wizard::channels::{CliChannel, message_routes};
use site_wizard::config::WizardConfig;
use site_wizard::services::{AuthToken, GraphDirectory, LoggingProvisioner, StaticAuthProvider};
use site_wizard::store::{LibSqlStore, MemoryStore, StateStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env()?;

    eprintln!("🧙 Site Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sign-in connection: {}", config.connection_name);
    eprintln!("   Directory: {}", config.graph_base_url);
    eprintln!("   Messages: http://0.0.0.0:{}/api/messages", config.http_port);
    eprintln!("   /signin <token> completes a sign-in from the CLI.\n");

    // ── State store ───────────────────────────────────────────────────────
    let store: Arc<dyn StateStore> = match &config.db_path {
        Some(path) => {
            eprintln!("   State: {}", path.display());
            Arc::new(LibSqlStore::new_local(path).await?)
        }
        None => {
            eprintln!("   State: in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Collaborators ─────────────────────────────────────────────────────
    let auth = match &config.static_token {
        Some(token) => StaticAuthProvider::signed_in(AuthToken::new(token.expose_secret())),
        None => StaticAuthProvider::signed_out(),
    };
    let directory = GraphDirectory::new(config.graph_base_url.clone());
    let http_port = config.http_port;

    let bot = Arc::new(SiteBot::new(
        config,
        Arc::new(auth),
        Arc::new(directory),
        store,
        Arc::new(LoggingProvisioner),
        Arc::new(AdaptiveCardRenderer::new()),
    ));

    // ── HTTP endpoint ─────────────────────────────────────────────────────
    let app = message_routes(Arc::clone(&bot));
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", http_port)).await {
            Ok(listener) => {
                tracing::info!(port = http_port, "HTTP message endpoint started");
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("HTTP server stopped: {}", e);
                }
            }
            Err(e) => tracing::error!(port = http_port, "Failed to bind HTTP port: {}", e),
        }
    });

    // ── CLI ───────────────────────────────────────────────────────────────
    eprintln!("{}\n", bot.welcome().plain_text());
    bot.run(&CliChannel::new()).await?;

    Ok(())
}
