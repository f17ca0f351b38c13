use anyhow::Result;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

use site_server::config::Settings;
use site_server::database::RowStore;
use site_server::logging;
use site_server::routes::build_router;
use site_server::services::SmtpMailer;
use site_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first, it decides where logs go
    let settings = Settings::load()?;

    let _log_guard = logging::init_logger(&settings.logging)?;

    info!("🚀 Starting site server...");
    info!("✅ Configuration loaded");

    // Initialize row store
    let store = RowStore::connect(&settings.database).await?;
    store.migrate().await?;
    info!("✅ Database ready");

    let mailer = Arc::new(SmtpMailer::new(settings.mail.clone()));

    // Fails fast on conflicting session plugins
    let state = AppState::new(settings.clone(), store, mailer).await?;

    let app = build_router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
