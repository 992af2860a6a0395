use std::time::Duration;

use catalogue_core::CatalogueAuth;
use catalogue_manager::{build_app, CatalogueClient, WebState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = catalogue_core::load_manager_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let client = CatalogueClient::with_auth(
        &config.catalogue_url,
        &config.catalogue_auth,
        config.client_timeout_secs,
    )?;
    let auth_mode = match &config.catalogue_auth {
        CatalogueAuth::Token(_) => "static token",
        CatalogueAuth::ClientCredentials(_) => "client credentials",
    };
    tracing::info!(
        catalogue_url = %config.catalogue_url,
        auth = auth_mode,
        users = config.users.len(),
        "catalogue client configured"
    );
    let app = build_app(WebState::new(
        client,
        config.users,
        config.default_locale,
        Duration::from_secs(config.session_ttl_secs),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "manager service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
