use std::sync::Arc;

use anyhow::Context;
use server::{
    AppState,
    auth::JwtService,
    config::ServerConfig,
    db,
    llm::{LlmClient, OpenAiClient},
    mail, routes,
    scheduler::{NotificationScheduler, SchedulerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // The guard must outlive the server so buffered file logs are flushed.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = utils::logging::init_logging(&log_level);

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db::migrate(&pool).await.context("failed to run migrations")?;

    let mailer = mail::from_config(&config.mail).context("failed to build mailer")?;

    let llm: Option<Arc<dyn LlmClient>> = match &config.llm.api_key {
        Some(key) => Some(Arc::new(
            OpenAiClient::new(key.clone(), config.llm.model.clone())
                .context("failed to build LLM client")?,
        )),
        None => {
            tracing::warn!("OPENAI_API_KEY not set; AI feedback and personalised suggestions disabled");
            None
        }
    };

    let scheduler = NotificationScheduler::spawn(
        pool.clone(),
        Arc::clone(&mailer),
        SchedulerConfig {
            enabled: config.scheduler.enabled,
            utc_offset: config.scheduler.utc_offset,
            app_base_url: config.app_base_url.clone(),
        },
    );

    let listen_addr = config.listen_addr;
    let jwt = Arc::new(JwtService::new(config.jwt_secret.clone()));
    let state = AppState::new(pool.clone(), config, jwt, mailer, llm);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
