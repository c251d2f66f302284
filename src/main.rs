use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textlayer_core::config::{CommandLineArgs, Config};
use textlayer_core::{AppState, LLMClient, build_router, db, triggers};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = CommandLineArgs::parse();

    // Load configuration first
    let config = Config::load(&args)?;

    // Initialize logging
    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);

    let registry = tracing_subscriber::registry().with(log_filter);

    // Keeps the file writer flushing until main returns
    let _guard = if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("textlayer.log");
        // Rolling appender adds its own date suffix
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
        Some(guard)
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
        None
    };
    tracing::info!("TextLayer Core starting up ({})", config.env.as_str());
    tracing::info!("Configuration loaded successfully");

    if config.langfuse.is_enabled() {
        tracing::info!("Langfuse tracing configured");
    } else {
        tracing::debug!("Langfuse tracing disabled");
    }

    if let Some(path) = &args.handle_event {
        let raw = std::fs::read_to_string(path)?;
        let event: serde_json::Value = serde_json::from_str(&raw)?;
        let handled = triggers::sample_handler(&event);
        tracing::info!("Event {} handled: {}", path, handled);
        if !handled {
            anyhow::bail!("Event in {} could not be handled", path);
        }
        return Ok(());
    }

    let pool = db::create_pool(&config.datastore).await?;
    tracing::info!("Datastore pool created successfully");

    let backend = Arc::new(LLMClient::new(&config.llm)?);
    let app_state = AppState::build(&config, pool, backend)?;

    if let Some(question) = &args.ask {
        let answer = app_state.text_to_sql_service.text_to_sql(question).await?;
        println!("{}", answer);
        return Ok(());
    }

    let app = build_router(app_state, config.auth.api_key.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API documentation available at http://{}/v1/api-docs", addr);
    tracing::info!("TextLayer Core is ready to serve requests");

    axum::serve(listener, app).await?;

    Ok(())
}
