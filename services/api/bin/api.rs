//! Main Entrypoint for the Triage API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the body client, language-model client and dispatcher.
//! 4. Probing the body and starting the power monitor.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use triage_api::{config::Config, router::create_router, state::AppState};
use triage_core::{
    body::{BodyApi, BodyClient},
    dispatch::Dispatcher,
    ingress::Ingress,
    llm_client::{LLMClient, OpenAICompatibleClient},
    monitor::PowerMonitor,
    prompts::Prompts,
    reflex::ReflexTable,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in std::fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Initialize Shared Services ---
    let prompt_map = load_prompts(&config.prompts_path).with_context(|| {
        format!(
            "Failed to read prompts from {}",
            config.prompts_path.display()
        )
    })?;
    let prompts = Prompts::from_map(&prompt_map)?;

    let reflexes = ReflexTable::builtin().context("Built-in reflex table is invalid")?;
    info!(reflexes = reflexes.len(), "Reflex table loaded");

    let body_client = Arc::new(BodyClient::new(
        config.breaker(),
        config.body_primary_url.clone(),
        config.body_fallback_url.clone(),
    ));
    let body: Arc<dyn BodyApi> = body_client.clone();

    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.llm_api_key)
        .with_api_base(&config.llm_api_base);
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));

    let dispatcher = Dispatcher::new(reflexes, body.clone(), llm_client, prompts)
        .with_history_limit(config.history_exchanges);
    let ingress = Ingress::new(Arc::new(dispatcher));

    // --- 4. Probe the Body and Start Background Work ---
    let probe_client = body_client.clone();
    tokio::spawn(async move {
        probe_client.probe().await;
    });
    let monitor = PowerMonitor::start(body, config.power());

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(Arc::new(AppState::new(ingress, body_client))).layer(cors);

    // --- 6. Start Server ---
    info!(
        model = %config.chat_model,
        llm_api_base = %config.llm_api_base,
        body_primary = %config.body_primary_url,
        body_fallback = %config.body_fallback_url,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    monitor.stop().await;
    info!("Server has shut down.");
    Ok(())
}
