use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;

/// Main entry point for the Medical Records Bridge
///
/// Loads `.env`, resolves configuration once and serves the REST API.
///
/// # Environment Variables
/// - `MRB_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `RECORDS_DATA_DIR`: Directory for record storage (default: "records_data")
/// - `API_KEY`: API key required on every `/api` route
/// - `GROQ_API_KEY`, `HUGGINGFACE_API_KEY`, `OLLAMA_BASE_URL` and friends: AI provider chain
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mrb_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("mrb_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MRB_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = mrb_core::CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    tracing::info!(
        "++ Records stored under {}",
        cfg.records_data_dir().display()
    );
    let state = AppState::from_config(&cfg, std::env::var("API_KEY").ok())?;

    tracing::info!("++ Starting Medical Records Bridge REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state)).await?;

    Ok(())
}
