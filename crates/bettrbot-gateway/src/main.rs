use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use bettrbot_agent::gemini::GeminiProvider;
use bettrbot_agent::{AgentRuntime, Coach, LlmProvider};
use bettrbot_core::{BettrConfig, BettrError};

mod app;
mod http;

/// BettrBot communication-coach chat service.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to bettrbot.toml (overrides BETTRBOT_CONFIG).
    #[arg(long)]
    config: Option<String>,

    /// Listen port (overrides gateway.port).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env is optional; real env vars win.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bettrbot_gateway=info,bettrbot_agent=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: --config > BETTRBOT_CONFIG env > ./bettrbot.toml
    let config_path = args.config.or_else(|| std::env::var("BETTRBOT_CONFIG").ok());
    let mut config = BettrConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        BettrConfig::default()
    });
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    // no credential or no client means no service
    let provider = build_provider(&config).map_err(|e| {
        tracing::error!(code = e.code(), "{e}");
        e
    })?;
    let model = config.agent.model.clone();
    let runtime = AgentRuntime::new(provider, model.clone());
    info!(%model, "Successfully initialized Gemini model");

    let coach = Coach::new(runtime, &config.agent);
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;

    let state = Arc::new(app::AppState::new(config, coach));
    let router = app::build_router(state);

    info!("BettrBot gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Build the Gemini provider. Fails when the API key is missing or the HTTP
/// client cannot be constructed.
fn build_provider(config: &BettrConfig) -> Result<Box<dyn LlmProvider>, BettrError> {
    let api_key = config.gemini_api_key()?;
    let gemini = &config.providers.gemini;

    let provider = GeminiProvider::from_config(gemini, api_key).map_err(|e| {
        BettrError::Config(format!("failed to initialize Gemini client: {e}"))
    })?;

    info!(
        base_url = %gemini.base_url,
        timeout_secs = ?gemini.timeout_secs,
        "LLM provider: Google Gemini"
    );
    Ok(Box::new(provider))
}
