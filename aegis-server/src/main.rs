use aegis_core::llm::{LlmConfig, LlmGateway};
use aegis_server::config::ServerConfig;
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let llm = LlmConfig::from_env()
        .context("no LLM API key configured (set GEMINI_API_KEY, or LLM_PROVIDER and LLM_API_KEY_ENV)")?;
    let provider = llm.provider.clone();
    let gateway = LlmGateway::new(llm).context("failed to build LLM gateway")?;

    let app = aegis_server::build_app(Arc::new(gateway), &config);
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;

    tracing::info!(bind = %config.bind, %provider, "aegis-server listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
