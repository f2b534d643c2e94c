#![deny(
  unsafe_code,
  // reason = "Let's just not do it"
)]
#![deny(
  clippy::unwrap_used,
  clippy::expect_used,
  clippy::panic,
  clippy::unreachable,
  // reason = "We have to handle errors properly"
)]

mod config;
mod process;
mod service;

use axum::{extract::State, http::StatusCode, routing::get, Router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = config::Manager::new().await?;
  let values = config.values().await;

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::builder()
        .with_default_directive(values.log_level.into())
        .from_env_lossy(),
    )
    .init();

  let services = service::Container::new(values.clone())?;

  let processes = process::Container::new(config, services.clone());
  processes.spawn().await;

  let router = Router::new()
    .route("/metrics", get(metrics))
    .route("/healthz", get(healthz))
    .with_state(services);
  let listener =
    tokio::net::TcpListener::bind(values.listen.as_str()).await?;
  tracing::info!("Serving metrics on {}", values.listen);
  let server = tokio::spawn(async move {
    if let Err(error) = axum::serve(listener, router).await {
      tracing::error!(%error, "Metrics server failed");
    }
  });

  tokio::signal::ctrl_c().await?;
  processes.cancel().await;
  server.abort();

  Ok(())
}

async fn metrics(
  State(services): State<service::Container>,
) -> Result<String, StatusCode> {
  services.metrics().encode().map_err(|error| {
    tracing::error!(%error, "Failed encoding metric families");
    StatusCode::INTERNAL_SERVER_ERROR
  })
}

async fn healthz() -> &'static str {
  "ok"
}
