use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, app_router};
use services::services::{config::Config, digest::MonthlyDigestService};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let deployment = DeploymentImpl::new(config)
        .await
        .context("failed to assemble deployment")?;

    let _digest =
        MonthlyDigestService::spawn(deployment.db().clone(), deployment.email().clone()).await;

    let router = app_router(deployment);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
