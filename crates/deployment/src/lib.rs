//! Abstraction over the wiring of shared services, threaded through axum
//! state so routes stay agnostic of how the process was assembled.

use async_trait::async_trait;
use db::DBService;
use services::services::{
    billing::{BillingClient, BillingError},
    config::Config,
    defaults::DefaultsCache,
    email::{EmailClient, EmailError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("billing client error: {0}")]
    Billing(#[from] BillingError),
    #[error("email client error: {0}")]
    Email(#[from] EmailError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new(config: Config) -> Result<Self, DeploymentError>
    where
        Self: Sized;

    fn config(&self) -> &Config;
    fn db(&self) -> &DBService;
    fn defaults_cache(&self) -> &DefaultsCache;
    fn billing(&self) -> &BillingClient;
    fn email(&self) -> &EmailClient;
}
