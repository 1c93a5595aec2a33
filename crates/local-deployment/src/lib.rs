use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    billing::BillingClient, config::Config, defaults::DefaultsCache, email::EmailClient,
};
use tracing::info;

// Defaults point at local provider emulators so the stack boots without
// production credentials.
const LOCAL_BILLING_URL: &str = "http://127.0.0.1:4242";
const LOCAL_EMAIL_URL: &str = "http://127.0.0.1:4243";

#[derive(Clone)]
pub struct LocalDeployment {
    config: Config,
    db: DBService,
    defaults_cache: DefaultsCache,
    billing: BillingClient,
    email: EmailClient,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        info!(database_url = %config.database_url, "database ready");

        let billing = BillingClient::new(
            config
                .billing_api_url
                .clone()
                .unwrap_or_else(|| LOCAL_BILLING_URL.to_string()),
            config.billing_api_key.clone().unwrap_or_default(),
        )?;
        let email = EmailClient::new(
            config
                .email_api_url
                .clone()
                .unwrap_or_else(|| LOCAL_EMAIL_URL.to_string()),
            config.email_api_key.clone().unwrap_or_default(),
        )?;

        Ok(Self {
            config,
            db,
            defaults_cache: DefaultsCache::new(),
            billing,
            email,
        })
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn defaults_cache(&self) -> &DefaultsCache {
        &self.defaults_cache
    }

    fn billing(&self) -> &BillingClient {
        &self.billing
    }

    fn email(&self) -> &EmailClient {
        &self.email
    }
}
