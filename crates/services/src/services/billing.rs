//! Billing provider client. The provider is opaque: we hand it a plan
//! selection and get back a hosted-checkout redirect URL.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use db::models::{checkout_stash::BillingInterval, user::PlanTier};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error)]
pub enum BillingError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("decode error: {0}")]
    Decode(String),
    #[error("missing credentials: BILLING_API_URL / BILLING_API_KEY not set")]
    MissingCredentials,
}

impl BillingError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    customer_email: &'a str,
    plan: PlanTier,
    interval: BillingInterval,
}

/// Hosted checkout session created by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct BillingClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl BillingClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn from_env() -> Result<Self, BillingError> {
        let base_url =
            std::env::var("BILLING_API_URL").map_err(|_| BillingError::MissingCredentials)?;
        let api_key =
            std::env::var("BILLING_API_KEY").map_err(|_| BillingError::MissingCredentials)?;
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: String, api_key: String) -> Result<Self, BillingError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("gigledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BillingError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Create a checkout session for the given plan selection and return its
    /// redirect target.
    pub async fn create_checkout_session(
        &self,
        customer_email: &str,
        plan: PlanTier,
        interval: BillingInterval,
    ) -> Result<CheckoutSession, BillingError> {
        let request = CheckoutRequest {
            customer_email,
            plan,
            interval,
        };

        (|| async { self.send_checkout(&request).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(15))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &BillingError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "billing checkout call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn send_checkout(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, BillingError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<CheckoutSession>()
                .await
                .map_err(|e| BillingError::Decode(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(BillingError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(BillingError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(BillingError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> BillingError {
    if e.is_timeout() {
        BillingError::Timeout
    } else {
        BillingError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_retry() {
        assert!(BillingError::Timeout.should_retry());
        assert!(BillingError::RateLimited.should_retry());
        assert!(
            BillingError::Http {
                status: 503,
                body: String::new()
            }
            .should_retry()
        );
    }

    #[test]
    fn permanent_errors_do_not_retry() {
        assert!(!BillingError::InvalidApiKey.should_retry());
        assert!(
            !BillingError::Http {
                status: 422,
                body: String::new()
            }
            .should_retry()
        );
    }
}
