//! Transactional email provider client (opaque HTTP API).

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error)]
pub enum EmailError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("missing credentials: EMAIL_API_URL / EMAIL_API_KEY not set")]
    MissingCredentials,
}

impl EmailError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl EmailClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn from_env() -> Result<Self, EmailError> {
        let base_url =
            std::env::var("EMAIL_API_URL").map_err(|_| EmailError::MissingCredentials)?;
        let api_key =
            std::env::var("EMAIL_API_KEY").map_err(|_| EmailError::MissingCredentials)?;
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: String, api_key: String) -> Result<Self, EmailError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("gigledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, text_body: &str) -> Result<(), EmailError> {
        let request = SendMessageRequest {
            to,
            subject,
            text_body,
        };

        (|| async { self.send_message(&request).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(15))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &EmailError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "email send failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn send_message(&self, request: &SendMessageRequest<'_>) -> Result<(), EmailError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmailError::Timeout
                } else {
                    EmailError::Transport(e.to_string())
                }
            })?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(EmailError::InvalidApiKey),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(EmailError::Http { status, body })
            }
        }
    }
}
