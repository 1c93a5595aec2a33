//! Background job that mails each user a summary of last month's activity.
//! Users are processed one at a time; a failure for one user is logged and
//! the sweep moves on.

use std::time::Duration;

use chrono::Utc;
use db::{DBService, models::user::User};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use utils::time::{previous_month_range, start_of_month};

use super::{
    email::{EmailClient, EmailError},
    summary::{SummaryError, SummaryService},
};

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("summary error: {0}")]
    Summary(#[from] SummaryError),
    #[error("email error: {0}")]
    Email(#[from] EmailError),
}

/// Background service that sends the monthly digest emails.
pub struct MonthlyDigestService {
    db: DBService,
    email: EmailClient,
    poll_interval: Duration,
}

impl MonthlyDigestService {
    /// Spawn the digest sweep loop.
    pub async fn spawn(db: DBService, email: EmailClient) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            email,
            poll_interval: Duration::from_secs(6 * 60 * 60), // Four sweeps a day
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting monthly digest service with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.run_sweep().await {
                error!("Error running digest sweep: {}", e);
            }
        }
    }

    /// One pass over all users, sending to everyone not yet covered this
    /// calendar month.
    pub async fn run_sweep(&self) -> Result<usize, DigestError> {
        let now = Utc::now();
        let month_start = start_of_month(now);
        let users = User::find_all(&self.db.pool).await?;

        let mut sent = 0;
        for user in users {
            if !user.onboarded() {
                continue;
            }
            if user
                .last_digest_sent_at
                .map(|at| at >= month_start)
                .unwrap_or(false)
            {
                debug!(user_id = %user.id, "digest already sent this month");
                continue;
            }

            match self.send_digest(&user).await {
                Ok(()) => {
                    User::set_last_digest_sent(&self.db.pool, user.id, now).await?;
                    sent += 1;
                }
                Err(e) => {
                    warn!(
                        user_id = %user.id,
                        error = %e,
                        "digest send failed, continuing sweep"
                    );
                }
            }
        }

        if sent > 0 {
            info!(sent = sent, "digest sweep complete");
        }
        Ok(sent)
    }

    async fn send_digest(&self, user: &User) -> Result<(), DigestError> {
        let (since, until) = previous_month_range(Utc::now());
        let summary =
            SummaryService::activity_summary(&self.db.pool, user.id, since, until).await?;

        let subject = format!("Your GigLedger summary for {}", since.format("%B %Y"));
        let mut body = format!(
            "Revenue: ${:.2}\nExpenses: ${:.2}\nNet: ${:.2}\n",
            summary.revenue_cents as f64 / 100.0,
            summary.expense_cents as f64 / 100.0,
            summary.net_cents as f64 / 100.0,
        );
        if !summary.revenue_by_platform.is_empty() {
            body.push_str("\nTop platforms:\n");
            for platform in &summary.revenue_by_platform {
                body.push_str(&format!(
                    "  {}: ${:.2}\n",
                    platform.name,
                    platform.amount_cents as f64 / 100.0
                ));
            }
        }

        self.email.send(&user.email, &subject, &body).await?;
        Ok(())
    }
}
