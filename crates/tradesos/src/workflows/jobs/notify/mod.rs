//! Tiered delivery of new-job alerts.
//!
//! Premium trades hear about a job first. Standard trades are held back for the
//! premium-first-access window on a spawned timer, and only when at least one
//! premium trade matched. Pending timers live in memory: a process restart drops
//! any standard-tier alerts that had not fired yet.

mod message;

pub use message::NotificationMessage;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::domain::{Job, JobId, JobStatus, PlanTier, Trade};
use super::repository::JobRepository;

/// Outbound notification hook (e-mail, SMS, push adapters).
pub trait NotificationSender: Send + Sync {
    fn send(&self, recipient: &Trade, job: &Job, is_premium: bool) -> Result<(), DeliveryError>;
}

/// Per-recipient transport failure. Never escapes the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Recipients of one job posting split by plan tier, matcher order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationBatch {
    pub job_id: JobId,
    pub premium_recipients: Vec<Trade>,
    pub standard_recipients: Vec<Trade>,
}

impl NotificationBatch {
    pub fn partition(job_id: JobId, matches: Vec<Trade>) -> Self {
        let (premium_recipients, standard_recipients): (Vec<Trade>, Vec<Trade>) = matches
            .into_iter()
            .partition(|trade| trade.plan_tier == PlanTier::Premium);

        Self {
            job_id,
            premium_recipients,
            standard_recipients,
        }
    }
}

/// When the standard cohort is (or will be) contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum StandardDelivery {
    /// Sent straight away because no premium trade matched.
    Immediate,
    /// Scheduled to fire after the premium-first-access window.
    Deferred { delay_secs: u64 },
    /// Nothing to send, or notifications are switched off.
    Skipped,
}

/// Recipients attempted per cohort; delivery outcomes are only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    pub job_id: JobId,
    pub premium_attempted: usize,
    /// For a deferred cohort this counts the recipients scheduled.
    pub standard_attempted: usize,
    pub standard_delivery: StandardDelivery,
}

/// Settings the notifier needs from the matching configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierSettings {
    pub premium_first_access: Duration,
    pub enabled: bool,
}

/// Sends premium alerts immediately and schedules the standard cohort.
pub struct TierNotifier<J, N> {
    jobs: Arc<J>,
    sender: Arc<N>,
    settings: NotifierSettings,
}

impl<J, N> TierNotifier<J, N>
where
    J: JobRepository + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(jobs: Arc<J>, sender: Arc<N>, settings: NotifierSettings) -> Self {
        Self {
            jobs,
            sender,
            settings,
        }
    }

    /// Fan out alerts for a freshly posted job.
    ///
    /// Returns once the premium cohort has been attempted and any standard
    /// cohort has been sent or scheduled; it never waits for the window.
    /// Without a Tokio runtime to host the timer the deferred cohort is
    /// skipped.
    pub fn dispatch(&self, job: &Job, matches: Vec<Trade>) -> NotificationResult {
        let batch = NotificationBatch::partition(job.id.clone(), matches);
        self.dispatch_batch(job, &batch)
    }

    /// Same as [`TierNotifier::dispatch`] for cohorts the caller already partitioned.
    pub fn dispatch_batch(&self, job: &Job, batch: &NotificationBatch) -> NotificationResult {
        let job_id = batch.job_id.clone();
        let premium_recipients = &batch.premium_recipients;
        let standard_recipients = &batch.standard_recipients;

        info!(
            %job_id,
            premium = premium_recipients.len(),
            standard = standard_recipients.len(),
            "partitioned notification cohorts"
        );

        if !self.settings.enabled {
            info!(%job_id, "notifications disabled; nothing sent");
            return NotificationResult {
                job_id,
                premium_attempted: 0,
                standard_attempted: 0,
                standard_delivery: StandardDelivery::Skipped,
            };
        }

        let premium_attempted = deliver_cohort(self.sender.as_ref(), job, premium_recipients, true);

        let (standard_attempted, standard_delivery) = if standard_recipients.is_empty() {
            (0, StandardDelivery::Skipped)
        } else if premium_recipients.is_empty() {
            let attempted = deliver_cohort(self.sender.as_ref(), job, standard_recipients, false);
            (attempted, StandardDelivery::Immediate)
        } else if self.schedule_standard(job_id.clone(), standard_recipients.clone()) {
            (
                standard_recipients.len(),
                StandardDelivery::Deferred {
                    delay_secs: self.settings.premium_first_access.as_secs(),
                },
            )
        } else {
            (0, StandardDelivery::Skipped)
        };

        NotificationResult {
            job_id,
            premium_attempted,
            standard_attempted,
            standard_delivery,
        }
    }

    /// Returns `false` when there is no runtime to host the timer.
    fn schedule_standard(&self, job_id: JobId, recipients: Vec<Trade>) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                %job_id,
                recipients = recipients.len(),
                "no async runtime to schedule standard cohort; skipped"
            );
            return false;
        };

        let jobs = Arc::clone(&self.jobs);
        let sender = Arc::clone(&self.sender);
        let delay = self.settings.premium_first_access;

        info!(
            %job_id,
            recipients = recipients.len(),
            delay_secs = delay.as_secs(),
            "scheduled standard cohort"
        );

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            // Status is re-read here, not at scheduling time.
            match jobs.get(&job_id) {
                Ok(Some(job)) if job.status == JobStatus::Posted => {
                    let attempted = deliver_cohort(sender.as_ref(), &job, &recipients, false);
                    info!(%job_id, attempted, "delivered deferred standard cohort");
                }
                Ok(Some(job)) => {
                    info!(%job_id, status = %job.status, "suppressed deferred standard cohort");
                }
                Ok(None) => {
                    warn!(%job_id, "job vanished before deferred standard cohort fired");
                }
                Err(error) => {
                    warn!(%job_id, %error, "could not load job for deferred standard cohort");
                }
            }
        });
        true
    }
}

/// Sends to each recipient in turn, isolating failures. Returns recipients attempted.
fn deliver_cohort<N>(sender: &N, job: &Job, recipients: &[Trade], is_premium: bool) -> usize
where
    N: NotificationSender + ?Sized,
{
    let mut attempted = 0;
    let mut failed = 0;

    for trade in recipients {
        if trade.email.as_deref().map_or(true, |email| email.trim().is_empty()) {
            debug!(job_id = %job.id, trade_id = %trade.id, "trade has no contact address; skipped");
            continue;
        }

        attempted += 1;
        if let Err(error) = sender.send(trade, job, is_premium) {
            failed += 1;
            warn!(job_id = %job.id, trade_id = %trade.id, is_premium, %error, "notification delivery failed");
        }
    }

    if failed > 0 {
        warn!(job_id = %job.id, is_premium, attempted, failed, "cohort finished with delivery failures");
    }

    attempted
}
