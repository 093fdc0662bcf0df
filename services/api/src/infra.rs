use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use tradesos::workflows::jobs::{
    Acceptance, Coordinate, CoverageProfile, DeliveryError, Job, JobId, JobRepository, JobStatus,
    NotificationMessage, NotificationSender, PlanTier, RepositoryError, Trade, TradeId,
    TradeRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJobRepository {
    records: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl JobRepository for InMemoryJobRepository {
    fn save(&self, job: Job) -> Result<JobId, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = job.id.clone();
        guard.insert(id.clone(), job);
        Ok(id)
    }

    fn get(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn compare_and_set_status(
        &self,
        id: &JobId,
        expected: JobStatus,
        next: JobStatus,
        acceptance: Option<Acceptance>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let job = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if job.status != expected {
            return Ok(false);
        }
        job.apply_transition(next, acceptance, Utc::now());
        Ok(true)
    }

    fn open_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|job| job.status == JobStatus::Posted)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTradeRepository {
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl InMemoryTradeRepository {
    pub(crate) fn with_trades(trades: Vec<Trade>) -> Self {
        Self {
            trades: Arc::new(Mutex::new(trades)),
        }
    }
}

impl TradeRepository for InMemoryTradeRepository {
    fn list_verified_trades(&self) -> Result<Vec<Trade>, RepositoryError> {
        let guard = self.trades.lock().expect("trade mutex poisoned");
        Ok(guard.iter().filter(|trade| trade.verified).cloned().collect())
    }

    fn fetch(&self, id: &TradeId) -> Result<Option<Trade>, RepositoryError> {
        let guard = self.trades.lock().expect("trade mutex poisoned");
        Ok(guard.iter().find(|trade| &trade.id == id).cloned())
    }

    fn update_coverage(
        &self,
        id: &TradeId,
        coverage: CoverageProfile,
    ) -> Result<Trade, RepositoryError> {
        let mut guard = self.trades.lock().expect("trade mutex poisoned");
        let trade = guard
            .iter_mut()
            .find(|trade| &trade.id == id)
            .ok_or(RepositoryError::NotFound)?;
        trade.update_coverage(coverage);
        Ok(trade.clone())
    }
}

/// Renders alerts and writes them to the log instead of a mail relay.
///
/// Only a [`LoggingNotificationSender::recording`] sender keeps what it sent.
#[derive(Clone)]
pub(crate) struct LoggingNotificationSender {
    base_url: String,
    outbox: Option<Arc<Mutex<Vec<NotificationMessage>>>>,
}

impl LoggingNotificationSender {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            outbox: None,
        }
    }

    /// Also retains every rendered message, for the demo walkthrough.
    pub(crate) fn recording(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            outbox: Some(Arc::default()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<NotificationMessage> {
        self.outbox
            .as_ref()
            .map(|outbox| outbox.lock().expect("outbox mutex poisoned").clone())
            .unwrap_or_default()
    }
}

impl NotificationSender for LoggingNotificationSender {
    fn send(&self, recipient: &Trade, job: &Job, is_premium: bool) -> Result<(), DeliveryError> {
        let message = NotificationMessage::render(job, recipient, is_premium, &self.base_url)
            .ok_or_else(|| DeliveryError::Transport(format!("{} has no address", recipient.id)))?;

        info!(
            job_id = %job.id,
            trade_id = %recipient.id,
            recipient = %message.recipient,
            subject = %message.subject,
            is_premium,
            "notification sent"
        );

        if let Some(outbox) = &self.outbox {
            outbox.lock().expect("outbox mutex poisoned").push(message);
        }
        Ok(())
    }
}

/// Seed directory used by the demo and non-production servers.
pub(crate) fn sample_trades() -> Vec<Trade> {
    let manchester = Coordinate {
        lat: 53.4808,
        lon: -2.2426,
    };

    vec![
        sample_trade(
            "trade-northern-heat",
            "Northern Heat & Gas",
            PlanTier::Premium,
            CoverageProfile::new(["M"], ["LS1"]),
        ),
        sample_trade(
            "trade-pennine-plumbing",
            "Pennine Plumbing",
            PlanTier::Premium,
            CoverageProfile::new(Vec::<&str>::new(), ["M1", "M2", "M4"]),
        ),
        sample_trade(
            "trade-city-sparks",
            "City Sparks Electrical",
            PlanTier::Standard,
            CoverageProfile::new(["M", "SK"], Vec::<&str>::new()),
        ),
        sample_trade(
            "trade-salford-locks",
            "Salford Locksmiths",
            PlanTier::Standard,
            CoverageProfile::default().with_radius(15.0, manchester),
        ),
        sample_trade(
            "trade-aire-roofing",
            "Aire Valley Roofing",
            PlanTier::Standard,
            CoverageProfile::new(["LS", "BD"], Vec::<&str>::new()),
        ),
        sample_trade(
            "trade-capital-drains",
            "Capital Drains",
            PlanTier::Premium,
            CoverageProfile::new(["SW", "SE", "W", "EC", "WC"], Vec::<&str>::new()),
        ),
    ]
}

fn sample_trade(id: &str, company: &str, plan_tier: PlanTier, coverage: CoverageProfile) -> Trade {
    Trade {
        id: TradeId(id.to_string()),
        company: company.to_string(),
        email: Some(format!("dispatch@{}.example", id.trim_start_matches("trade-"))),
        verified: true,
        plan_tier,
        coverage,
    }
}
