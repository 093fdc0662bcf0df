use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::config::MatchingConfig;
use crate::workflows::jobs::domain::{
    Acceptance, CoverageProfile, CustomerId, Job, JobFields, JobId, JobStatus, PlanTier, Trade,
    TradeId, Urgency,
};
use crate::workflows::jobs::geo::approximate_coordinate;
use crate::workflows::jobs::notify::{DeliveryError, NotificationSender};
use crate::workflows::jobs::postcode::normalize;
use crate::workflows::jobs::repository::{JobRepository, RepositoryError, TradeRepository};
use crate::workflows::jobs::service::JobMatchingService;

pub(super) const WINDOW: Duration = Duration::from_secs(180);

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        premium_first_access: WINDOW,
        ..MatchingConfig::default()
    }
}

pub(super) fn fields() -> JobFields {
    JobFields {
        title: "Boiler not firing".to_string(),
        category: "heating".to_string(),
        description: "No hot water since this morning".to_string(),
        customer_id: Some(CustomerId("cust-1".to_string())),
        contact: None,
    }
}

pub(super) fn trade(id: &str, tier: PlanTier, areas: &[&str], districts: &[&str]) -> Trade {
    Trade {
        id: TradeId(id.to_string()),
        company: format!("{id} Ltd"),
        email: Some(format!("{id}@trades.test")),
        verified: true,
        plan_tier: tier,
        coverage: CoverageProfile::new(areas.iter().copied(), districts.iter().copied()),
    }
}

pub(super) fn posted_job(id: &str, postcode: &str) -> Job {
    let key = normalize(postcode).expect("valid postcode");
    let coordinate = approximate_coordinate(key.area());
    Job::posted(
        JobId(id.to_string()),
        key,
        coordinate,
        Urgency::Urgent2h,
        fields(),
        Utc::now(),
    )
}

pub(super) type TestService = JobMatchingService<MemoryJobs, MemoryTrades, RecordingSender>;

pub(super) fn build_service(
    trades: Vec<Trade>,
    config: MatchingConfig,
) -> (TestService, Arc<MemoryJobs>, Arc<RecordingSender>) {
    let jobs = Arc::new(MemoryJobs::default());
    let sender = Arc::new(RecordingSender::default());
    let service = JobMatchingService::new(
        jobs.clone(),
        Arc::new(MemoryTrades::new(trades)),
        sender.clone(),
        config,
    );
    (service, jobs, sender)
}

#[derive(Default, Clone)]
pub(super) struct MemoryJobs {
    pub(super) records: Arc<Mutex<BTreeMap<JobId, Job>>>,
}

impl MemoryJobs {
    pub(super) fn insert(&self, job: Job) {
        self.records
            .lock()
            .expect("job mutex poisoned")
            .insert(job.id.clone(), job);
    }
}

impl JobRepository for MemoryJobs {
    fn save(&self, job: Job) -> Result<JobId, RepositoryError> {
        let mut guard = self.records.lock().expect("job mutex poisoned");
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = job.id.clone();
        guard.insert(id.clone(), job);
        Ok(id)
    }

    fn get(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.records.lock().expect("job mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn compare_and_set_status(
        &self,
        id: &JobId,
        expected: JobStatus,
        next: JobStatus,
        acceptance: Option<Acceptance>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("job mutex poisoned");
        let job = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if job.status != expected {
            return Ok(false);
        }
        job.apply_transition(next, acceptance, Utc::now());
        Ok(true)
    }

    fn open_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.records.lock().expect("job mutex poisoned");
        Ok(guard
            .values()
            .filter(|job| job.status == JobStatus::Posted)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryTrades {
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl MemoryTrades {
    pub(super) fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades: Arc::new(Mutex::new(trades)),
        }
    }
}

impl TradeRepository for MemoryTrades {
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

pub(super) struct UnavailableTrades;

impl TradeRepository for UnavailableTrades {
    fn list_verified_trades(&self) -> Result<Vec<Trade>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn fetch(&self, _id: &TradeId) -> Result<Option<Trade>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn update_coverage(
        &self,
        _id: &TradeId,
        _coverage: CoverageProfile,
    ) -> Result<Trade, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

/// Records every send in order; trade ids in `failing` get a transport error.
#[derive(Default, Clone)]
pub(super) struct RecordingSender {
    sent: Arc<Mutex<Vec<(TradeId, bool)>>>,
    failing: HashSet<TradeId>,
}

impl RecordingSender {
    pub(super) fn failing_for(ids: &[&str]) -> Self {
        Self {
            sent: Arc::default(),
            failing: ids.iter().map(|id| TradeId(id.to_string())).collect(),
        }
    }

    pub(super) fn sent(&self) -> Vec<(TradeId, bool)> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }

    pub(super) fn sent_ids(&self) -> Vec<String> {
        self.sent().into_iter().map(|(id, _)| id.0).collect()
    }
}

impl NotificationSender for RecordingSender {
    fn send(&self, recipient: &Trade, _job: &Job, is_premium: bool) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("sender mutex poisoned")
            .push((recipient.id.clone(), is_premium));
        if self.failing.contains(&recipient.id) {
            return Err(DeliveryError::Transport("smtp timeout".to_string()));
        }
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
