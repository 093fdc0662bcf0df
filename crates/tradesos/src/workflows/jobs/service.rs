use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{
    CancelActor, CoverageProfile, Job, JobFields, JobId, JobStatus, Trade, TradeId, Urgency,
};
use super::geo::{approximate_coordinate, distance_km, travel_minutes, Coordinate};
use super::lifecycle::{JobLifecycleController, LifecycleError};
use super::matching::CoverageMatcher;
use super::notify::{
    NotificationBatch, NotificationResult, NotificationSender, NotifierSettings, TierNotifier,
};
use super::postcode::{normalize, PostcodeError};
use super::repository::{JobRepository, RepositoryError, TradeRepository};
use crate::config::MatchingConfig;

/// Facade the intake and trade-acceptance handlers call into.
pub struct JobMatchingService<J, T, N> {
    jobs: Arc<J>,
    trades: Arc<T>,
    matcher: CoverageMatcher,
    notifier: TierNotifier<J, N>,
    lifecycle: JobLifecycleController<J>,
    travel_speed_kmh: f64,
    sequence: AtomicU64,
}

/// Outcome of a job posting: the stored job plus what dispatch attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostedJob {
    pub job: Job,
    pub notifications: NotificationResult,
    /// The cohorts dispatch worked from.
    #[serde(skip)]
    pub cohorts: NotificationBatch,
}

/// Straight-line distance and drive time from a trade's position to a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrivalEstimate {
    pub distance_km: f64,
    pub eta_minutes: u32,
}

impl<J, T, N> JobMatchingService<J, T, N>
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(jobs: Arc<J>, trades: Arc<T>, sender: Arc<N>, config: MatchingConfig) -> Self {
        let notifier = TierNotifier::new(
            Arc::clone(&jobs),
            sender,
            NotifierSettings {
                premium_first_access: config.premium_first_access,
                enabled: config.notifications_enabled,
            },
        );

        Self {
            lifecycle: JobLifecycleController::new(Arc::clone(&jobs)),
            jobs,
            trades,
            matcher: CoverageMatcher::new(config.radius_filter),
            notifier,
            travel_speed_kmh: config.travel_speed_kmh,
            sequence: AtomicU64::new(1),
        }
    }

    fn next_job_id(&self) -> JobId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        JobId(format!("job-{id:06}"))
    }

    /// Normalize, match, persist and notify.
    ///
    /// An invalid postcode or an unreachable trade directory is rejected
    /// before anything is stored. Delivery failures are logged by the notifier
    /// and never fail the posting.
    pub fn post_job(
        &self,
        raw_postcode: &str,
        urgency: Urgency,
        fields: JobFields,
    ) -> Result<PostedJob, JobServiceError> {
        let postcode = normalize(raw_postcode)?;
        let coordinate = approximate_coordinate(postcode.area());

        let job = Job::posted(
            self.next_job_id(),
            postcode,
            coordinate,
            urgency,
            fields,
            Utc::now(),
        );
        let matches = self.matcher.find_matches(&job, self.trades.as_ref())?;
        self.jobs.save(job.clone())?;

        info!(
            job_id = %job.id,
            area = job.postcode.area(),
            district = job.postcode.district(),
            urgency = urgency.as_str(),
            sla_minutes = job.sla_minutes,
            "job posted"
        );

        let cohorts = NotificationBatch::partition(job.id.clone(), matches);
        let notifications = self.notifier.dispatch_batch(&job, &cohorts);

        Ok(PostedJob {
            job,
            notifications,
            cohorts,
        })
    }

    /// Only a known, verified trade may try to accept.
    pub fn accept_job(&self, job_id: &JobId, trade_id: &TradeId) -> Result<Job, JobServiceError> {
        self.get(job_id)?;

        let eligible = self
            .trades
            .fetch(trade_id)?
            .is_some_and(|trade| trade.verified);
        if !eligible {
            return Err(LifecycleError::Forbidden.into());
        }

        Ok(self.lifecycle.accept(job_id, trade_id)?)
    }

    pub fn advance_job_status(
        &self,
        job_id: &JobId,
        actor_trade_id: &TradeId,
        target: JobStatus,
    ) -> Result<Job, JobServiceError> {
        Ok(self.lifecycle.advance(job_id, actor_trade_id, target)?)
    }

    pub fn cancel_job(&self, job_id: &JobId, actor: &CancelActor) -> Result<Job, JobServiceError> {
        Ok(self.lifecycle.cancel(job_id, actor)?)
    }

    pub fn get(&self, job_id: &JobId) -> Result<Job, JobServiceError> {
        let job = self.jobs.get(job_id)?.ok_or(RepositoryError::NotFound)?;
        Ok(job)
    }

    /// Posted jobs the trade's coverage matches, oldest first.
    pub fn open_jobs_for_trade(&self, trade_id: &TradeId) -> Result<Vec<Job>, JobServiceError> {
        let trade = self
            .trades
            .fetch(trade_id)?
            .ok_or(RepositoryError::NotFound)?;

        let mut jobs: Vec<Job> = self
            .jobs
            .open_jobs()?
            .into_iter()
            .filter(|job| self.matcher.matches(&trade, job).is_some())
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(jobs)
    }

    /// Trade-initiated profile edit; later postings match against the new coverage.
    pub fn update_trade_coverage(
        &self,
        trade_id: &TradeId,
        coverage: CoverageProfile,
    ) -> Result<Trade, JobServiceError> {
        let trade = self.trades.update_coverage(trade_id, coverage)?;
        info!(
            trade_id = %trade.id,
            areas = trade.coverage.areas.len(),
            districts = trade.coverage.districts.len(),
            radius_km = ?trade.coverage.radius_km,
            "trade coverage updated"
        );
        Ok(trade)
    }

    pub fn estimate_arrival(
        &self,
        job_id: &JobId,
        from: Coordinate,
    ) -> Result<ArrivalEstimate, JobServiceError> {
        let job = self.get(job_id)?;
        let distance = distance_km(from, job.coordinate);

        Ok(ArrivalEstimate {
            distance_km: (distance * 10.0).round() / 10.0,
            eta_minutes: travel_minutes(distance, self.travel_speed_kmh),
        })
    }
}

/// Error raised by the job matching service.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error(transparent)]
    Postcode(#[from] PostcodeError),
    #[error(transparent)]
    Lifecycle(LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<LifecycleError> for JobServiceError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Repository(error) => Self::Repository(error),
            other => Self::Lifecycle(other),
        }
    }
}
