use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{Acceptance, CancelActor, Job, JobId, JobStatus, TradeId};
use super::repository::{JobRepository, RepositoryError};

/// Owns the job status state machine.
///
/// Every write goes through [`JobRepository::compare_and_set_status`], so two
/// actors racing on the same job can never both succeed.
pub struct JobLifecycleController<J> {
    jobs: Arc<J>,
}

impl<J> JobLifecycleController<J>
where
    J: JobRepository,
{
    pub fn new(jobs: Arc<J>) -> Self {
        Self { jobs }
    }

    /// `posted -> accepted`. Losers of a race get [`LifecycleError::JobNotAvailable`].
    pub fn accept(&self, job_id: &JobId, trade_id: &TradeId) -> Result<Job, LifecycleError> {
        let acceptance = Acceptance {
            trade_id: trade_id.clone(),
            accepted_at: Utc::now(),
        };

        let won = self.jobs.compare_and_set_status(
            job_id,
            JobStatus::Posted,
            JobStatus::Accepted,
            Some(acceptance),
        )?;

        if !won {
            info!(%job_id, %trade_id, "acceptance rejected; job no longer available");
            return Err(LifecycleError::JobNotAvailable);
        }

        info!(%job_id, %trade_id, "job accepted");
        self.load(job_id)
    }

    /// One sequential step by the accepted trade: `accepted -> en_route ->
    /// in_progress -> completed`.
    pub fn advance(
        &self,
        job_id: &JobId,
        actor: &TradeId,
        target: JobStatus,
    ) -> Result<Job, LifecycleError> {
        let job = self.load(job_id)?;

        if job.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from: job.status,
                to: target,
            });
        }
        if job.accepted_trade_id.as_ref() != Some(actor) {
            return Err(LifecycleError::Forbidden);
        }
        if job.status.successor() != Some(target) {
            return Err(LifecycleError::InvalidTransition {
                from: job.status,
                to: target,
            });
        }

        if !self
            .jobs
            .compare_and_set_status(job_id, job.status, target, None)?
        {
            let current = self.load(job_id)?;
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        info!(%job_id, trade_id = %actor, from = %job.status, to = %target, "job status advanced");
        self.load(job_id)
    }

    /// Any non-terminal state to `canceled`, by the owning customer or an admin.
    pub fn cancel(&self, job_id: &JobId, actor: &CancelActor) -> Result<Job, LifecycleError> {
        loop {
            let job = self.load(job_id)?;

            if job.status.is_terminal() {
                return Err(LifecycleError::InvalidTransition {
                    from: job.status,
                    to: JobStatus::Canceled,
                });
            }
            authorize_cancel(&job, actor)?;

            // A failed swap means the job moved on underneath us; re-check from
            // its new state. Each retry follows a forward transition, so this ends.
            if self
                .jobs
                .compare_and_set_status(job_id, job.status, JobStatus::Canceled, None)?
            {
                info!(%job_id, from = %job.status, ?actor, "job canceled");
                return self.load(job_id);
            }
        }
    }

    fn load(&self, job_id: &JobId) -> Result<Job, LifecycleError> {
        self.jobs
            .get(job_id)?
            .ok_or(LifecycleError::Repository(RepositoryError::NotFound))
    }
}

fn authorize_cancel(job: &Job, actor: &CancelActor) -> Result<(), LifecycleError> {
    match actor {
        CancelActor::Admin => Ok(()),
        CancelActor::Customer(customer_id) => {
            if job.fields.customer_id.as_ref() == Some(customer_id) {
                Ok(())
            } else {
                Err(LifecycleError::Forbidden)
            }
        }
    }
}

/// Error raised by lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("job is no longer available")]
    JobNotAvailable,
    #[error("actor is not allowed to change this job")]
    Forbidden,
    #[error("cannot move job from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
