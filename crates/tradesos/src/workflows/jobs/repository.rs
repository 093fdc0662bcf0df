use super::domain::{Acceptance, CoverageProfile, Job, JobId, JobStatus, Trade, TradeId};

/// Read access to the trade directory.
pub trait TradeRepository: Send + Sync {
    /// Verified trades with coverage and plan tier populated, in a stable order.
    fn list_verified_trades(&self) -> Result<Vec<Trade>, RepositoryError>;
    fn fetch(&self, id: &TradeId) -> Result<Option<Trade>, RepositoryError>;

    /// Replaces a trade's coverage. Unknown ids fail with [`RepositoryError::NotFound`].
    fn update_coverage(
        &self,
        id: &TradeId,
        coverage: CoverageProfile,
    ) -> Result<Trade, RepositoryError>;
}

/// Job persistence, including the conditional status update that guards acceptance.
pub trait JobRepository: Send + Sync {
    fn save(&self, job: Job) -> Result<JobId, RepositoryError>;
    fn get(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;

    /// Atomically moves the job from `expected` to `next`.
    ///
    /// Returns `Ok(false)` without touching the record when the stored status is
    /// not `expected`. A successful update applies `acceptance` (when given) via
    /// [`Job::apply_transition`]. Unknown ids fail with [`RepositoryError::NotFound`].
    fn compare_and_set_status(
        &self,
        id: &JobId,
        expected: JobStatus,
        next: JobStatus,
        acceptance: Option<Acceptance>,
    ) -> Result<bool, RepositoryError>;

    /// Jobs still in the `posted` state.
    fn open_jobs(&self) -> Result<Vec<Job>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
