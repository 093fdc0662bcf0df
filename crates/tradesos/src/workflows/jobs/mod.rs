//! Job matching and tiered notification engine.
//!
//! A posted job's postcode is normalized into coverage keys, matched against the
//! verified trade directory, and announced to premium trades ahead of standard
//! ones. Acceptance is first-come-first-served behind a conditional status update.

pub mod domain;
pub mod geo;
pub mod lifecycle;
pub mod matching;
pub mod notify;
pub mod postcode;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Acceptance, CancelActor, ContactDetails, CoverageProfile, CustomerId, Job, JobFields, JobId,
    JobStatus, JobView, PlanTier, Trade, TradeId, Urgency,
};
pub use geo::{approximate_coordinate, distance_km, Coordinate, InvalidCoordinate};
pub use lifecycle::{JobLifecycleController, LifecycleError};
pub use matching::{CoverageMatcher, MatchReason};
pub use notify::{
    DeliveryError, NotificationBatch, NotificationMessage, NotificationResult, NotificationSender,
    NotifierSettings, StandardDelivery, TierNotifier,
};
pub use postcode::{normalize, PostcodeError, PostcodeKey};
pub use repository::{JobRepository, RepositoryError, TradeRepository};
pub use router::{
    job_router, AcceptJobRequest, AdvanceStatusRequest, ArrivalRequest, CancelJobRequest,
    CoverageUpdateRequest, PostJobRequest,
};
pub use service::{ArrivalEstimate, JobMatchingService, JobServiceError, PostedJob};
