use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CancelActor, ContactDetails, CoverageProfile, CustomerId, JobFields, JobId, JobStatus,
    JobView, TradeId, Urgency,
};
use super::geo::{Coordinate, InvalidCoordinate};
use super::lifecycle::LifecycleError;
use super::notify::{NotificationResult, NotificationSender};
use super::repository::{JobRepository, RepositoryError, TradeRepository};
use super::service::{JobMatchingService, JobServiceError};

/// Intake form payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostJobRequest {
    pub postcode: String,
    pub urgency: Urgency,
    pub title: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcceptJobRequest {
    pub trade_id: TradeId,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdvanceStatusRequest {
    pub trade_id: TradeId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CancelJobRequest {
    pub actor: CancelActor,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArrivalRequest {
    pub lat: f64,
    pub lon: f64,
}

/// Coverage edit submitted by a trade. Omitted radius fields clear the radius.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoverageUpdateRequest {
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub districts: Vec<String>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub home: Option<Coordinate>,
}

impl CoverageUpdateRequest {
    fn into_profile(self) -> Result<CoverageProfile, InvalidCoordinate> {
        let profile = CoverageProfile::new(self.areas, self.districts);
        match (self.radius_km, self.home) {
            (Some(radius_km), Some(home)) => {
                let home = Coordinate::new(home.lat, home.lon)?;
                Ok(profile.with_radius(radius_km, home))
            }
            _ => Ok(profile),
        }
    }
}

#[derive(Debug, Serialize)]
struct PostedJobResponse {
    job: JobView,
    notifications: NotificationResult,
}

/// Router builder exposing intake, acceptance and lifecycle endpoints.
pub fn job_router<J, T, N>(service: Arc<JobMatchingService<J, T, N>>) -> Router
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route("/api/v1/jobs", post(post_job_handler::<J, T, N>))
        .route("/api/v1/jobs/:job_id", get(job_handler::<J, T, N>))
        .route(
            "/api/v1/jobs/:job_id/accept",
            post(accept_handler::<J, T, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/status",
            post(advance_handler::<J, T, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/cancel",
            post(cancel_handler::<J, T, N>),
        )
        .route("/api/v1/jobs/:job_id/eta", post(eta_handler::<J, T, N>))
        .route(
            "/api/v1/trades/:trade_id/jobs",
            get(open_jobs_handler::<J, T, N>),
        )
        .route(
            "/api/v1/trades/:trade_id/coverage",
            put(coverage_handler::<J, T, N>),
        )
        .with_state(service)
}

pub(crate) async fn post_job_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    axum::Json(request): axum::Json<PostJobRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    let PostJobRequest {
        postcode,
        urgency,
        title,
        category,
        description,
        customer_id,
        contact,
    } = request;

    let fields = JobFields {
        title,
        category,
        description,
        customer_id,
        contact,
    };

    match service.post_job(&postcode, urgency, fields) {
        Ok(posted) => {
            let payload = PostedJobResponse {
                job: posted.job.view(),
                notifications: posted.notifications,
            };
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn job_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(job_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.get(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, axum::Json(job.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn accept_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<AcceptJobRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.accept_job(&JobId(job_id), &request.trade_id) {
        Ok(job) => (StatusCode::OK, axum::Json(job.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<AdvanceStatusRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.advance_job_status(&JobId(job_id), &request.trade_id, request.status) {
        Ok(job) => (StatusCode::OK, axum::Json(job.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<CancelJobRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.cancel_job(&JobId(job_id), &request.actor) {
        Ok(job) => (StatusCode::OK, axum::Json(job.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn eta_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<ArrivalRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    let from = match Coordinate::new(request.lat, request.lon) {
        Ok(coordinate) => coordinate,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match service.estimate_arrival(&JobId(job_id), from) {
        Ok(estimate) => (StatusCode::OK, axum::Json(estimate)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_jobs_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(trade_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.open_jobs_for_trade(&TradeId(trade_id)) {
        Ok(jobs) => {
            let views: Vec<JobView> = jobs.iter().map(|job| job.view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn coverage_handler<J, T, N>(
    State(service): State<Arc<JobMatchingService<J, T, N>>>,
    Path(trade_id): Path<String>,
    axum::Json(request): axum::Json<CoverageUpdateRequest>,
) -> Response
where
    J: JobRepository + 'static,
    T: TradeRepository + 'static,
    N: NotificationSender + 'static,
{
    let coverage = match request.into_profile() {
        Ok(coverage) => coverage,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match service.update_trade_coverage(&TradeId(trade_id), coverage) {
        Ok(trade) => (StatusCode::OK, axum::Json(trade.coverage)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: JobServiceError) -> Response {
    // Lifecycle storage failures arrive as `JobServiceError::Repository`.
    let status = match &error {
        JobServiceError::Postcode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JobServiceError::Lifecycle(LifecycleError::JobNotAvailable) => StatusCode::CONFLICT,
        JobServiceError::Lifecycle(LifecycleError::Forbidden) => StatusCode::FORBIDDEN,
        JobServiceError::Lifecycle(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JobServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        JobServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        JobServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
