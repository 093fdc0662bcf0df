use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::jobs::domain::{PlanTier, Urgency};
use crate::workflows::jobs::router::{job_router, AcceptJobRequest, ArrivalRequest};
use crate::workflows::jobs::service::JobMatchingService;

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

fn intake(postcode: &str) -> Value {
    json!({
        "postcode": postcode,
        "urgency": "urgent_2h",
        "title": "Burst pipe",
        "category": "plumbing",
        "description": "Water coming through the ceiling",
        "customer_id": "cust-1",
    })
}

fn router_with(trades: Vec<crate::workflows::jobs::domain::Trade>) -> (Router, Arc<TestService>) {
    let (service, _, _) = build_service(trades, matching_config());
    let service = Arc::new(service);
    (job_router(service.clone()), service)
}

#[tokio::test]
async fn post_route_creates_job() {
    let (router, _) = router_with(vec![trade("t1", PlanTier::Standard, &["M"], &[])]);

    let response = router
        .oneshot(json_request("POST", "/api/v1/jobs", intake("m11aa")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["job"]["status"], "posted");
    assert_eq!(payload["job"]["postcode_full"], "M1 1AA");
    assert_eq!(payload["job"]["postcode_area"], "M");
    assert_eq!(payload["job"]["postcode_district"], "M1");
    assert_eq!(payload["job"]["sla_minutes"], 120);
    assert_eq!(payload["job"]["urgency"], "urgent_2h");
    assert!(payload["job"].get("accepted_trade_id").is_none());
    assert_eq!(payload["notifications"]["standard_attempted"], 1);
    assert_eq!(
        payload["notifications"]["standard_delivery"]["mode"],
        "immediate"
    );
}

#[tokio::test]
async fn post_route_rejects_invalid_postcode() {
    let (router, _) = router_with(Vec::new());

    let response = router
        .oneshot(json_request("POST", "/api/v1/jobs", intake("12345")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("not a valid UK postcode"));
}

#[tokio::test]
async fn accept_route_returns_conflict_for_second_trade() {
    let (router, service) = router_with(vec![
        trade("t1", PlanTier::Standard, &["M"], &[]),
        trade("t2", PlanTier::Standard, &["M"], &[]),
    ]);
    let job_id = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted")
        .job
        .id;
    let uri = format!("/api/v1/jobs/{job_id}/accept");

    let first = router
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "trade_id": "t1" })))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);
    let payload = read_json_body(first).await;
    assert_eq!(payload["status"], "accepted");
    assert_eq!(payload["accepted_trade_id"], "t1");

    let second = router
        .oneshot(json_request("POST", &uri, json!({ "trade_id": "t2" })))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn accept_handler_forbids_unverified_trade() {
    let mut pending = trade("pending", PlanTier::Premium, &["M"], &[]);
    pending.verified = false;
    let (service, _, _) = build_service(vec![pending], matching_config());
    let service = Arc::new(service);
    let job_id = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted")
        .job
        .id;

    let response = crate::workflows::jobs::router::accept_handler::<
        MemoryJobs,
        MemoryTrades,
        RecordingSender,
    >(
        State(service),
        Path(job_id.0),
        axum::Json(AcceptJobRequest {
            trade_id: crate::workflows::jobs::domain::TradeId("pending".to_string()),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_route_rejects_skipped_steps() {
    let (router, service) = router_with(vec![trade("t1", PlanTier::Standard, &["M"], &[])]);
    let job_id = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted")
        .job
        .id;
    let uri = format!("/api/v1/jobs/{job_id}/status");

    router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/jobs/{job_id}/accept"),
            json!({ "trade_id": "t1" }),
        ))
        .await
        .expect("route executes");

    let skipped = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "trade_id": "t1", "status": "completed" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(skipped.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stranger = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "trade_id": "t9", "status": "en_route" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let step = router
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "trade_id": "t1", "status": "en_route" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(step.status(), StatusCode::OK);
    assert_eq!(read_json_body(step).await["status"], "en_route");
}

#[tokio::test]
async fn cancel_route_checks_ownership() {
    let (router, service) = router_with(Vec::new());
    let job_id = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted")
        .job
        .id;
    let uri = format!("/api/v1/jobs/{job_id}/cancel");

    let intruder = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "actor": { "customer": "cust-2" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(intruder.status(), StatusCode::FORBIDDEN);

    let owner = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "actor": { "customer": "cust-1" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(read_json_body(owner).await["status"], "canceled");

    let again = router
        .oneshot(json_request("POST", &uri, json!({ "actor": "admin" })))
        .await
        .expect("route executes");
    assert_eq!(again.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn missing_job_returns_not_found() {
    let (router, _) = router_with(Vec::new());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/job-404")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lifecycle_routes_report_unknown_jobs_as_not_found() {
    let (router, _) = router_with(vec![trade("t1", PlanTier::Standard, &["M"], &[])]);

    let cancel = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/jobs/job-404/cancel",
            json!({ "actor": "admin" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(cancel.status(), StatusCode::NOT_FOUND);

    let advance = router
        .oneshot(json_request(
            "POST",
            "/api/v1/jobs/job-404/status",
            json!({ "trade_id": "t1", "status": "en_route" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(advance.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eta_handler_validates_coordinates() {
    let (service, _, _) = build_service(Vec::new(), matching_config());
    let service = Arc::new(service);
    let job_id = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted")
        .job
        .id;

    let rejected = crate::workflows::jobs::router::eta_handler::<
        MemoryJobs,
        MemoryTrades,
        RecordingSender,
    >(
        State(service.clone()),
        Path(job_id.0.clone()),
        axum::Json(ArrivalRequest {
            lat: 123.0,
            lon: 0.0,
        }),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let estimate = crate::workflows::jobs::router::eta_handler::<
        MemoryJobs,
        MemoryTrades,
        RecordingSender,
    >(
        State(service),
        Path(job_id.0),
        axum::Json(ArrivalRequest {
            lat: 53.4808,
            lon: -2.2426,
        }),
    )
    .await;
    assert_eq!(estimate.status(), StatusCode::OK);
    let payload = read_json_body(estimate).await;
    assert_eq!(payload["eta_minutes"], 0);
}

#[tokio::test]
async fn trade_jobs_route_lists_open_matches() {
    let (router, service) = router_with(vec![trade("t1", PlanTier::Standard, &[], &["M1"])]);
    service
        .post_job("M1 1AA", Urgency::SameDay, fields())
        .expect("job posted");
    service
        .post_job("M2 3BB", Urgency::SameDay, fields())
        .expect("job posted");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/trades/t1/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let jobs = payload.as_array().expect("job list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["postcode_district"], "M1");

    let unknown = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/trades/nobody/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[test]
fn service_type_is_shareable_across_handlers() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JobMatchingService<MemoryJobs, MemoryTrades, RecordingSender>>();
}

#[tokio::test]
async fn coverage_route_updates_profile() {
    let (router, service) = router_with(vec![trade("t1", PlanTier::Premium, &["LS"], &[])]);
    let uri = "/api/v1/trades/t1/coverage";

    let updated = router
        .clone()
        .oneshot(json_request(
            "PUT",
            uri,
            json!({
                "areas": ["m"],
                "districts": [],
                "radius_km": 12.5,
                "home": { "lat": 53.48, "lon": -2.24 },
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(updated.status(), StatusCode::OK);
    let payload = read_json_body(updated).await;
    assert_eq!(payload["areas"], json!(["M"]));
    assert_eq!(payload["radius_km"], 12.5);

    let posted = service
        .post_job("M1 1AA", Urgency::Urgent2h, fields())
        .expect("job posted");
    assert_eq!(posted.notifications.premium_attempted, 1);

    let bad_home = router
        .clone()
        .oneshot(json_request(
            "PUT",
            uri,
            json!({ "radius_km": 5.0, "home": { "lat": 95.0, "lon": 0.0 } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(bad_home.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/trades/ghost/coverage",
            json!({ "areas": ["M"] }),
        ))
        .await
        .expect("route executes");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}
