use crate::infra::{
    sample_trades, InMemoryJobRepository, InMemoryTradeRepository, LoggingNotificationSender,
};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tradesos::config::MatchingConfig;
use tradesos::error::AppError;
use tradesos::workflows::jobs::{
    approximate_coordinate, normalize, ContactDetails, Coordinate, JobFields,
    JobMatchingService, JobServiceError, JobStatus, LifecycleError, NotificationBatch, PlanTier,
    StandardDelivery, Trade, TradeId, Urgency,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Postcode of the demo job.
    #[arg(long, default_value = "M1 1AA")]
    pub(crate) postcode: String,
    /// One of emergency_now, urgent_2h, same_day, next_day.
    #[arg(long, default_value = "urgent_2h")]
    pub(crate) urgency: Urgency,
    /// Premium-first-access window to use, in seconds.
    #[arg(long, default_value_t = 2)]
    pub(crate) window_secs: u64,
    /// Emit a JSON summary instead of the narrated walkthrough.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct PostcodeArgs {
    /// Raw postcode, any case and spacing.
    pub(crate) raw: String,
    /// Print the result as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct PostcodeLookup {
    full: String,
    area: String,
    district: String,
    sector: String,
    unit: String,
    centroid: Coordinate,
}

pub(crate) fn run_postcode_lookup(args: PostcodeArgs) -> Result<(), AppError> {
    let key = normalize(&args.raw)?;
    let lookup = PostcodeLookup {
        full: key.full().to_string(),
        area: key.area().to_string(),
        district: key.district().to_string(),
        sector: key.sector().to_string(),
        unit: key.unit().to_string(),
        centroid: approximate_coordinate(key.area()),
    };

    if args.json {
        println!("{}", to_pretty_json(&lookup));
        return Ok(());
    }

    println!("Postcode: {}", lookup.full);
    println!("- area {} | district {}", lookup.area, lookup.district);
    println!("- sector {} | unit {}", lookup.sector, lookup.unit);
    println!(
        "- approximate centroid {:.4}, {:.4}",
        lookup.centroid.lat, lookup.centroid.lon
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    job_id: String,
    postcode: String,
    urgency: Urgency,
    sla_minutes: u32,
    respond_by: DateTime<Utc>,
    premium_cohort: Vec<String>,
    standard_cohort: Vec<String>,
    standard_delivery: StandardDelivery,
    notified: Vec<NotifiedEntry>,
    winner: Option<String>,
    rejected: Option<String>,
    final_status: JobStatus,
}

#[derive(Debug, Serialize)]
struct NotifiedEntry {
    recipient: String,
    subject: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        postcode,
        urgency,
        window_secs,
        json,
    } = args;

    let config = MatchingConfig {
        premium_first_access: Duration::from_secs(window_secs),
        radius_filter: true,
        ..MatchingConfig::default()
    };
    let sender = Arc::new(LoggingNotificationSender::recording(
        config.base_url.clone(),
    ));
    let service = JobMatchingService::new(
        Arc::new(InMemoryJobRepository::default()),
        Arc::new(InMemoryTradeRepository::with_trades(sample_trades())),
        sender.clone(),
        config,
    );

    let posted = service.post_job(&postcode, urgency, demo_fields(urgency))?;
    let job = posted.job;
    let batch = posted.cohorts;

    if !json {
        println!("TradeSOS job matching demo");
        println!(
            "Posted {} at {} (area {}, district {})",
            job.id,
            job.postcode.full(),
            job.postcode.area(),
            job.postcode.district()
        );
        println!(
            "- {}: {} | respond within {} min, by {} ({} min from now)",
            urgency.label(),
            urgency.description(),
            job.sla_minutes,
            job.respond_by().format("%H:%M:%S UTC"),
            (job.respond_by() - Utc::now()).num_minutes().max(0)
        );
        println!(
            "- approximate location {:.4}, {:.4}",
            job.coordinate.lat, job.coordinate.lon
        );
        print_cohort("Premium cohort", &batch.premium_recipients);
        print_cohort("Standard cohort", &batch.standard_recipients);
        println!("Notified immediately:");
        for message in sender.sent() {
            println!("  - {} | {}", message.recipient, message.subject);
        }
    }

    if let StandardDelivery::Deferred { delay_secs } = posted.notifications.standard_delivery {
        if !json {
            println!("Waiting {delay_secs}s for the premium-first-access window...");
        }
        tokio::time::sleep(Duration::from_secs(delay_secs) + Duration::from_millis(250)).await;
    }

    // Premium trades saw the job first, so they are first to respond.
    let mut contenders = batch
        .premium_recipients
        .iter()
        .chain(&batch.standard_recipients)
        .map(|trade| trade.id.clone());
    let first = contenders.next();
    let second = contenders.next();

    let mut winner = None;
    let mut rejected = None;
    if let Some(first) = first {
        service.accept_job(&job.id, &first)?;
        if !json {
            println!("{first} accepted the job");
        }
        winner = Some(first.0);
    }
    if let Some(second) = second {
        match service.accept_job(&job.id, &second) {
            Err(JobServiceError::Lifecycle(LifecycleError::JobNotAvailable)) => {
                if !json {
                    println!("{second} tried to accept: job no longer available");
                }
                rejected = Some(second.0);
            }
            Err(other) => return Err(other.into()),
            Ok(_) => {}
        }
    }

    if let Some(winner_id) = winner.as_ref() {
        let winner_id = TradeId(winner_id.clone());
        let trade_home = directory_home(&batch, &winner_id).unwrap_or(job.coordinate);
        let estimate = service.estimate_arrival(&job.id, trade_home)?;
        service.advance_job_status(&job.id, &winner_id, JobStatus::EnRoute)?;
        if !json {
            println!(
                "{winner_id} is en route: {:.1} km, about {} min",
                estimate.distance_km, estimate.eta_minutes
            );
        }
    }

    let final_job = service.get(&job.id)?;
    let notified: Vec<NotifiedEntry> = sender
        .sent()
        .into_iter()
        .map(|message| NotifiedEntry {
            recipient: message.recipient,
            subject: message.subject,
        })
        .collect();

    if json {
        let summary = DemoSummary {
            job_id: job.id.0.clone(),
            postcode: job.postcode.full().to_string(),
            urgency,
            sla_minutes: job.sla_minutes,
            respond_by: job.respond_by(),
            premium_cohort: trade_ids(&batch.premium_recipients),
            standard_cohort: trade_ids(&batch.standard_recipients),
            standard_delivery: posted.notifications.standard_delivery,
            notified,
            winner,
            rejected,
            final_status: final_job.status,
        };
        println!("{}", to_pretty_json(&summary));
    } else {
        println!("Alerts delivered in total: {}", notified.len());
        println!("Final status: {}", final_job.status);
    }

    Ok(())
}

fn demo_fields(urgency: Urgency) -> JobFields {
    let (title, category, description) = match urgency {
        Urgency::EmergencyNow => (
            "Gas smell in kitchen",
            "gas",
            "Strong smell of gas near the hob, supply turned off at the meter",
        ),
        Urgency::Urgent2h => (
            "Burst pipe under sink",
            "plumbing",
            "Water leaking steadily into the cupboard below the kitchen sink",
        ),
        Urgency::SameDay => (
            "Lost front door key",
            "locksmith",
            "Locked out of the flat, spare key unavailable",
        ),
        Urgency::NextDay => (
            "Loose roof tiles",
            "roofing",
            "Two tiles slipped after last night's wind",
        ),
    };

    JobFields {
        title: title.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        customer_id: None,
        contact: Some(ContactDetails {
            name: "Demo Customer".to_string(),
            phone: Some("07700 900123".to_string()),
            email: Some("customer@example.test".to_string()),
        }),
    }
}

fn print_cohort(label: &str, trades: &[Trade]) {
    println!("{label} ({}):", trades.len());
    for trade in trades {
        let tier = match trade.plan_tier {
            PlanTier::Premium => "premium",
            PlanTier::Standard => "standard",
        };
        println!("  - {} [{}] {}", trade.company, tier, trade.id);
    }
}

fn trade_ids(trades: &[Trade]) -> Vec<String> {
    trades.iter().map(|trade| trade.id.0.clone()).collect()
}

fn directory_home(batch: &NotificationBatch, id: &TradeId) -> Option<Coordinate> {
    batch
        .premium_recipients
        .iter()
        .chain(&batch.standard_recipients)
        .find(|trade| &trade.id == id)
        .and_then(|trade| trade.coverage.home)
}

fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|err| format!("{{\"error\": \"failed to serialize output: {err}\"}}"))
}
