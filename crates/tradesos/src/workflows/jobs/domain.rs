use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::geo::Coordinate;
use super::postcode::PostcodeKey;

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for registered trade professionals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub String);

/// Identifier wrapper for customer accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How quickly the customer needs someone on site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "emergency_now")]
    EmergencyNow,
    #[serde(rename = "urgent_2h")]
    Urgent2h,
    #[serde(rename = "same_day")]
    SameDay,
    #[serde(rename = "next_day")]
    NextDay,
}

impl Urgency {
    pub const fn ordered() -> [Self; 4] {
        [Self::EmergencyNow, Self::Urgent2h, Self::SameDay, Self::NextDay]
    }

    /// Target response time in minutes.
    pub const fn sla_minutes(self) -> u32 {
        match self {
            Self::EmergencyNow => 0,
            Self::Urgent2h => 120,
            Self::SameDay => 480,
            Self::NextDay => 1440,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmergencyNow => "emergency_now",
            Self::Urgent2h => "urgent_2h",
            Self::SameDay => "same_day",
            Self::NextDay => "next_day",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::EmergencyNow => "Emergency Now",
            Self::Urgent2h => "Urgent (2h)",
            Self::SameDay => "Same Day",
            Self::NextDay => "Next Day",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::EmergencyNow => "Immediate response required",
            Self::Urgent2h => "Response needed within 2 hours",
            Self::SameDay => "Response needed within 8 hours",
            Self::NextDay => "Response needed within 24 hours",
        }
    }

    /// Headline used at the top of trade notifications.
    pub const fn headline(self) -> &'static str {
        match self {
            Self::EmergencyNow => "EMERGENCY - Immediate Response Required",
            Self::Urgent2h => "URGENT - Within 2 Hours",
            Self::SameDay => "Same Day Service Required",
            Self::NextDay => "Next Day Service Required",
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|urgency| urgency.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown urgency '{raw}' (expected emergency_now, urgent_2h, same_day or next_day)")
            })
    }
}

/// Lifecycle states a job moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Posted,
    Accepted,
    EnRoute,
    InProgress,
    Completed,
    Canceled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Posted => "posted",
            JobStatus::Accepted => "accepted",
            JobStatus::EnRoute => "en_route",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Canceled => "canceled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Canceled)
    }

    /// States in which a job carries an accepted trade.
    pub const fn has_accepted_trade(self) -> bool {
        !matches!(self, JobStatus::Posted | JobStatus::Canceled)
    }

    /// The only state the accepted trade may move the job into next.
    pub const fn successor(self) -> Option<JobStatus> {
        match self {
            JobStatus::Accepted => Some(JobStatus::EnRoute),
            JobStatus::EnRoute => Some(JobStatus::InProgress),
            JobStatus::InProgress => Some(JobStatus::Completed),
            JobStatus::Posted | JobStatus::Completed | JobStatus::Canceled => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Subscription level controlling notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Standard,
    Premium,
}

/// Areas, districts and optional radius a trade declares as serviceable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageProfile {
    pub areas: BTreeSet<String>,
    pub districts: BTreeSet<String>,
    pub radius_km: Option<f64>,
    pub home: Option<Coordinate>,
}

impl CoverageProfile {
    /// Builds a profile with areas and districts trimmed and uppercased.
    pub fn new<A, D>(areas: A, districts: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            areas: normalize_codes(areas),
            districts: normalize_codes(districts),
            radius_km: None,
            home: None,
        }
    }

    /// Adds a radius around `home`; negative or non-finite radii collapse to zero.
    pub fn with_radius(mut self, radius_km: f64, home: Coordinate) -> Self {
        let radius_km = if radius_km.is_finite() {
            radius_km.max(0.0)
        } else {
            0.0
        };
        self.radius_km = Some(radius_km);
        self.home = Some(home);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
            && self.districts.is_empty()
            && (self.radius_km.is_none() || self.home.is_none())
    }
}

fn normalize_codes<I>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    codes
        .into_iter()
        .map(|code| code.as_ref().trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect()
}

/// Registered trade professional as seen by the matching engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub company: String,
    /// Notification address; trades without one are skipped by the notifier.
    pub email: Option<String>,
    pub verified: bool,
    pub plan_tier: PlanTier,
    pub coverage: CoverageProfile,
}

impl Trade {
    pub fn update_coverage(&mut self, coverage: CoverageProfile) {
        self.coverage = coverage;
    }
}

/// Contact details captured for customers posting without an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Descriptive job fields supplied by the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFields {
    pub title: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub contact: Option<ContactDetails>,
}

/// Winner details recorded by a successful acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    pub trade_id: TradeId,
    pub accepted_at: DateTime<Utc>,
}

/// A customer job with its normalized location and lifecycle state.
///
/// `accepted_trade_id` is populated exactly when `status` is neither
/// `posted` nor `canceled`; [`Job::apply_transition`] keeps that true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub fields: JobFields,
    pub postcode: PostcodeKey,
    pub coordinate: Coordinate,
    pub urgency: Urgency,
    pub sla_minutes: u32,
    pub status: JobStatus,
    pub accepted_trade_id: Option<TradeId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn posted(
        id: JobId,
        postcode: PostcodeKey,
        coordinate: Coordinate,
        urgency: Urgency,
        fields: JobFields,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields,
            postcode,
            coordinate,
            urgency,
            sla_minutes: urgency.sla_minutes(),
            status: JobStatus::Posted,
            accepted_trade_id: None,
            accepted_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Deadline by which a trade should respond.
    pub fn respond_by(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.sla_minutes))
    }

    /// Writes a status change that the caller has already guarded.
    pub fn apply_transition(
        &mut self,
        next: JobStatus,
        acceptance: Option<Acceptance>,
        at: DateTime<Utc>,
    ) {
        if let Some(Acceptance {
            trade_id,
            accepted_at,
        }) = acceptance
        {
            self.accepted_trade_id = Some(trade_id);
            self.accepted_at = Some(accepted_at);
        }
        if !next.has_accepted_trade() {
            self.accepted_trade_id = None;
            self.accepted_at = None;
        }
        self.status = next;
        self.updated_at = at;
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.id.clone(),
            status: self.status.label(),
            title: self.fields.title.clone(),
            category: self.fields.category.clone(),
            urgency: self.urgency,
            sla_minutes: self.sla_minutes,
            respond_by: self.respond_by(),
            postcode_full: self.postcode.full().to_string(),
            postcode_area: self.postcode.area().to_string(),
            postcode_district: self.postcode.district().to_string(),
            lat: self.coordinate.lat,
            lon: self.coordinate.lon,
            accepted_trade_id: self.accepted_trade_id.clone(),
            accepted_at: self.accepted_at,
            created_at: self.created_at,
        }
    }
}

/// Flattened representation of a job returned by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: &'static str,
    pub title: String,
    pub category: String,
    pub urgency: Urgency,
    pub sla_minutes: u32,
    pub respond_by: DateTime<Utc>,
    pub postcode_full: String,
    pub postcode_area: String,
    pub postcode_district: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_trade_id: Option<TradeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Who is asking to cancel a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelActor {
    Customer(CustomerId),
    Admin,
}
