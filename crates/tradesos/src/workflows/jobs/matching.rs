use tracing::{debug, info};

use super::domain::{CoverageProfile, Job, Trade};
use super::geo::{distance_km, Coordinate};
use super::postcode::PostcodeKey;
use super::repository::{RepositoryError, TradeRepository};

/// Which coverage criterion admitted a trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchReason {
    Area,
    District,
    Radius { distance_km: f64 },
}

impl CoverageProfile {
    /// First criterion (area, then district, then radius) covering the location.
    ///
    /// The radius criterion is only consulted when `radius_filter` is on and the
    /// profile carries both a radius and a home coordinate.
    pub fn covers(
        &self,
        postcode: &PostcodeKey,
        coordinate: Coordinate,
        radius_filter: bool,
    ) -> Option<MatchReason> {
        if self.areas.contains(postcode.area()) {
            return Some(MatchReason::Area);
        }
        if self.districts.contains(postcode.district()) {
            return Some(MatchReason::District);
        }
        if !radius_filter {
            return None;
        }
        match (self.radius_km, self.home) {
            (Some(radius_km), Some(home)) => {
                let distance_km = distance_km(home, coordinate);
                (distance_km <= radius_km).then_some(MatchReason::Radius { distance_km })
            }
            _ => None,
        }
    }
}

/// Resolves which verified trades should hear about a job. Criteria are OR-ed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageMatcher {
    radius_filter: bool,
}

impl CoverageMatcher {
    pub fn new(radius_filter: bool) -> Self {
        Self { radius_filter }
    }

    pub fn matches(&self, trade: &Trade, job: &Job) -> Option<MatchReason> {
        if !trade.verified {
            return None;
        }
        trade
            .coverage
            .covers(&job.postcode, job.coordinate, self.radius_filter)
    }

    /// Matching trades in repository order.
    pub fn find_matches<R>(&self, job: &Job, trades: &R) -> Result<Vec<Trade>, RepositoryError>
    where
        R: TradeRepository + ?Sized,
    {
        let candidates = trades.list_verified_trades()?;
        let candidate_count = candidates.len();

        let matched: Vec<Trade> = candidates
            .into_iter()
            .filter(|trade| match self.matches(trade, job) {
                Some(reason) => {
                    debug!(job_id = %job.id, trade_id = %trade.id, ?reason, "trade covers job");
                    true
                }
                None => false,
            })
            .collect();

        info!(
            job_id = %job.id,
            area = job.postcode.area(),
            district = job.postcode.district(),
            candidates = candidate_count,
            matched = matched.len(),
            "resolved coverage matches"
        );

        Ok(matched)
    }
}
