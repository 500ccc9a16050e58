//! Feasibility pre-flight: demand vs. capacity, and required-visit vs.
//! unavailability checks.

use std::collections::HashMap;

use crate::constraints::CompiledConstraints;
use crate::domain::Catalog;
use crate::error::{FiveWeekHint, ScheduleError, Result};
use crate::horizon::Horizon;

/// The pre-flight's findings, threaded into the MIP builder so the two
/// stages never disagree about adjusted demand.
#[derive(Debug, Clone)]
pub struct PreflightReport {
    /// Per-facility adjusted demand (census * (1+alpha), rounded).
    pub adjusted_demand: HashMap<usize, u32>,
    pub total_adjusted_demand: u32,
    pub available_days: usize,
    pub capacity: u32,
}

/// Runs the pre-flight checks. Returns a report on success, or a
/// structured [`ScheduleError`] naming the conflict.
pub fn check(
    catalog: &Catalog,
    provider_idx: usize,
    horizon: &Horizon,
    compiled: &CompiledConstraints,
    alpha: f64,
    max_patients_per_day: u32,
    weeks: u32,
) -> Result<PreflightReport> {
    let span = tracing::debug_span!("preflight::check", provider_idx);
    let _enter = span.enter();

    let mut adjusted_demand = HashMap::new();
    let mut total_adjusted_demand: u64 = 0;
    for facility_idx in catalog.assigned_facilities(provider_idx) {
        let census = catalog.census(provider_idx, facility_idx);
        let adjusted = ((census as f64) * (1.0 + alpha)).round() as u32;
        adjusted_demand.insert(facility_idx, adjusted);
        total_adjusted_demand += adjusted as u64;
    }

    let available_days = horizon
        .dates()
        .iter()
        .enumerate()
        .filter(|(idx, _)| !compiled.unavailable_days.contains(idx))
        .count();
    let capacity = available_days as u64 * max_patients_per_day as u64;

    if total_adjusted_demand > capacity {
        let five_week_hint = if weeks < 5 {
            let five_week_horizon = Horizon::build(horizon.date_at(0), 5);
            // Re-derive availability for a 5-week horizon using the same
            // blocked-weekday/PTO logic is out of this function's reach
            // without the raw constraint payload; approximate using the
            // same available-day ratio observed for the requested horizon,
            // scaled to the 5-week day count, which is exact whenever
            // availability restrictions are expressed purely as blocked
            // weekdays (the common case) and a conservative estimate
            // otherwise.
            let ratio = available_days as f64 / horizon.day_count().max(1) as f64;
            let five_week_available = (five_week_horizon.day_count() as f64 * ratio).round() as u32;
            let five_week_capacity = five_week_available as u64 * max_patients_per_day as u64;
            FiveWeekHint::capacity(five_week_capacity as u32)
        } else {
            FiveWeekHint::none()
        };

        tracing::warn!(
            total_adjusted_demand,
            capacity,
            available_days,
            "capacity shortfall"
        );

        return Err(ScheduleError::CapacityShortfall {
            adjusted_demand: total_adjusted_demand as u32,
            available_days,
            capacity: capacity as u32,
            max_patients_per_day,
            alpha,
            five_week_hint,
        });
    }

    for &(facility_idx, day_idx) in &compiled.required_visits {
        if compiled.unavailable_days.contains(&day_idx) {
            return Err(ScheduleError::RequiredVisitConflict {
                facility: catalog.facility_id(facility_idx).to_string(),
                date: horizon.date_at(day_idx),
            });
        }
    }

    tracing::info!(total_adjusted_demand, capacity, available_days, "pre-flight passed");

    Ok(PreflightReport {
        adjusted_demand,
        total_adjusted_demand: total_adjusted_demand as u32,
        available_days,
        capacity: capacity as u32,
    })
}
