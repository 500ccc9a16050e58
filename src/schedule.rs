//! Result packager: builds the response envelope from the
//! post-processor's output.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::Catalog;
use crate::error::ScheduleError;
use crate::postprocess::TravelReport;
use crate::preflight::PreflightReport;
use crate::request::ScheduleRequest;
use crate::solve::SolveOutcome;

/// Per-day facility→patient-count map, keyed by ISO date string.
pub type DaySchedule = BTreeMap<String, BTreeMap<String, u32>>;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_patients_served: u32,
    pub total_patient_demand: u32,
    pub overall_utilization: f64,
    pub max_daily_patients: u32,
    pub objective_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub business_line: String,
    pub provider_id: String,
    pub horizon_start: NaiveDate,
    pub horizon_end: NaiveDate,
    pub weeks: u32,
    pub max_patients_per_day: u32,
    pub alpha: f64,
    pub lambda_param: f64,
    pub lambda_facility: f64,
    pub lambda_bunching: f64,
    pub facility_visit_window: usize,
}

/// The success payload of the response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResult {
    /// `schedule[providerId][date][facilityId] = patients`.
    pub schedule: BTreeMap<String, DaySchedule>,
    pub total_patients_served: u32,
    pub total_patient_demand: u32,
    pub total_travel_time: f64,
    pub home_to_facility_travel: f64,
    pub facility_to_facility_travel: f64,
    /// `daily_travel_times[providerId][date]` in hours.
    pub daily_travel_times: BTreeMap<String, BTreeMap<String, f64>>,
    pub overall_utilization: f64,
    pub summary_stats: SummaryStats,
    pub metadata: Metadata,
}

/// The on-wire error payload: a user-visible message, never a stack
/// trace, plus the 400/500 status class a transport layer should use.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub status_code: u16,
}

impl From<&ScheduleError> for ErrorPayload {
    fn from(err: &ScheduleError) -> Self {
        let status_code = match err.status_class() {
            crate::error::StatusClass::BadRequest => 400,
            crate::error::StatusClass::ServerError => 500,
        };
        ErrorPayload {
            message: err.to_string(),
            status_code,
        }
    }
}

/// The tagged response envelope: a success payload xor a structured
/// error, never both.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleResponse {
    Success { results: Box<ScheduleResult> },
    Error { error: ErrorPayload },
}

impl ScheduleResponse {
    pub fn error(err: &ScheduleError) -> Self {
        ScheduleResponse::Error {
            error: ErrorPayload::from(err),
        }
    }
}

/// Assembles the final [`ScheduleResult`] from every upstream stage's
/// output. `provider_id` is the caller's requested id, so the outer
/// schedule key is forced to it rather than re-derived from the
/// catalog.
#[allow(clippy::too_many_arguments)]
pub fn package(
    catalog: &Catalog,
    provider_idx: usize,
    provider_id: &str,
    dates: &[NaiveDate],
    request: &ScheduleRequest,
    preflight: &PreflightReport,
    outcome: &SolveOutcome,
    travel: &TravelReport,
) -> ScheduleResult {
    let span = tracing::debug_span!("schedule::package", provider_id);
    let _enter = span.enter();

    let mut day_schedule: DaySchedule = BTreeMap::new();
    let mut max_daily_patients = 0u32;
    for (&(f, d), &patients) in &outcome.x {
        if patients == 0 {
            continue;
        }
        let date = dates[d].format("%Y-%m-%d").to_string();
        let facility_id = catalog.facility_id(f).to_string();
        day_schedule.entry(date).or_default().insert(facility_id, patients);
    }
    for patients_by_facility in day_schedule.values() {
        let day_total: u32 = patients_by_facility.values().sum();
        max_daily_patients = max_daily_patients.max(day_total);
    }

    let mut daily_travel_times: BTreeMap<String, f64> = BTreeMap::new();
    for (&d, day_travel) in &travel.by_day {
        let date = dates[d].format("%Y-%m-%d").to_string();
        daily_travel_times.insert(date, day_travel.total());
    }

    let total_patients_served: u32 = outcome.x.values().sum();
    let overall_utilization = if preflight.capacity > 0 {
        total_patients_served as f64 / preflight.capacity as f64
    } else {
        0.0
    };

    // `weeks` is validated to 4 or 5 before the horizon is built, so a
    // full Mon-Fri horizon always contains at least one day.
    let horizon_start = *dates.first().expect("horizon has at least one day");
    let horizon_end = *dates.last().expect("horizon has at least one day");

    let result = ScheduleResult {
        schedule: BTreeMap::from([(provider_id.to_string(), day_schedule)]),
        total_patients_served,
        total_patient_demand: preflight.total_adjusted_demand,
        total_travel_time: travel.grand_total(),
        home_to_facility_travel: travel.home_to_facility_total(),
        facility_to_facility_travel: travel.facility_to_facility_total(),
        daily_travel_times: BTreeMap::from([(provider_id.to_string(), daily_travel_times)]),
        overall_utilization,
        summary_stats: SummaryStats {
            total_patients_served,
            total_patient_demand: preflight.total_adjusted_demand,
            overall_utilization,
            max_daily_patients,
            objective_value: outcome.objective_value,
        },
        metadata: Metadata {
            business_line: catalog.business_line().to_string(),
            provider_id: provider_id.to_string(),
            horizon_start,
            horizon_end,
            weeks: request.weeks,
            max_patients_per_day: request.max_patients_per_day,
            alpha: request.alpha,
            lambda_param: request.lambda_param,
            lambda_facility: request.lambda_facility,
            lambda_bunching: request.lambda_bunching,
            facility_visit_window: request.facility_visit_window,
        },
    };

    tracing::info!(
        total_patients_served,
        total_travel_time = result.total_travel_time,
        "schedule packaged"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_catalog, AssignmentRow, CensusRow, TravelMatrixRow};
    use crate::postprocess::DayTravel;
    use std::collections::HashMap;

    fn catalog() -> Catalog {
        let assignments = vec![AssignmentRow {
            business_line: "Test".into(),
            provider_id: "P1".into(),
            facility_id: "F1".into(),
        }];
        let census = vec![CensusRow {
            business_line: "Test".into(),
            provider_id: "P1".into(),
            facility_id: "F1".into(),
            monthly_counts: HashMap::from([("2024-12".to_string(), 10)]),
        }];
        let pcp = vec![TravelMatrixRow {
            row_id: "P1".into(),
            cells: HashMap::from([("F1".to_string(), 0.5)]),
        }];
        let ff = vec![TravelMatrixRow {
            row_id: "F1".into(),
            cells: HashMap::new(),
        }];
        build_catalog("Test", &assignments, None, &census, &pcp, &ff, "2024-12").unwrap()
    }

    #[test]
    fn packages_schedule_with_forced_provider_key() {
        let catalog = catalog();
        let request = serde_json::from_value::<ScheduleRequest>(serde_json::json!({
            "business_line": "Test",
            "start_monday": "2024-12-02",
            "selected_provider": "P1",
        }))
        .unwrap();
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 3).unwrap(),
        ];
        let preflight = PreflightReport {
            adjusted_demand: BTreeMap::from([(0, 10)]).into_iter().collect(),
            total_adjusted_demand: 10,
            available_days: 2,
            capacity: 30,
        };
        let mut x = BTreeMap::new();
        x.insert((0, 0), 10u32);
        let mut z = BTreeMap::new();
        z.insert((0, 0), true);
        let outcome = SolveOutcome {
            x,
            z,
            objective_value: 1.5,
        };
        let mut by_day = BTreeMap::new();
        by_day.insert(
            0,
            DayTravel {
                home_to_facility: 0.5,
                facility_to_facility: 0.0,
            },
        );
        let travel = TravelReport { by_day };

        let result = package(&catalog, 0, "P1", &dates, &request, &preflight, &outcome, &travel);
        assert_eq!(result.total_patients_served, 10);
        assert_eq!(result.total_patient_demand, 10);
        assert_eq!(result.total_travel_time, 0.5);
        let by_provider = result.schedule.get("P1").unwrap();
        assert_eq!(by_provider.get("2024-12-02").unwrap().get("F1"), Some(&10));
        assert_eq!(result.summary_stats.max_daily_patients, 10);
    }
}
