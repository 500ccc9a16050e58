//! Constraint compiler: translates request-level constraint payloads
//! into model inputs.

use std::collections::HashSet;

use chrono::{Datelike, Duration};

use crate::domain::{Catalog, UnavailableDateRow};
use crate::error::{ScheduleError, Result};
use crate::horizon::Horizon;
use crate::request::{BusinessDay, ProviderConstraints};

/// Compiled constraint set for a single provider's solve.
#[derive(Debug, Clone, Default)]
pub struct CompiledConstraints {
    /// Horizon day indices on which the provider is unavailable (PTO
    /// union blocked weekdays).
    pub unavailable_days: HashSet<usize>,
    /// (facility index, day index) pairs forced to at least one patient.
    pub required_visits: Vec<(usize, usize)>,
    /// (facility index, day index) pairs forbidden from a visit.
    pub forbidden_visits: Vec<(usize, usize)>,
}

/// Compiles a provider's constraint payload against a built horizon and
/// catalog.
pub fn compile(
    catalog: &Catalog,
    provider_idx: usize,
    horizon: &Horizon,
    constraints: &ProviderConstraints,
    file_unavailable_dates: &[UnavailableDateRow],
) -> Result<CompiledConstraints> {
    let span = tracing::debug_span!("constraints::compile", provider_idx);
    let _enter = span.enter();

    let provider_id = catalog.provider_id(provider_idx);
    let mut pto_dates = expand_pto(constraints);
    pto_dates.extend(
        file_unavailable_dates
            .iter()
            .filter(|row| row.provider_id == provider_id)
            .map(|row| row.date),
    );

    let mut blocked_weekdays = HashSet::new();
    for entry in &constraints.weekly_availability {
        if !entry.is_working {
            let day = BusinessDay::parse(&entry.day)?;
            blocked_weekdays.insert(day.to_chrono());
        }
    }

    let mut unavailable_days = HashSet::new();
    for (idx, date) in horizon.dates().iter().enumerate() {
        if blocked_weekdays.contains(&date.weekday()) || pto_dates.contains(date) {
            unavailable_days.insert(idx);
        }
    }

    let mut required_visits = Vec::new();
    for entry in &constraints.date_constraints {
        let facility_idx = catalog
            .facility_index(&entry.facility_id)
            .ok_or_else(|| ScheduleError::UnknownFacility(entry.facility_id.clone()))?;
        let day_idx = horizon
            .index_of(entry.date)
            .ok_or(ScheduleError::DateNotInHorizon { date: entry.date })?;
        if !catalog.is_assigned(provider_idx, facility_idx) {
            return Err(ScheduleError::NotAssigned {
                provider: catalog.provider_id(provider_idx).to_string(),
                facility: entry.facility_id.clone(),
            });
        }
        required_visits.push((facility_idx, day_idx));
    }

    let mut forbidden_visits = Vec::new();
    for entry in &constraints.day_of_week_constraints {
        let facility_idx = catalog
            .facility_index(&entry.facility_id)
            .ok_or_else(|| ScheduleError::UnknownFacility(entry.facility_id.clone()))?;
        let required_day = BusinessDay::parse(&entry.day)?;
        if !catalog.is_assigned(provider_idx, facility_idx) {
            return Err(ScheduleError::NotAssigned {
                provider: catalog.provider_id(provider_idx).to_string(),
                facility: entry.facility_id.clone(),
            });
        }
        for (day_idx, date) in horizon.dates().iter().enumerate() {
            if date.weekday() != required_day.to_chrono() {
                forbidden_visits.push((facility_idx, day_idx));
            }
        }
    }

    tracing::info!(
        unavailable_days = unavailable_days.len(),
        required_visits = required_visits.len(),
        forbidden_visits = forbidden_visits.len(),
        "constraints compiled"
    );

    Ok(CompiledConstraints {
        unavailable_days,
        required_visits,
        forbidden_visits,
    })
}

fn expand_pto(constraints: &ProviderConstraints) -> HashSet<chrono::NaiveDate> {
    let mut dates = HashSet::new();
    for pto in &constraints.pto_requests {
        if pto.end_date < pto.start_date {
            tracing::warn!(
                start = %pto.start_date,
                end = %pto.end_date,
                "skipping malformed PTO range (end before start)"
            );
            continue;
        }
        let mut current = pto.start_date;
        while current <= pto.end_date {
            dates.insert(current);
            current += Duration::days(1);
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_catalog, AssignmentRow, TravelMatrixRow};
    use crate::request::{DateConstraint, DayOfWeekConstraint, PtoRequest, WeeklyAvailabilityEntry};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn catalog_with_two_facilities() -> Catalog {
        let assignments = vec![
            AssignmentRow {
                business_line: "Test".into(),
                provider_id: "P1".into(),
                facility_id: "F1".into(),
            },
            AssignmentRow {
                business_line: "Test".into(),
                provider_id: "P1".into(),
                facility_id: "F2".into(),
            },
        ];
        let census = vec![];
        let pcp = vec![TravelMatrixRow {
            row_id: "P1".into(),
            cells: HashMap::new(),
        }];
        let ff = vec![TravelMatrixRow {
            row_id: "F1".into(),
            cells: HashMap::new(),
        }];
        build_catalog("Test", &assignments, None, &census, &pcp, &ff, "2024-12").unwrap()
    }

    #[test]
    fn pto_range_expands_inclusive() {
        let constraints = ProviderConstraints {
            pto_requests: vec![PtoRequest {
                start_date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 6).unwrap(),
            }],
            ..Default::default()
        };
        let dates = expand_pto(&constraints);
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn malformed_pto_range_is_skipped_not_fatal() {
        let constraints = ProviderConstraints {
            pto_requests: vec![PtoRequest {
                start_date: NaiveDate::from_ymd_opt(2024, 12, 6).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
            }],
            ..Default::default()
        };
        let dates = expand_pto(&constraints);
        assert!(dates.is_empty());
    }

    #[test]
    fn blocked_weekday_and_pto_union_into_unavailable_days() {
        let catalog = catalog_with_two_facilities();
        let horizon = Horizon::build(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(), 1);
        let constraints = ProviderConstraints {
            weekly_availability: vec![WeeklyAvailabilityEntry {
                day: "Friday".into(),
                is_working: false,
            }],
            pto_requests: vec![PtoRequest {
                start_date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
            }],
            ..Default::default()
        };
        let compiled = compile(&catalog, 0, &horizon, &constraints, &[]).unwrap();
        // Monday 12/2 (PTO) and Friday 12/6 (blocked weekday) both unavailable.
        assert_eq!(compiled.unavailable_days.len(), 2);
    }

    #[test]
    fn file_sourced_pto_unions_with_request_pto() {
        let catalog = catalog_with_two_facilities();
        let horizon = Horizon::build(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(), 1);
        let constraints = ProviderConstraints::default();
        let file_rows = vec![UnavailableDateRow {
            provider_id: "P1".into(),
            date: NaiveDate::from_ymd_opt(2024, 12, 4).unwrap(),
        }];
        let compiled = compile(&catalog, 0, &horizon, &constraints, &file_rows).unwrap();
        assert_eq!(compiled.unavailable_days.len(), 1);
        assert!(compiled.unavailable_days.contains(&2));
    }

    #[test]
    fn file_sourced_pto_for_other_provider_is_ignored() {
        let catalog = catalog_with_two_facilities();
        let horizon = Horizon::build(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(), 1);
        let constraints = ProviderConstraints::default();
        let file_rows = vec![UnavailableDateRow {
            provider_id: "P9".into(),
            date: NaiveDate::from_ymd_opt(2024, 12, 4).unwrap(),
        }];
        let compiled = compile(&catalog, 0, &horizon, &constraints, &file_rows).unwrap();
        assert!(compiled.unavailable_days.is_empty());
    }

    #[test]
    fn date_constraint_on_unknown_facility_is_rejected() {
        let catalog = catalog_with_two_facilities();
        let horizon = Horizon::build(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(), 1);
        let constraints = ProviderConstraints {
            date_constraints: vec![DateConstraint {
                facility_id: "F9".into(),
                date: NaiveDate::from_ymd_opt(2024, 12, 3).unwrap(),
            }],
            ..Default::default()
        };
        let err = compile(&catalog, 0, &horizon, &constraints, &[]).unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownFacility(_)));
    }

    #[test]
    fn day_of_week_constraint_forbids_every_other_weekday() {
        let catalog = catalog_with_two_facilities();
        let horizon = Horizon::build(NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(), 4);
        let constraints = ProviderConstraints {
            day_of_week_constraints: vec![DayOfWeekConstraint {
                facility_id: "F1".into(),
                day: "Monday".into(),
            }],
            ..Default::default()
        };
        let compiled = compile(&catalog, 0, &horizon, &constraints, &[]).unwrap();
        // 20 weekdays, 4 Mondays -> 16 forbidden days for F1.
        assert_eq!(compiled.forbidden_visits.len(), 16);
        assert!(compiled.required_visits.is_empty());
    }
}
