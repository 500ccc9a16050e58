//! Post-processor: converts a solved visit set into reported travel
//! times via a greedy nearest-neighbor tour.
//!
//! This is deliberately a different calculation from the MIP's
//! pairwise-coincidence objective proxy, which shapes the solve. This
//! routine reports what a provider would actually drive.

use std::collections::BTreeMap;

use crate::domain::Catalog;
use crate::solve::SolveOutcome;

/// Reported travel time for a single scheduled day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTravel {
    pub home_to_facility: f64,
    pub facility_to_facility: f64,
}

impl DayTravel {
    pub fn total(&self) -> f64 {
        self.home_to_facility + self.facility_to_facility
    }
}

/// Per-provider travel report: one [`DayTravel`] per day that has at
/// least one visited facility.
#[derive(Debug, Clone, Default)]
pub struct TravelReport {
    pub by_day: BTreeMap<usize, DayTravel>,
}

impl TravelReport {
    pub fn home_to_facility_total(&self) -> f64 {
        self.by_day.values().map(|d| d.home_to_facility).sum()
    }

    pub fn facility_to_facility_total(&self) -> f64 {
        self.by_day.values().map(|d| d.facility_to_facility).sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.by_day.values().map(DayTravel::total).sum()
    }
}

/// Computes the reported travel-time breakdown for a solved schedule.
///
/// For each day with at least one visited facility, the provider is
/// assumed to start at home, drive to the closest visited facility
/// first, then visit the remaining facilities via a greedy
/// nearest-neighbor tour.
pub fn report(catalog: &Catalog, provider_idx: usize, day_count: usize, outcome: &SolveOutcome) -> TravelReport {
    let span = tracing::debug_span!("postprocess::report", provider_idx);
    let _enter = span.enter();

    let mut by_facility_day: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&(f, d), &visited) in &outcome.z {
        if visited {
            by_facility_day.entry(d).or_default().push(f);
        }
    }

    let mut by_day = BTreeMap::new();
    for d in 0..day_count {
        let Some(mut facilities) = by_facility_day.remove(&d) else {
            continue;
        };
        facilities.sort_unstable();

        let (closest_idx, &closest) = facilities
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                catalog
                    .home_travel_hours(provider_idx, a)
                    .total_cmp(&catalog.home_travel_hours(provider_idx, b))
            })
            .expect("day has at least one visited facility");
        let home_to_facility = catalog.home_travel_hours(provider_idx, closest);

        let mut remaining = facilities;
        remaining.remove(closest_idx);

        let facility_to_facility = nearest_neighbor_tour(catalog, closest, remaining);

        by_day.insert(
            d,
            DayTravel {
                home_to_facility,
                facility_to_facility,
            },
        );
    }

    tracing::info!(days = by_day.len(), "travel reported");
    TravelReport { by_day }
}

/// Greedy nearest-neighbor tour starting from `start`, visiting every
/// facility in `remaining` exactly once, accumulating hop travel time.
fn nearest_neighbor_tour(catalog: &Catalog, start: usize, mut remaining: Vec<usize>) -> f64 {
    let mut total = 0.0;
    let mut current = start;
    while !remaining.is_empty() {
        let (next_idx, &next) = remaining
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                catalog
                    .facility_travel_hours(current, a)
                    .total_cmp(&catalog.facility_travel_hours(current, b))
            })
            .expect("remaining is non-empty");
        total += catalog.facility_travel_hours(current, next);
        current = next;
        remaining.remove(next_idx);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_catalog, AssignmentRow, CensusRow, TravelMatrixRow};
    use std::collections::HashMap;

    fn two_facility_catalog() -> Catalog {
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
        let census: Vec<CensusRow> = vec![];
        let pcp = vec![TravelMatrixRow {
            row_id: "P1".into(),
            cells: HashMap::from([("F1".to_string(), 0.5), ("F2".to_string(), 0.7)]),
        }];
        let ff = vec![
            TravelMatrixRow {
                row_id: "F1".into(),
                cells: HashMap::from([("F2".to_string(), 0.2)]),
            },
            TravelMatrixRow {
                row_id: "F2".into(),
                cells: HashMap::from([("F1".to_string(), 0.2)]),
            },
        ];
        build_catalog("Test", &assignments, None, &census, &pcp, &ff, "2024-12").unwrap()
    }

    #[test]
    fn picks_closest_facility_home_leg_and_sums_tour() {
        let catalog = two_facility_catalog();
        let mut z = BTreeMap::new();
        z.insert((0, 0), true); // F1 on day 0
        z.insert((1, 0), true); // F2 on day 0
        let outcome = SolveOutcome {
            x: BTreeMap::new(),
            z,
            objective_value: 0.0,
        };

        let report = report(&catalog, 0, 1, &outcome);
        let day = report.by_day.get(&0).unwrap();
        assert_eq!(day.home_to_facility, 0.5);
        assert_eq!(day.facility_to_facility, 0.2);
        assert_eq!(day.total(), 0.7);
    }

    #[test]
    fn day_with_no_visits_is_absent_from_report() {
        let catalog = two_facility_catalog();
        let mut z = BTreeMap::new();
        z.insert((0, 0), false);
        z.insert((1, 0), false);
        let outcome = SolveOutcome {
            x: BTreeMap::new(),
            z,
            objective_value: 0.0,
        };
        let report = report(&catalog, 0, 1, &outcome);
        assert!(report.by_day.is_empty());
    }

    #[test]
    fn single_facility_day_has_zero_facility_to_facility_leg() {
        let catalog = two_facility_catalog();
        let mut z = BTreeMap::new();
        z.insert((0, 0), true);
        let outcome = SolveOutcome {
            x: BTreeMap::new(),
            z,
            objective_value: 0.0,
        };
        let report = report(&catalog, 0, 1, &outcome);
        let day = report.by_day.get(&0).unwrap();
        assert_eq!(day.home_to_facility, 0.5);
        assert_eq!(day.facility_to_facility, 0.0);
    }
}
