//! Domain loader: builds the immutable entity catalog for one business line.
//!
//! Input rows are already-parsed (CSV/flat-file ingestion is an
//! out-of-scope collaborator); this module only does filtering, index
//! assignment, and lookup-table construction.

use std::collections::{HashMap, HashSet};

use crate::error::{ScheduleError, Result};

/// A row from the PCP-to-facility assignment table.
#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub business_line: String,
    pub provider_id: String,
    pub facility_id: String,
}

/// A row from the monthly census table: one nonnegative count per
/// `"YYYY-MM"` column.
#[derive(Debug, Clone)]
pub struct CensusRow {
    pub business_line: String,
    pub provider_id: String,
    pub facility_id: String,
    pub monthly_counts: HashMap<String, u32>,
}

/// A row from either travel-time matrix: a row id plus a sparse map of
/// target id → hours. Missing cells mean "unknown" and are treated as 0
/// by callers, not by this struct.
#[derive(Debug, Clone)]
pub struct TravelMatrixRow {
    pub row_id: String,
    pub cells: HashMap<String, f64>,
}

/// A row from the file-sourced unavailable-dates table: one date a
/// provider is known to be out, independent of any request-supplied PTO.
#[derive(Debug, Clone)]
pub struct UnavailableDateRow {
    pub provider_id: String,
    pub date: chrono::NaiveDate,
}

/// The immutable, read-only catalog for one business line: ordered
/// providers/facilities, legal assignments, travel tables, and census.
#[derive(Debug, Clone)]
pub struct Catalog {
    business_line: String,
    providers: Vec<String>,
    facilities: Vec<String>,
    provider_index: HashMap<String, usize>,
    facility_index: HashMap<String, usize>,
    assignments: HashSet<(usize, usize)>,
    home_travel: HashMap<(usize, usize), f64>,
    facility_travel: HashMap<(usize, usize), f64>,
    census: HashMap<(usize, usize), u32>,
}

impl Catalog {
    pub fn business_line(&self) -> &str {
        &self.business_line
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn facilities(&self) -> &[String] {
        &self.facilities
    }

    pub fn provider_index(&self, id: &str) -> Option<usize> {
        self.provider_index.get(id).copied()
    }

    pub fn facility_index(&self, id: &str) -> Option<usize> {
        self.facility_index.get(id).copied()
    }

    pub fn provider_id(&self, idx: usize) -> &str {
        &self.providers[idx]
    }

    pub fn facility_id(&self, idx: usize) -> &str {
        &self.facilities[idx]
    }

    pub fn is_assigned(&self, provider_idx: usize, facility_idx: usize) -> bool {
        self.assignments.contains(&(provider_idx, facility_idx))
    }

    /// Facilities assigned to a given provider, in index order.
    pub fn assigned_facilities(&self, provider_idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = (0..self.facilities.len())
            .filter(|f| self.is_assigned(provider_idx, *f))
            .collect();
        out.sort_unstable();
        out
    }

    /// Home-to-facility travel time in hours; 0 if the cell is absent.
    pub fn home_travel_hours(&self, provider_idx: usize, facility_idx: usize) -> f64 {
        self.home_travel
            .get(&(provider_idx, facility_idx))
            .copied()
            .unwrap_or(0.0)
    }

    /// Facility-to-facility travel time in hours; 0 if the cell is absent.
    pub fn facility_travel_hours(&self, from_idx: usize, to_idx: usize) -> f64 {
        self.facility_travel
            .get(&(from_idx, to_idx))
            .copied()
            .unwrap_or(0.0)
    }

    /// Monthly patient census for (provider, facility); 0 if absent.
    pub fn census(&self, provider_idx: usize, facility_idx: usize) -> u32 {
        self.census
            .get(&(provider_idx, facility_idx))
            .copied()
            .unwrap_or(0)
    }
}

/// Builds a [`Catalog`] for one business line.
///
/// `tighter_assignments`, when present, intersects the assignment set:
/// rows from `assignments` whose (provider, facility) pair does not
/// also appear in `tighter_assignments` are dropped.
pub fn build_catalog(
    business_line: &str,
    assignments: &[AssignmentRow],
    tighter_assignments: Option<&[AssignmentRow]>,
    census_rows: &[CensusRow],
    pcp_facility_matrix: &[TravelMatrixRow],
    facility_facility_matrix: &[TravelMatrixRow],
    month: &str,
) -> Result<Catalog> {
    let span = tracing::debug_span!("domain::build_catalog", business_line);
    let _enter = span.enter();

    if pcp_facility_matrix.is_empty() {
        return Err(ScheduleError::MissingTravelMatrix(
            "pcp-to-facility matrix is empty".to_string(),
        ));
    }
    if facility_facility_matrix.is_empty() {
        return Err(ScheduleError::MissingTravelMatrix(
            "facility-to-facility matrix is empty".to_string(),
        ));
    }

    let mut rows: Vec<&AssignmentRow> = assignments
        .iter()
        .filter(|r| r.business_line == business_line)
        .collect();

    if let Some(tighter) = tighter_assignments {
        let allowed: HashSet<(&str, &str)> = tighter
            .iter()
            .filter(|r| r.business_line == business_line)
            .map(|r| (r.provider_id.as_str(), r.facility_id.as_str()))
            .collect();
        rows.retain(|r| allowed.contains(&(r.provider_id.as_str(), r.facility_id.as_str())));
    }

    if rows.is_empty() {
        return Err(ScheduleError::EmptyCatalog(business_line.to_string()));
    }

    let mut provider_set: HashSet<&str> = HashSet::new();
    let mut facility_set: HashSet<&str> = HashSet::new();
    for row in &rows {
        provider_set.insert(row.provider_id.as_str());
        facility_set.insert(row.facility_id.as_str());
    }

    let mut providers: Vec<String> = provider_set.into_iter().map(String::from).collect();
    providers.sort_unstable();
    let mut facilities: Vec<String> = facility_set.into_iter().map(String::from).collect();
    facilities.sort_unstable();

    let provider_index: HashMap<String, usize> = providers
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect();
    let facility_index: HashMap<String, usize> = facilities
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect();

    let assignments: HashSet<(usize, usize)> = rows
        .iter()
        .map(|r| (provider_index[&r.provider_id], facility_index[&r.facility_id]))
        .collect();

    let mut census: HashMap<(usize, usize), u32> = HashMap::new();
    for row in census_rows {
        if row.business_line != business_line {
            continue;
        }
        let (Some(&p), Some(&f)) = (
            provider_index.get(&row.provider_id),
            facility_index.get(&row.facility_id),
        ) else {
            continue;
        };
        if let Some(&count) = row.monthly_counts.get(month) {
            census.insert((p, f), count);
        }
    }

    let home_travel = build_travel_table(pcp_facility_matrix, &provider_index, &facility_index);
    let facility_travel =
        build_travel_table(facility_facility_matrix, &facility_index, &facility_index);

    tracing::info!(
        providers = providers.len(),
        facilities = facilities.len(),
        assignments = assignments.len(),
        "catalog built"
    );

    Ok(Catalog {
        business_line: business_line.to_string(),
        providers,
        facilities,
        provider_index,
        facility_index,
        assignments,
        home_travel,
        facility_travel,
        census,
    })
}

fn build_travel_table(
    rows: &[TravelMatrixRow],
    row_index: &HashMap<String, usize>,
    col_index: &HashMap<String, usize>,
) -> HashMap<(usize, usize), f64> {
    let mut table = HashMap::new();
    for row in rows {
        let Some(&row_idx) = row_index.get(&row.row_id) else {
            continue;
        };
        for (col_id, hours) in &row.cells {
            if let Some(&col_idx) = col_index.get(col_id) {
                table.insert((row_idx, col_idx), *hours);
            }
        }
    }
    table
}
