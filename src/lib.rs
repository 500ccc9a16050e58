//! Single-provider scheduling core: builds a four- or five-week work
//! calendar for a field-based healthcare provider from a catalog of
//! facilities, a monthly patient census, and a set of PTO/availability
//! constraints, via a mixed-integer program minimizing daily travel
//! time while honoring demand coverage and visit spacing.
//!
//! HTTP transport, persistence, calendar-file emission, outbound
//! email, distance-matrix file ingestion, and the multi-provider
//! "business-line" driver that loops this core once per provider are
//! external collaborators this crate does not implement.

pub mod constraints;
pub mod domain;
pub mod error;
pub mod horizon;
pub mod model;
pub mod postprocess;
pub mod preflight;
pub mod request;
pub mod schedule;
pub mod solve;

use std::time::Duration;

use domain::{Catalog, UnavailableDateRow};
use error::{Result, ScheduleError};
use horizon::Horizon;
use request::ScheduleRequest;
use schedule::{ScheduleResponse, ScheduleResult};

/// The MIP solver's wall-clock budget.
pub const DEFAULT_SOLVE_TIME_LIMIT: Duration = Duration::from_secs(15);

/// Runs the full single-provider pipeline: build the horizon, compile
/// constraints, run the feasibility pre-flight, build and solve the
/// MIP, and package the result.
///
/// `file_unavailable_dates` is the file-sourced half of the
/// unavailability union; it is unioned with the request's
/// `ptoRequests` inside the constraint compiler.
pub fn solve_schedule(
    catalog: &Catalog,
    request: &ScheduleRequest,
    file_unavailable_dates: &[UnavailableDateRow],
) -> Result<ScheduleResult> {
    solve_schedule_with_time_limit(catalog, request, file_unavailable_dates, DEFAULT_SOLVE_TIME_LIMIT)
}

/// Same as [`solve_schedule`] but with an explicit solver wall-clock
/// limit, for callers that want to override the default.
pub fn solve_schedule_with_time_limit(
    catalog: &Catalog,
    request: &ScheduleRequest,
    file_unavailable_dates: &[UnavailableDateRow],
    time_limit: Duration,
) -> Result<ScheduleResult> {
    let span = tracing::info_span!(
        "solve_schedule",
        business_line = %request.business_line,
        provider = %request.selected_provider
    );
    let _enter = span.enter();

    if request.weeks != 4 && request.weeks != 5 {
        return Err(ScheduleError::InvalidWeeks(request.weeks));
    }

    let provider_idx = catalog
        .provider_index(&request.selected_provider)
        .ok_or_else(|| ScheduleError::UnknownProvider(request.selected_provider.clone()))?;

    let horizon = Horizon::build(request.start_monday, request.weeks);

    let compiled = constraints::compile(
        catalog,
        provider_idx,
        &horizon,
        &request.provider_constraints,
        file_unavailable_dates,
    )?;

    let preflight_report = preflight::check(
        catalog,
        provider_idx,
        &horizon,
        &compiled,
        request.alpha,
        request.max_patients_per_day,
        request.weeks,
    )?;

    let options = model::ModelOptions {
        max_patients_per_day: request.max_patients_per_day,
        lambda_param: request.lambda_param,
        lambda_facility: request.lambda_facility,
        lambda_bunching: request.lambda_bunching,
        facility_visit_window: request.facility_visit_window,
    };

    let compiled_model = model::build(
        catalog,
        provider_idx,
        horizon.day_count(),
        &preflight_report,
        &compiled,
        &options,
    );

    let outcome = solve::solve(compiled_model, time_limit)?;

    let travel = postprocess::report(catalog, provider_idx, horizon.day_count(), &outcome);

    let result = schedule::package(
        catalog,
        provider_idx,
        &request.selected_provider,
        horizon.dates(),
        request,
        &preflight_report,
        &outcome,
        &travel,
    );

    tracing::info!(
        total_patients_served = result.total_patients_served,
        total_travel_time = result.total_travel_time,
        "schedule solved"
    );

    Ok(result)
}

/// Runs [`solve_schedule`] and collapses the outcome into the wire
/// envelope: a success payload or a structured error, never a partial
/// schedule alongside one.
pub fn solve_schedule_envelope(
    catalog: &Catalog,
    request: &ScheduleRequest,
    file_unavailable_dates: &[UnavailableDateRow],
) -> ScheduleResponse {
    match solve_schedule(catalog, request, file_unavailable_dates) {
        Ok(results) => ScheduleResponse::Success {
            results: Box::new(results),
        },
        Err(err) => {
            tracing::warn!(error = %err, "schedule request failed");
            ScheduleResponse::error(&err)
        }
    }
}
