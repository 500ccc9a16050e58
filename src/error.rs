//! Error taxonomy for the scheduling core.
//!
//! Every failure mode the pipeline can produce is represented here so
//! callers get a structured, user-renderable message instead of a panic
//! or an opaque solver status code.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for the scheduling core.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// The HTTP-ish status class a caller should surface for an error.
///
/// The core has no HTTP dependency; this just classifies errors the way
/// an out-of-scope transport layer would need to, per the response
/// envelope's 400/500 split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Validation or feasibility failure: the request itself is unsatisfiable.
    BadRequest,
    /// Solver or internal failure.
    ServerError,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    // ---- Validation ----
    #[error("unknown facility id: {0}")]
    UnknownFacility(String),

    #[error("unknown provider id: {0}")]
    UnknownProvider(String),

    #[error("date {date} is not a weekday within the scheduling horizon")]
    DateNotInHorizon { date: NaiveDate },

    #[error("provider {provider} is not assigned to facility {facility}")]
    NotAssigned { provider: String, facility: String },

    #[error("malformed date: {0}")]
    MalformedDate(String),

    #[error("unrecognized weekday name: {0}")]
    UnrecognizedWeekday(String),

    #[error("weeks must be 4 or 5, got {0}")]
    InvalidWeeks(u32),

    // ---- Feasibility ----
    #[error(
        "adjusted patient demand {adjusted_demand} exceeds effective capacity {capacity} \
         (alpha={alpha}, available days={available_days}, max/day={max_patients_per_day}); \
         consider raising the daily cap, reducing PTO, adjusting weekly availability, \
         or extending to 5 weeks{five_week_hint}"
    )]
    CapacityShortfall {
        adjusted_demand: u32,
        available_days: usize,
        capacity: u32,
        max_patients_per_day: u32,
        alpha: f64,
        /// Present when the request was for 4 weeks; names the capacity a
        /// 5-week horizon would provide instead.
        five_week_hint: FiveWeekHint,
    },

    #[error(
        "required visit to facility {facility} on {date} conflicts with the provider's \
         unavailability on that date"
    )]
    RequiredVisitConflict { facility: String, date: NaiveDate },

    // ---- Solver ----
    #[error("the scheduling model is infeasible")]
    Infeasible,

    #[error("the scheduling model is unbounded")]
    Unbounded,

    #[error("the solver did not find a feasible solution within the {0:?} time limit")]
    TimeLimitNoIncumbent(std::time::Duration),

    #[error("solver error: {0}")]
    SolverOther(String),

    // ---- Data ----
    #[error("no data remains for business line {0} after filtering")]
    EmptyCatalog(String),

    #[error("missing travel-time matrix: {0}")]
    MissingTravelMatrix(String),
}

impl ScheduleError {
    pub fn status_class(&self) -> StatusClass {
        use ScheduleError::*;
        match self {
            UnknownFacility(_)
            | UnknownProvider(_)
            | DateNotInHorizon { .. }
            | NotAssigned { .. }
            | MalformedDate(_)
            | UnrecognizedWeekday(_)
            | InvalidWeeks(_)
            | CapacityShortfall { .. }
            | RequiredVisitConflict { .. } => StatusClass::BadRequest,

            Infeasible | Unbounded | TimeLimitNoIncumbent(_) | SolverOther(_) | EmptyCatalog(_)
            | MissingTravelMatrix(_) => StatusClass::ServerError,
        }
    }
}

/// A human-readable fragment naming the 5-week capacity alternative, or
/// nothing when the request was already for 5 weeks.
#[derive(Debug, Clone, Default)]
pub struct FiveWeekHint(pub Option<String>);

impl std::fmt::Display for FiveWeekHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(hint) => write!(f, " ({hint})"),
            None => Ok(()),
        }
    }
}

impl FiveWeekHint {
    pub fn capacity(five_week_capacity: u32) -> Self {
        FiveWeekHint(Some(format!(
            "a 5-week horizon would provide capacity {five_week_capacity}"
        )))
    }

    pub fn none() -> Self {
        FiveWeekHint(None)
    }
}
