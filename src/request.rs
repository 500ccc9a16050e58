//! Request payload types for a single-provider solve.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, Result};

/// The five business weekdays the system ever schedules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusinessDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl BusinessDay {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "Monday" => Ok(BusinessDay::Monday),
            "Tuesday" => Ok(BusinessDay::Tuesday),
            "Wednesday" => Ok(BusinessDay::Wednesday),
            "Thursday" => Ok(BusinessDay::Thursday),
            "Friday" => Ok(BusinessDay::Friday),
            other => Err(ScheduleError::UnrecognizedWeekday(other.to_string())),
        }
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            BusinessDay::Monday => chrono::Weekday::Mon,
            BusinessDay::Tuesday => chrono::Weekday::Tue,
            BusinessDay::Wednesday => chrono::Weekday::Wed,
            BusinessDay::Thursday => chrono::Weekday::Thu,
            BusinessDay::Friday => chrono::Weekday::Fri,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PtoRequest {
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeeklyAvailabilityEntry {
    pub day: String,
    #[serde(rename = "isWorking")]
    pub is_working: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DateConstraint {
    #[serde(rename = "facilityId")]
    pub facility_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DayOfWeekConstraint {
    #[serde(rename = "facilityId")]
    pub facility_id: String,
    pub day: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConstraints {
    #[serde(default, rename = "ptoRequests")]
    pub pto_requests: Vec<PtoRequest>,
    #[serde(default, rename = "weeklyAvailability")]
    pub weekly_availability: Vec<WeeklyAvailabilityEntry>,
    #[serde(default, rename = "dateConstraints")]
    pub date_constraints: Vec<DateConstraint>,
    #[serde(default, rename = "dayOfWeekConstraints")]
    pub day_of_week_constraints: Vec<DayOfWeekConstraint>,
}

fn default_weeks() -> u32 {
    4
}
fn default_max_patients_per_day() -> u32 {
    15
}
fn default_alpha() -> f64 {
    0.05
}
fn default_lambda_facility() -> f64 {
    0.1
}
fn default_lambda_bunching() -> f64 {
    0.1
}
fn default_facility_visit_window() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleRequest {
    pub business_line: String,
    pub start_monday: NaiveDate,
    pub selected_provider: String,
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default = "default_max_patients_per_day")]
    pub max_patients_per_day: u32,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub lambda_param: f64,
    #[serde(default = "default_lambda_facility")]
    pub lambda_facility: f64,
    #[serde(default = "default_lambda_bunching")]
    pub lambda_bunching: f64,
    #[serde(default = "default_facility_visit_window")]
    pub facility_visit_window: usize,
    #[serde(default)]
    pub provider_constraints: ProviderConstraints,
}
