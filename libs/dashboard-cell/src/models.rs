// =====================================================================================
// DASHBOARD CELL MODELS
// =====================================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_FROM: (i32, u32, u32) = (2015, 1, 1);
pub const DEFAULT_TO: (i32, u32, u32) = (2036, 12, 29);
pub const RANKING_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineGrouping {
    #[default]
    Day,
    Week,
    Month,
}

impl TimelineGrouping {
    /// SQLite `strftime` pattern producing the bucket key.
    pub fn strftime_pattern(&self) -> &'static str {
        match self {
            TimelineGrouping::Day => "%Y-%m-%d",
            TimelineGrouping::Week => "%Y-%W",
            TimelineGrouping::Month => "%Y-%m",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub specialty: Option<String>,
    pub group_by: Option<TimelineGrouping>,
}

/// Inclusive date range on the date part of the appointment timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpis {
    pub total_appointments: i64,
    pub total_doctors: i64,
    pub unique_patients: i64,
    pub average_per_doctor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorRanking {
    pub code: String,
    pub name: String,
    pub specialty: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientRanking {
    pub cpf: String,
    pub name: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpecialtyCount {
    pub specialty: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimelinePoint {
    pub period: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStats {
    pub mean: f64,
    pub max: i64,
    pub min: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub grouping: TimelineGrouping,
    pub points: Vec<TimelinePoint>,
    pub stats: Option<TimelineStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IdleDoctor {
    pub code: String,
    pub name: String,
    pub specialty: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub filter: DashboardFilter,
    pub kpis: Kpis,
    pub top_doctors: Vec<DoctorRanking>,
    pub top_patients: Vec<PatientRanking>,
    pub specialties: Vec<SpecialtyCount>,
    pub timeline: Timeline,
    pub idle_doctors: Vec<IdleDoctor>,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        DashboardError::DatabaseError(err.to_string())
    }
}

impl DashboardFilter {
    pub fn from_query(query: &DashboardQuery) -> Result<Self, DashboardError> {
        let default_date = |(y, m, d): (i32, u32, u32)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .ok_or_else(|| DashboardError::InvalidRange(format!("{}-{}-{} is not a date", y, m, d)))
        };

        let from = match query.from {
            Some(from) => from,
            None => default_date(DEFAULT_FROM)?,
        };
        let to = match query.to {
            Some(to) => to,
            None => default_date(DEFAULT_TO)?,
        };

        if from > to {
            return Err(DashboardError::InvalidRange(format!("{} is after {}", from, to)));
        }

        let specialty = query
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self { from, to, specialty })
    }
}

/// Mean, max and min over the timeline buckets; `None` when there are none.
pub fn summarize(points: &[TimelinePoint]) -> Option<TimelineStats> {
    let max = points.iter().map(|p| p.total).max()?;
    let min = points.iter().map(|p| p.total).min()?;
    let sum: i64 = points.iter().map(|p| p.total).sum();

    Some(TimelineStats {
        mean: sum as f64 / points.len() as f64,
        max,
        min,
    })
}
