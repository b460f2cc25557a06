use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::models::{AgendaQuery, AppointmentError};

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// The span an agenda lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaPeriod {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
}

impl AgendaPeriod {
    /// `day` wins over `month`+`year`, which wins over a bare `year`.
    pub fn from_query(query: &AgendaQuery) -> Result<Self, AppointmentError> {
        let period = match (query.day, query.month, query.year) {
            (Some(day), _, _) => AgendaPeriod::Day(day),
            (None, Some(month), Some(year)) => AgendaPeriod::Month { year, month },
            (None, None, Some(year)) => AgendaPeriod::Year(year),
            (None, Some(_), None) => {
                return Err(AppointmentError::InvalidPeriod("month requires a year".to_string()))
            }
            (None, None, None) => {
                return Err(AppointmentError::InvalidPeriod(
                    "provide day, month and year, or year".to_string(),
                ))
            }
        };

        let year = match period {
            AgendaPeriod::Day(day) => day.year(),
            AgendaPeriod::Month { year, .. } | AgendaPeriod::Year(year) => year,
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(AppointmentError::InvalidPeriod(format!(
                "year must be between {} and {}",
                MIN_YEAR, MAX_YEAR
            )));
        }

        Ok(period)
    }

    /// Half-open `[start, end)` range of timestamps inside the period.
    pub fn bounds(&self) -> Result<(NaiveDateTime, NaiveDateTime), AppointmentError> {
        let (start, end) = match *self {
            AgendaPeriod::Day(day) => (Some(day), day.succ_opt()),
            AgendaPeriod::Month { year, month } => {
                let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                (
                    NaiveDate::from_ymd_opt(year, month, 1),
                    NaiveDate::from_ymd_opt(next_year, next_month, 1),
                )
            }
            AgendaPeriod::Year(year) => (
                NaiveDate::from_ymd_opt(year, 1, 1),
                NaiveDate::from_ymd_opt(year + 1, 1, 1),
            ),
        };

        match (start.and_then(midnight), end.and_then(midnight)) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(AppointmentError::InvalidPeriod(format!("{:?} is not a valid period", self))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AgendaPeriod::Day(day) => day.format("%d/%m/%Y").to_string(),
            AgendaPeriod::Month { year, month } => format!("{:02}/{}", month, year),
            AgendaPeriod::Year(year) => year.to_string(),
        }
    }
}

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}
