//! Slot checks shared by booking and cancellation recovery. Every function
//! takes a connection so callers can run them inside their own transaction.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use sqlx::SqliteConnection;
use tracing::debug;

pub const SLOT_STEP_MINUTES: i64 = 30;
pub const MAX_SUGGESTIONS: usize = 3;
pub const SUGGESTION_SEARCH_DAYS: i64 = 3;

const WORKDAY_START_HOUR: u32 = 8;
const WORKDAY_END_HOUR: u32 = 20;

/// The identifying tuple of a booking.
#[derive(Debug, Clone)]
pub struct BookingKey<'a> {
    pub patient_cpf: &'a str,
    pub doctor_code: &'a str,
    pub clinic_code: &'a str,
    pub scheduled_at: NaiveDateTime,
}

/// Id of an existing appointment with the identical booking tuple.
pub async fn find_duplicate(
    conn: &mut SqliteConnection,
    key: &BookingKey<'_>,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM appointments \
         WHERE patient_cpf = ? AND doctor_code = ? AND clinic_code = ? AND scheduled_at = ? \
         AND (? IS NULL OR id <> ?) \
         LIMIT 1",
    )
    .bind(key.patient_cpf)
    .bind(key.doctor_code)
    .bind(key.clinic_code)
    .bind(key.scheduled_at)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await
}

/// Id of whatever appointment already occupies the doctor at `at`.
pub async fn find_doctor_conflict(
    conn: &mut SqliteConnection,
    doctor_code: &str,
    at: NaiveDateTime,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM appointments \
         WHERE doctor_code = ? AND scheduled_at = ? \
         AND (? IS NULL OR id <> ?) \
         LIMIT 1",
    )
    .bind(doctor_code)
    .bind(at)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await
}

/// Free slots for the doctor near `requested`: later half-hour steps on the
/// same day inside working hours, then the following days from 08:00.
pub async fn suggest_alternative_slots(
    conn: &mut SqliteConnection,
    doctor_code: &str,
    requested: NaiveDateTime,
) -> Result<Vec<NaiveDateTime>, sqlx::Error> {
    debug!("Generating alternative slots for doctor {}", doctor_code);

    let window_end = requested + Duration::days(SUGGESTION_SEARCH_DAYS + 1);
    let booked: HashSet<NaiveDateTime> = sqlx::query_scalar::<_, NaiveDateTime>(
        "SELECT scheduled_at FROM appointments WHERE doctor_code = ? AND scheduled_at > ? AND scheduled_at < ?",
    )
    .bind(doctor_code)
    .bind(requested)
    .bind(window_end)
    .fetch_all(conn)
    .await?
    .into_iter()
    .collect();

    Ok(candidate_slots(requested)
        .filter(|slot| !booked.contains(slot))
        .take(MAX_SUGGESTIONS)
        .collect())
}

fn candidate_slots(requested: NaiveDateTime) -> impl Iterator<Item = NaiveDateTime> {
    let step = Duration::minutes(SLOT_STEP_MINUTES);
    let same_day = requested.date();

    let rest_of_day = std::iter::successors(Some(requested + step), move |t| Some(*t + step))
        .take_while(move |t| t.date() == same_day)
        .filter(|t| within_working_hours(t.time()));

    let following_days = (1..=SUGGESTION_SEARCH_DAYS).flat_map(move |offset| {
        let day = same_day + Duration::days(offset);
        std::iter::successors(day.and_hms_opt(WORKDAY_START_HOUR, 0, 0), move |t| Some(*t + step))
            .take_while(|t| within_working_hours(t.time()))
    });

    rest_of_day.chain(following_days)
}

fn within_working_hours(time: NaiveTime) -> bool {
    time.hour() >= WORKDAY_START_HOUR && time.hour() < WORKDAY_END_HOUR
}
