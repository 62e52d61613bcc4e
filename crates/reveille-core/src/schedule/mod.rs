//! Next-fire-time calculation for weekly alarms.
//!
//! All arithmetic happens on local wall-clock fields of `now`'s timezone:
//! days are added to the local date and the alarm's hour and minute are
//! resolved in that zone afterwards, so weekday boundaries follow local
//! midnight. Daylight-saving transitions are not compensated.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, TimeZone};

use crate::alarm::{AlarmInstance, AlarmTime, Day};
use crate::error::DomainError;

pub const DEFAULT_LOOK_AHEAD_MINUTES: i64 = 5;
pub const DEFAULT_SNOOZE_MINUTES: i64 = 9;

pub fn default_look_ahead() -> Duration {
    Duration::minutes(DEFAULT_LOOK_AHEAD_MINUTES)
}

/// Next instant `day` at `time` occurs strictly after `now`.
///
/// If that instant is closer to `now` than `look_ahead`, the following
/// week's occurrence is returned instead.
pub fn next_fire_time<Tz>(
    day: Day,
    time: AlarmTime,
    now: &DateTime<Tz>,
    look_ahead: Duration,
) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let timezone = now.timezone();
    let today = now.date_naive();
    let current = Day::from_weekday(today.weekday());
    let days_ahead = (i64::from(day.index()) - i64::from(current.index())).rem_euclid(7);

    let mut local = today.and_time(time.to_naive_time()) + Duration::days(days_ahead);
    let mut candidate = resolve_local(&timezone, local);

    if candidate <= *now {
        local += Duration::weeks(1);
        candidate = resolve_local(&timezone, local);
    }

    if candidate.signed_duration_since(*now) < look_ahead {
        local += Duration::weeks(1);
        candidate = resolve_local(&timezone, local);
    }

    candidate
}

/// Same as [`next_fire_time`], reading day and time from a stored instance.
pub fn next_fire_time_for<Tz>(
    alarm: &AlarmInstance,
    now: &DateTime<Tz>,
    look_ahead: Duration,
) -> Result<DateTime<Tz>, DomainError>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let (day, time) = alarm.slot()?;
    Ok(next_fire_time(day, time, now, look_ahead))
}

pub fn snooze_until<Tz>(now: &DateTime<Tz>, snooze: Duration) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    *now + snooze
}

// Ambiguous wall times (clocks falling back) take the earlier instant;
// times inside a spring-forward gap move forward the way a wall clock does.
fn resolve_local<Tz>(timezone: &Tz, local: NaiveDateTime) -> DateTime<Tz>
where
    Tz: TimeZone,
{
    let mut probe = local;
    for _ in 0..24 {
        match timezone.from_local_datetime(&probe) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => probe += Duration::hours(1),
        }
    }
    timezone.from_utc_datetime(&local)
}
