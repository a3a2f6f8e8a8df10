//! ISO-week scoping and the fixed weekly calendar of the competition.
//!
//! Every stored entity is keyed by a [`WeekId`] (ISO year + ISO week number,
//! displayed as `2025-W07`). The weekly rhythm is fixed in UTC: submissions run
//! Monday 00:00 to Friday 12:00, voting runs Friday 12:00 through the end of
//! Sunday.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use time::macros::time;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, Weekday};
use utoipa::ToSchema;

/// High-level phase the competition is in for a given community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Teams can submit their tracks.
    Submission,
    /// Voting is open for the submitted tracks.
    Voting,
    /// An admin paused the competition; the scheduler leaves it alone.
    Paused,
    /// The current week was cancelled (insufficient teams or no votes).
    Cancelled,
    /// The week finished normally and is waiting for the next restart.
    Ended,
    /// The competition has not been activated for this community yet.
    Inactive,
}

/// ISO year + ISO week number identifying one competition round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekId {
    year: i32,
    week: u8,
}

/// Error produced when parsing a malformed week identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid week identifier `{0}` (expected e.g. `2025-W07`)")]
pub struct ParseWeekError(String);

impl WeekId {
    /// Week containing the given date.
    pub fn of_date(date: Date) -> Self {
        let (year, week, _) = date.to_iso_week_date();
        Self { year, week }
    }

    /// Week containing the given instant.
    pub fn of(now: OffsetDateTime) -> Self {
        Self::of_date(now.date())
    }

    /// Monday of this ISO week.
    pub fn monday(&self) -> Date {
        // A (year, week) pair read back from `to_iso_week_date` always names a
        // valid ISO week, so this cannot fail for values built by this module.
        Date::from_iso_week_date(self.year, self.week, Weekday::Monday)
            .unwrap_or_else(|_| OffsetDateTime::now_utc().date())
    }

    /// The week after this one.
    pub fn next(&self) -> Self {
        Self::of_date(self.monday() + Duration::days(7))
    }

    /// The week before this one.
    pub fn prev(&self) -> Self {
        Self::of_date(self.monday() - Duration::days(7))
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = ParseWeekError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, week) = value
            .split_once("-W")
            .ok_or_else(|| ParseWeekError(value.into()))?;
        let year: i32 = year.parse().map_err(|_| ParseWeekError(value.into()))?;
        let week: u8 = week.parse().map_err(|_| ParseWeekError(value.into()))?;
        // Some years have no week 53; validate against the real ISO calendar.
        Date::from_iso_week_date(year, week, Weekday::Monday)
            .map_err(|_| ParseWeekError(value.into()))?;
        Ok(Self { year, week })
    }
}

impl Serialize for WeekId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Hour boundary where the submission window closes on Friday.
const SUBMISSION_DEADLINE: Time = time!(12:00);
/// Reminders go out in the evening before each deadline.
const REMINDER_TIME: Time = time!(18:00);
/// Week-start confirmation prompts auto-post by Monday morning at the latest.
const WEEK_START_FALLBACK: Time = time!(9:00);

fn at(date: Date, clock: Time) -> OffsetDateTime {
    PrimitiveDateTime::new(date, clock).assume_utc()
}

/// Friday 12:00 of the given week, when submissions close.
pub fn submission_deadline(week: WeekId) -> OffsetDateTime {
    at(week.monday() + Duration::days(4), SUBMISSION_DEADLINE)
}

/// Monday 00:00 of the following week, when voting closes.
pub fn voting_deadline(week: WeekId) -> OffsetDateTime {
    at(week.next().monday(), Time::MIDNIGHT)
}

/// Thursday 18:00, the evening before the submission deadline.
pub fn submission_reminder_at(week: WeekId) -> OffsetDateTime {
    at(week.monday() + Duration::days(3), REMINDER_TIME)
}

/// Sunday 18:00, the evening before the voting deadline.
pub fn voting_reminder_at(week: WeekId) -> OffsetDateTime {
    at(week.monday() + Duration::days(6), REMINDER_TIME)
}

/// Phase the wall clock alone dictates, ignoring stored state.
pub fn expected_phase(now: OffsetDateTime) -> Phase {
    if now < submission_deadline(WeekId::of(now)) {
        Phase::Submission
    } else {
        Phase::Voting
    }
}

/// Next Monday 00:00 strictly after `now` (used for restart announcements).
pub fn next_week_start(now: OffsetDateTime) -> OffsetDateTime {
    at(WeekId::of(now).next().monday(), Time::MIDNIGHT)
}

/// Next Monday 09:00 strictly after `now` (the week-start confirmation
/// fallback instant).
pub fn next_monday_morning(now: OffsetDateTime) -> OffsetDateTime {
    for offset in 0..=7 {
        let date = now.date() + Duration::days(offset);
        if date.weekday() == Weekday::Monday {
            let candidate = at(date, WEEK_START_FALLBACK);
            if candidate > now {
                return candidate;
            }
        }
    }
    // Unreachable: the loop spans a full week.
    now + Duration::days(7)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn week_id_formats_with_iso_year_and_week() {
        let week = WeekId::of(datetime!(2025-02-12 10:00 UTC));
        assert_eq!(week.to_string(), "2025-W07");
    }

    #[test]
    fn week_id_round_trips_through_parse() {
        let week: WeekId = "2025-W07".parse().unwrap();
        assert_eq!(week.to_string(), "2025-W07");
        assert!("2025-07".parse::<WeekId>().is_err());
        assert!("2025-W54".parse::<WeekId>().is_err());
        assert!("abcd-W07".parse::<WeekId>().is_err());
    }

    #[test]
    fn iso_year_differs_from_calendar_year_at_boundaries() {
        // 2024-12-30 is a Monday belonging to ISO week 2025-W01.
        let week = WeekId::of(datetime!(2024-12-30 00:00 UTC));
        assert_eq!(week.to_string(), "2025-W01");
        assert_eq!(week.monday(), datetime!(2024-12-30 00:00 UTC).date());
    }

    #[test]
    fn next_and_prev_are_inverses() {
        let week = WeekId::of(datetime!(2025-02-12 10:00 UTC));
        assert_eq!(week.next().prev(), week);
        assert!(week.next() > week);
    }

    #[test]
    fn expected_phase_follows_fixed_boundaries() {
        assert_eq!(
            expected_phase(datetime!(2025-02-10 00:00 UTC)), // Monday
            Phase::Submission
        );
        assert_eq!(
            expected_phase(datetime!(2025-02-14 11:59 UTC)), // Friday morning
            Phase::Submission
        );
        assert_eq!(
            expected_phase(datetime!(2025-02-14 12:00 UTC)), // Friday noon
            Phase::Voting
        );
        assert_eq!(
            expected_phase(datetime!(2025-02-16 23:59 UTC)), // Sunday night
            Phase::Voting
        );
    }

    #[test]
    fn deadlines_land_on_the_documented_instants() {
        let week: WeekId = "2025-W07".parse().unwrap();
        assert_eq!(submission_deadline(week), datetime!(2025-02-14 12:00 UTC));
        assert_eq!(voting_deadline(week), datetime!(2025-02-17 00:00 UTC));
        assert_eq!(
            submission_reminder_at(week),
            datetime!(2025-02-13 18:00 UTC)
        );
        assert_eq!(voting_reminder_at(week), datetime!(2025-02-16 18:00 UTC));
    }

    #[test]
    fn next_monday_morning_handles_monday_edge() {
        // Monday before 09:00: the fallback is later the same day.
        assert_eq!(
            next_monday_morning(datetime!(2025-02-10 08:00 UTC)),
            datetime!(2025-02-10 09:00 UTC)
        );
        // Monday after 09:00: the fallback rolls over a full week.
        assert_eq!(
            next_monday_morning(datetime!(2025-02-10 10:00 UTC)),
            datetime!(2025-02-17 09:00 UTC)
        );
    }
}
