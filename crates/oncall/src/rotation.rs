//! Who is on call, and when the next handoff happens.
//!
//! Rotation position is derived from wall-clock time alone: the index into a
//! schedule's member list is the number of whole rotation periods since the
//! Unix epoch, modulo the member count. There is no stored cursor, so a
//! restart never desynchronizes the rotation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::roster::{OnCallSchedule, PersonId, RotationType};

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationHandoff {
    pub current: PersonId,
    pub next: PersonId,
    pub handoff_time: DateTime<Utc>,
}

pub struct RotationCalculator;

impl RotationCalculator {
    /// `None` when the schedule has no rotation members.
    pub fn current_on_call(schedule: &OnCallSchedule, now: DateTime<Utc>) -> Option<&PersonId> {
        let members = &schedule.members;
        if members.is_empty() {
            return None;
        }

        let period = match schedule.rotation.rotation_type {
            RotationType::Weekly => SECONDS_PER_WEEK,
            RotationType::Daily => SECONDS_PER_DAY,
            RotationType::Monthly | RotationType::Unspecified => return members.first(),
        };

        let elapsed = now.timestamp().div_euclid(period);
        let idx = elapsed.rem_euclid(members.len() as i64) as usize;
        members.get(idx)
    }

    /// First handoff instant strictly after `from` (daily: the next calendar day).
    pub fn next_handoff(schedule: &OnCallSchedule, from: DateTime<Utc>) -> DateTime<Utc> {
        let rotation = &schedule.rotation;
        let at_handoff = |date: NaiveDate| date.and_time(rotation.handoff_time.0).and_utc();
        let today = from.date_naive();

        match rotation.rotation_type {
            RotationType::Weekly => {
                let target = rotation.handoff_day.num_days_from_monday() as i64;
                let current = from.weekday().num_days_from_monday() as i64;
                let days_ahead = (target - current).rem_euclid(7);
                let candidate = at_handoff(today + Duration::days(days_ahead));
                if candidate > from {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
            RotationType::Daily => at_handoff(today + Duration::days(1)),
            RotationType::Monthly => {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .map(at_handoff)
                    .unwrap_or_else(|| from + Duration::hours(rotation.duration_hours as i64))
            }
            RotationType::Unspecified => from + Duration::hours(rotation.duration_hours as i64),
        }
    }

    pub fn next_rotation(schedule: &OnCallSchedule, now: DateTime<Utc>) -> Option<RotationHandoff> {
        let current = Self::current_on_call(schedule, now)?.clone();
        let handoff_time = Self::next_handoff(schedule, now);
        let next = Self::current_on_call(schedule, handoff_time)?.clone();

        Some(RotationHandoff {
            current,
            next,
            handoff_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{EscalationPolicy, RotationPolicy, TimeOfDay};
    use chrono::{TimeZone, Weekday};

    fn schedule(rotation_type: RotationType, members: &[&str]) -> OnCallSchedule {
        OnCallSchedule {
            id: "s".to_string(),
            name: "S".to_string(),
            timezone: "UTC".to_string(),
            rotation: RotationPolicy {
                rotation_type,
                duration_hours: 168,
                handoff_time: TimeOfDay::parse("09:00").unwrap(),
                handoff_day: Weekday::Mon,
            },
            members: members.iter().map(|m| m.to_string()).collect(),
            escalation: EscalationPolicy::default(),
        }
    }

    fn week(w: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(w * SECONDS_PER_WEEK + 3600, 0).unwrap()
    }

    #[test]
    fn test_weekly_rotation_has_period_two_for_two_members() {
        let s = schedule(RotationType::Weekly, &["A", "B"]);
        let w = 2_800;
        let at_w = RotationCalculator::current_on_call(&s, week(w)).unwrap();
        let at_w1 = RotationCalculator::current_on_call(&s, week(w + 1)).unwrap();
        let at_w2 = RotationCalculator::current_on_call(&s, week(w + 2)).unwrap();
        assert_eq!(at_w, at_w2);
        assert_ne!(at_w, at_w1);
        assert_eq!(at_w, "A");
    }

    #[test]
    fn test_daily_rotation_cycles_through_members() {
        let s = schedule(RotationType::Daily, &["A", "B", "C"]);
        let day = |d: i64| Utc.timestamp_opt(d * SECONDS_PER_DAY + 60, 0).unwrap();
        let picks: Vec<_> = (0..4)
            .map(|d| RotationCalculator::current_on_call(&s, day(20_000 + d)).unwrap().clone())
            .collect();
        assert_eq!(picks[0], picks[3]);
        assert_ne!(picks[0], picks[1]);
        assert_ne!(picks[1], picks[2]);
    }

    #[test]
    fn test_other_rotation_types_use_first_member() {
        let s = schedule(RotationType::Monthly, &["A", "B"]);
        for w in 0..4 {
            assert_eq!(RotationCalculator::current_on_call(&s, week(w)).unwrap(), "A");
        }
        let s = schedule(RotationType::Unspecified, &["B", "A"]);
        assert_eq!(RotationCalculator::current_on_call(&s, week(1)).unwrap(), "B");
    }

    #[test]
    fn test_empty_members_has_no_on_call() {
        let s = schedule(RotationType::Weekly, &[]);
        assert!(RotationCalculator::current_on_call(&s, Utc::now()).is_none());
        assert!(RotationCalculator::next_rotation(&s, Utc::now()).is_none());
    }

    #[test]
    fn test_weekly_handoff_is_next_configured_weekday() {
        let s = schedule(RotationType::Weekly, &["A", "B"]);
        // Wednesday 2024-06-12 -> Monday 2024-06-17 09:00
        let from = Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2024, 6, 17, 9, 0, 0).unwrap()
        );

        // Monday before the handoff hour hands off the same day
        let from = Utc.with_ymd_and_hms(2024, 6, 17, 8, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2024, 6, 17, 9, 0, 0).unwrap()
        );

        // Monday after the handoff hour waits a full week
        let from = Utc.with_ymd_and_hms(2024, 6, 17, 10, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2024, 6, 24, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_handoff_respects_configured_day() {
        let mut s = schedule(RotationType::Weekly, &["A"]);
        s.rotation.handoff_day = Weekday::Fri;
        let from = Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2024, 6, 14, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_daily_handoff_is_next_day_at_handoff_time() {
        let s = schedule(RotationType::Daily, &["A"]);
        let from = Utc.with_ymd_and_hms(2024, 12, 31, 7, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_handoff_is_first_of_next_month() {
        let s = schedule(RotationType::Monthly, &["A"]);
        let from = Utc.with_ymd_and_hms(2024, 12, 15, 7, 0, 0).unwrap();
        assert_eq!(
            RotationCalculator::next_handoff(&s, from),
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_rotation_reports_member_at_handoff() {
        let s = schedule(RotationType::Daily, &["A", "B"]);
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap();
        let handoff = RotationCalculator::next_rotation(&s, now).unwrap();
        assert_eq!(handoff.handoff_time, Utc.with_ymd_and_hms(2024, 6, 13, 9, 0, 0).unwrap());
        assert_ne!(handoff.current, handoff.next);
        assert_eq!(
            &handoff.next,
            RotationCalculator::current_on_call(&s, handoff.handoff_time).unwrap()
        );
    }
}
