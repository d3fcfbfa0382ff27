use chrono::{DateTime, Datelike, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

const WEEK_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The nearest instant strictly after `now` falling on `weekday` at `at`.
///
/// A candidate landing exactly on `now` (or earlier the same day) rolls a
/// full week forward, so the result is never in the past.
pub fn next_occurrence(weekday: Weekday, at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let days_ahead =
        (weekday.num_days_from_monday() + 7 - now.weekday().num_days_from_monday()) % 7;

    let candidate = now
        .date()
        .checked_add_signed(TimeDelta::days(days_ahead as i64))
        .expect("Not realistic to overflow")
        .and_time(at);

    if candidate <= now {
        candidate
            .checked_add_signed(TimeDelta::days(7))
            .expect("Not realistic to overflow")
    } else {
        candidate
    }
}

/// The occurrence a reminder targets and the instant it should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPlan {
    pub class_time: NaiveDateTime,
    pub fire_time: NaiveDateTime,
}

/// Plans the next reminder for a weekly class: `fire_time` is `lead_minutes`
/// before the next occurrence. A lead that eats all the remaining slack
/// before the class shifts the target occurrence forward by whole weeks,
/// keeping `fire_time` strictly in the future.
pub fn plan_reminder(
    weekday: Weekday,
    start: NaiveTime,
    lead_minutes: u32,
    now: NaiveDateTime,
) -> ReminderPlan {
    let lead = TimeDelta::minutes(lead_minutes as i64);
    let mut class_time = next_occurrence(weekday, start, now);
    let mut fire_time = class_time - lead;

    if fire_time <= now {
        let weeks_behind = (now - fire_time).num_seconds().div_euclid(WEEK_SECONDS) + 1;
        let shift = TimeDelta::seconds(weeks_behind * WEEK_SECONDS);
        class_time += shift;
        fire_time += shift;
    }

    ReminderPlan {
        class_time,
        fire_time,
    }
}

/// Resolves a planned local wall-clock instant to UTC. Ambiguous local times
/// (clocks rolled back) take the earlier instant; local times skipped by a
/// transition resolve to the same wall clock one hour on.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = local + TimeDelta::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&shifted))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, Timelike};
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn class_later_today_stays_today() {
        // 2025-06-02 is a Monday.
        let now = naive(2025, 6, 2, 8, 0);
        let result = next_occurrence(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), now);
        assert_eq!(result, naive(2025, 6, 2, 9, 0));
    }

    #[test]
    fn class_already_passed_today_rolls_a_week() {
        let now = naive(2025, 6, 2, 9, 10);
        let result = next_occurrence(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), now);
        assert_eq!(result, naive(2025, 6, 9, 9, 0));
    }

    #[test]
    fn exactly_on_the_occurrence_rolls_a_week() {
        let now = naive(2025, 6, 2, 9, 0);
        let result = next_occurrence(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), now);
        assert_eq!(result, naive(2025, 6, 9, 9, 0));
    }

    #[test]
    fn monday_class_seen_from_monday_after_start() {
        // now = Monday 09:10, class Monday 09:00, lead 5: the class moved to
        // next Monday and the reminder fires at 08:55 that day.
        let now = naive(2025, 6, 2, 9, 10);
        let plan = plan_reminder(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 5, now);
        assert_eq!(plan.class_time, naive(2025, 6, 9, 9, 0));
        assert_eq!(plan.fire_time, naive(2025, 6, 9, 8, 55));
    }

    #[test]
    fn friday_class_seen_from_wednesday() {
        // now = Wednesday 08:00, class Friday 14:00, lead 10: this week.
        let now = naive(2025, 6, 4, 8, 0);
        let plan = plan_reminder(
            Weekday::Fri,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            10,
            now,
        );
        assert_eq!(plan.class_time, naive(2025, 6, 6, 14, 0));
        assert_eq!(plan.fire_time, naive(2025, 6, 6, 13, 50));
    }

    #[test]
    fn lead_longer_than_remaining_slack_rolls_the_class() {
        // Five minutes before a class starting in five minutes: the reminder
        // would fire right now, so the whole occurrence moves a week out.
        let now = naive(2025, 6, 6, 13, 55);
        let plan = plan_reminder(
            Weekday::Fri,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            10,
            now,
        );
        assert_eq!(plan.class_time, naive(2025, 6, 13, 14, 0));
        assert_eq!(plan.fire_time, naive(2025, 6, 13, 13, 50));
    }

    #[test]
    fn multi_week_lead_shifts_by_whole_weeks() {
        let now = naive(2025, 6, 2, 9, 10);
        // 30000 minutes is just under three weeks of lead.
        let plan = plan_reminder(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            30_000,
            now,
        );
        assert_eq!(plan.class_time, naive(2025, 6, 23, 9, 0));
        assert_eq!(plan.fire_time, naive(2025, 6, 2, 13, 0));
        assert!(plan.fire_time > now);
    }

    #[test]
    fn zero_lead_fires_at_class_start() {
        let now = naive(2025, 6, 4, 8, 0);
        let plan = plan_reminder(
            Weekday::Fri,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            0,
            now,
        );
        assert_eq!(plan.fire_time, plan.class_time);
    }

    #[test]
    fn skipped_local_time_resolves_an_hour_later() {
        // US clocks jump from 02:00 to 03:00 on 2025-03-09; 02:30 never
        // happens on the wall.
        let local = naive(2025, 3, 9, 2, 30);
        let resolved = resolve_local(chrono_tz::America::New_York, local);
        assert_eq!(
            resolved,
            Utc.with_ymd_and_hms(2025, 3, 9, 7, 30, 0).unwrap()
        );
    }

    #[test]
    fn ambiguous_local_time_takes_the_earlier_instant() {
        // 01:30 happens twice on 2025-11-02; the EDT reading comes first.
        let local = naive(2025, 11, 2, 1, 30);
        let resolved = resolve_local(chrono_tz::America::New_York, local);
        assert_eq!(
            resolved,
            Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap()
        );
    }

    fn weekday_strategy() -> impl Strategy<Value = Weekday> {
        const DAYS: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        (0usize..7).prop_map(|i| DAYS[i])
    }

    fn now_strategy() -> impl Strategy<Value = NaiveDateTime> {
        (0i64..40_000, 0u32..86_400).prop_map(|(days, secs)| {
            NaiveDate::from_ymd_opt(1990, 1, 1)
                .unwrap()
                .checked_add_signed(TimeDelta::days(days))
                .unwrap()
                .and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap())
        })
    }

    proptest! {
        #[test]
        fn occurrence_is_strictly_future_and_within_a_week(
            weekday in weekday_strategy(),
            at in arb::<NaiveTime>(),
            now in now_strategy(),
        ) {
            let at = at.with_second(0).unwrap().with_nanosecond(0).unwrap();
            let result = next_occurrence(weekday, at, now);

            prop_assert!(result > now, "result must be strictly after now");
            prop_assert!(result - now <= TimeDelta::days(7), "result must be within a week");
            prop_assert_eq!(result.weekday(), weekday);
            prop_assert_eq!(result.time(), at);
        }

        #[test]
        fn plan_keeps_lead_and_stays_future(
            weekday in weekday_strategy(),
            at in arb::<NaiveTime>(),
            lead in 0u32..40_000,
            now in now_strategy(),
        ) {
            let at = at.with_second(0).unwrap().with_nanosecond(0).unwrap();
            let plan = plan_reminder(weekday, at, lead, now);

            prop_assert!(plan.fire_time > now, "fire time must be strictly after now");
            prop_assert_eq!(plan.class_time - plan.fire_time, TimeDelta::minutes(lead as i64));
            prop_assert_eq!(plan.class_time.weekday(), weekday);
            prop_assert_eq!(plan.class_time.time(), at);
        }
    }
}
