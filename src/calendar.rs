use chrono::{Days, NaiveDate};

use crate::models::{CycleDayProjection, StatsSummary};

const LUTEAL_PHASE_DAYS: u64 = 14;
const FERTILE_LEAD_DAYS: u64 = 5;
const FERTILE_WINDOW_DAYS: u64 = 7;

/// Locate today inside the current cycle given a last known period start.
///
/// The cycle start is rolled forward in whole cycles up to today. A last
/// period dated in the future is stepped back a single cycle. The period
/// never runs past the cycle that contains it. Returns `None`
/// for a non-positive cycle length, a negative period duration, or dates
/// outside chrono's range.
pub fn project_cycle_day(
    last_period: NaiveDate,
    avg_cycle_length: i64,
    avg_period_duration: i64,
    today: NaiveDate,
) -> Option<CycleDayProjection> {
    let cycle_len = u64::try_from(avg_cycle_length).ok().filter(|len| *len > 0)?;
    let period_len = u64::try_from(avg_period_duration).ok()?.min(cycle_len);

    let elapsed = (today - last_period).num_days();
    let cycle_start = if elapsed >= 0 {
        let whole_cycles = elapsed as u64 / cycle_len;
        last_period.checked_add_days(Days::new(whole_cycles.checked_mul(cycle_len)?))?
    } else {
        last_period.checked_sub_days(Days::new(cycle_len))?
    };

    let next_period_start = cycle_start.checked_add_days(Days::new(cycle_len))?;
    let period_days = (0..period_len)
        .map(|i| cycle_start.checked_add_days(Days::new(i)))
        .collect::<Option<Vec<_>>>()?;

    let ovulation_day = next_period_start.checked_sub_days(Days::new(LUTEAL_PHASE_DAYS))?;
    let fertile_start = ovulation_day.checked_sub_days(Days::new(FERTILE_LEAD_DAYS))?;
    let fertile_days = (0..FERTILE_WINDOW_DAYS)
        .map(|i| fertile_start.checked_add_days(Days::new(i)))
        .collect::<Option<Vec<_>>>()?;

    Some(CycleDayProjection {
        cycle_start,
        next_period_start,
        current_day_of_cycle: (today - cycle_start).num_days() + 1,
        days_until_next_period: (next_period_start - today).num_days(),
        period_days,
        ovulation_day,
        fertile_days,
    })
}

/// Projection driven by a stats summary; averages are rounded to whole days.
pub fn project_from_stats(stats: &StatsSummary, today: NaiveDate) -> Option<CycleDayProjection> {
    let last_period = stats.last_cycle_date?.date_naive();
    project_cycle_day(
        last_period,
        stats.avg_cycle_length.round() as i64,
        stats.avg_period_length.round() as i64,
        today,
    )
}
