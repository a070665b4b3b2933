// Daily habits: a per-record streak reducer and a view-level perfect-day reducer.
// The two share nothing but the day window.

use super::{DayWindow, Prepared};
use crate::error::{CortexError, Result};
use crate::record::{Record, Value};
use crate::relation::display_name;
use crate::schema::{Database, MyDayViewConfig};
use chrono::NaiveDate;
use serde::Serialize;

/// Stored streak state of one habit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStreak {
    pub last_completed: Option<NaiveDate>,
    pub streak: u32,
}

impl HabitStreak {
    pub fn read(record: &Record, config: &MyDayViewConfig) -> Self {
        let last_completed = record.get(&config.date_field_id).and_then(Value::to_date);
        let streak = record
            .get(&config.streak_field_id)
            .map(Value::to_number)
            .filter(|n| n.is_finite() && *n > 0.0)
            .map_or(0, |n| n.floor().min(u32::MAX as f64) as u32);
        HabitStreak {
            last_completed,
            streak,
        }
    }

    pub fn completed_today(&self, days: DayWindow) -> bool {
        days.is_today(self.last_completed)
    }

    /// The streak to show: stale streaks display as broken.
    pub fn display_streak(&self, days: DayWindow) -> u32 {
        if days.is_active(self.last_completed) {
            self.streak
        } else {
            0
        }
    }
}

/// Toggle a habit for today.
///
/// Completing continues the streak only from yesterday. Undoing today's
/// completion steps the streak back and rewinds the date to yesterday when
/// a streak remains, otherwise clears it.
pub fn toggle_streak(current: HabitStreak, days: DayWindow) -> HabitStreak {
    if current.completed_today(days) {
        HabitStreak {
            last_completed: if current.streak > 1 {
                Some(days.yesterday)
            } else {
                None
            },
            streak: current.streak.saturating_sub(1),
        }
    } else {
        let streak = if days.is_yesterday(current.last_completed) {
            current.streak.saturating_add(1)
        } else {
            1
        };
        HabitStreak {
            last_completed: Some(days.today),
            streak,
        }
    }
}

/// View-level count of consecutive days on which every habit was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfectStreak {
    pub count: u32,
    pub last_day: Option<NaiveDate>,
}

impl PerfectStreak {
    pub fn from_config(config: &MyDayViewConfig) -> Self {
        PerfectStreak {
            count: config.perfect_streak,
            last_day: config.last_perfect_day,
        }
    }

    pub fn apply_to(&self, config: &mut MyDayViewConfig) {
        config.perfect_streak = self.count;
        config.last_perfect_day = self.last_day;
    }
}

/// Record that today became a perfect day. Idempotent within a day.
pub fn record_perfect_day(current: PerfectStreak, days: DayWindow) -> PerfectStreak {
    if days.is_today(current.last_day) {
        return current;
    }
    let count = if days.is_yesterday(current.last_day) {
        current.count.saturating_add(1)
    } else {
        1
    };
    PerfectStreak {
        count,
        last_day: Some(days.today),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitState {
    pub record: Record,
    pub title: String,
    pub completed_today: bool,
    pub streak: HabitStreak,
    pub streak_active: bool,
    pub display_streak: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyDayState {
    pub today: NaiveDate,
    pub habits: Vec<HabitState>,
    pub pending: usize,
    pub completed: usize,
    pub all_done: bool,
    pub perfect_streak: PerfectStreak,
    pub perfect_streak_active: bool,
    pub display_perfect_streak: u32,
}

pub fn compute_my_day(
    database: &Database,
    config: &MyDayViewConfig,
    prepared: &Prepared<'_>,
    days: DayWindow,
) -> Result<MyDayState> {
    for field_id in [&config.date_field_id, &config.streak_field_id] {
        if database.field(field_id).is_none() {
            return Err(CortexError::InvalidOperation(format!(
                "my_day view field '{field_id}' is missing on '{}'",
                database.name
            )));
        }
    }

    let habits: Vec<HabitState> = prepared
        .records
        .iter()
        .map(|record| {
            let streak = HabitStreak::read(record, config);
            HabitState {
                record: (*record).clone(),
                title: display_name(database, record),
                completed_today: streak.completed_today(days),
                streak,
                streak_active: days.is_active(streak.last_completed),
                display_streak: streak.display_streak(days),
            }
        })
        .collect();

    let completed = habits.iter().filter(|h| h.completed_today).count();
    let pending = habits.len() - completed;
    let perfect = PerfectStreak::from_config(config);
    let perfect_active = days.is_active(perfect.last_day);

    Ok(MyDayState {
        today: days.today,
        pending,
        completed,
        all_done: !habits.is_empty() && pending == 0,
        habits,
        perfect_streak: perfect,
        perfect_streak_active: perfect_active,
        display_perfect_streak: if perfect_active { perfect.count } else { 0 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn window() -> DayWindow {
        DayWindow::new(day(16))
    }

    #[test]
    fn test_complete_continues_from_yesterday() {
        let next = toggle_streak(
            HabitStreak { last_completed: Some(day(15)), streak: 4 },
            window(),
        );
        assert_eq!(next, HabitStreak { last_completed: Some(day(16)), streak: 5 });
    }

    #[test]
    fn test_complete_after_gap_restarts() {
        let next = toggle_streak(
            HabitStreak { last_completed: Some(day(10)), streak: 9 },
            window(),
        );
        assert_eq!(next, HabitStreak { last_completed: Some(day(16)), streak: 1 });

        let first = toggle_streak(HabitStreak { last_completed: None, streak: 0 }, window());
        assert_eq!(first.streak, 1);
    }

    #[test]
    fn test_undo_with_streak_rewinds_to_yesterday() {
        let next = toggle_streak(
            HabitStreak { last_completed: Some(day(16)), streak: 3 },
            window(),
        );
        assert_eq!(next, HabitStreak { last_completed: Some(day(15)), streak: 2 });
    }

    #[test]
    fn test_undo_single_day_clears_date() {
        let next = toggle_streak(
            HabitStreak { last_completed: Some(day(16)), streak: 1 },
            window(),
        );
        assert_eq!(next, HabitStreak { last_completed: None, streak: 0 });

        let zero = toggle_streak(
            HabitStreak { last_completed: Some(day(16)), streak: 0 },
            window(),
        );
        assert_eq!(zero.streak, 0);
    }

    #[test]
    fn test_toggle_twice_restores_continuing_streak() {
        let start = HabitStreak { last_completed: Some(day(15)), streak: 2 };
        let done = toggle_streak(start, window());
        assert_eq!(toggle_streak(done, window()), start);
    }

    #[test]
    fn test_perfect_day_continues_from_yesterday() {
        let next = record_perfect_day(
            PerfectStreak { count: 6, last_day: Some(day(15)) },
            window(),
        );
        assert_eq!(next, PerfectStreak { count: 7, last_day: Some(day(16)) });
    }

    #[test]
    fn test_perfect_day_is_idempotent_today() {
        let current = PerfectStreak { count: 7, last_day: Some(day(16)) };
        assert_eq!(record_perfect_day(current, window()), current);
    }

    #[test]
    fn test_perfect_day_after_gap_restarts() {
        let next = record_perfect_day(PerfectStreak { count: 7, last_day: Some(day(2)) }, window());
        assert_eq!(next, PerfectStreak { count: 1, last_day: Some(day(16)) });
    }

    #[test]
    fn test_stale_streak_displays_broken() {
        let stale = HabitStreak { last_completed: Some(day(12)), streak: 8 };
        assert_eq!(stale.display_streak(window()), 0);
        let live = HabitStreak { last_completed: Some(day(15)), streak: 8 };
        assert_eq!(live.display_streak(window()), 8);
    }
}
