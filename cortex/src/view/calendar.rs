use chrono::{Local, NaiveDate};
use serde::Serialize;

/// The two days every streak rule compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub today: NaiveDate,
    pub yesterday: NaiveDate,
}

impl DayWindow {
    pub fn new(today: NaiveDate) -> Self {
        DayWindow {
            today,
            yesterday: today.pred_opt().unwrap_or(today),
        }
    }

    /// The window for the local calendar day.
    pub fn current() -> Self {
        DayWindow::new(Local::now().date_naive())
    }

    pub fn is_today(&self, day: Option<NaiveDate>) -> bool {
        day == Some(self.today)
    }

    pub fn is_yesterday(&self, day: Option<NaiveDate>) -> bool {
        day == Some(self.yesterday)
    }

    /// A streak whose last day is older than yesterday is broken for display.
    pub fn is_active(&self, last_day: Option<NaiveDate>) -> bool {
        self.is_today(last_day) || self.is_yesterday(last_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_crosses_month_boundary() {
        let days = DayWindow::new(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(days.yesterday, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_is_active() {
        let days = DayWindow::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert!(days.is_active(Some(days.today)));
        assert!(days.is_active(Some(days.yesterday)));
        assert!(!days.is_active(NaiveDate::from_ymd_opt(2026, 10, 14)));
        assert!(!days.is_active(None));
    }
}
