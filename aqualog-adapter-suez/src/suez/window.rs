//! Retrieval window
//!
//! Tracks which month of history to fetch next and how many days of backlog
//! remain. The target month is always derived from the clock and the day
//! budget, so the window self-corrects however often it is recomputed.

use chrono::{DateTime, Datelike, Duration, Local};

/// Month-granularity cursor over the history backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalWindow {
    /// Month currently being fetched; None until the first recompute
    target: Option<(i32, u32)>,
    /// Month of the most recent data, fixed at construction
    end_year: i32,
    end_month: u32,
    days_remaining: u32,
    /// Armed when the target reaches the end month; consumed by the first
    /// record of that batch, which updates the live counter instead
    most_recent_batch: bool,
}

impl RetrievalWindow {
    pub fn new(now: DateTime<Local>, history_days: u32) -> Self {
        Self {
            target: None,
            end_year: now.year(),
            end_month: now.month(),
            days_remaining: history_days,
            most_recent_batch: false,
        }
    }

    /// Re-derive the target month from the day budget.
    ///
    /// The target day is `now - days_remaining - 1`. When that lands in the
    /// month already being fetched, one day is consumed and the derivation
    /// repeats, so a batch that yielded no records still makes progress.
    pub fn recompute(&mut self, now: DateTime<Local>) {
        loop {
            let date = now - Duration::days(i64::from(self.days_remaining) + 1);
            let current = (date.year(), date.month());
            let changed = self.target != Some(current);
            if changed {
                self.target = Some(current);
            }
            if current == (self.end_year, self.end_month) {
                self.most_recent_batch = true;
            }
            if changed || self.days_remaining == 0 {
                return;
            }
            self.days_remaining -= 1;
        }
    }

    /// Month to fetch. Falls back to the end month before the first
    /// recompute.
    pub fn target(&self) -> (i32, u32) {
        self.target.unwrap_or((self.end_year, self.end_month))
    }

    pub fn days_remaining(&self) -> u32 {
        self.days_remaining
    }

    /// Account for one ingested day record.
    pub fn consume_day(&mut self) {
        self.days_remaining = self.days_remaining.saturating_sub(1);
    }

    /// Consume the most-recent-batch flag. True at most once per arming.
    pub fn take_live_update(&mut self) -> bool {
        std::mem::take(&mut self.most_recent_batch)
    }

    /// An exhausted budget is bumped back to one so the daily catch-up
    /// still fetches the newest readings.
    pub fn force_minimum_backlog(&mut self) {
        if self.days_remaining == 0 {
            self.days_remaining = 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state(
        target: Option<(i32, u32)>,
        end: (i32, u32),
        days_remaining: u32,
        most_recent_batch: bool,
    ) -> Self {
        Self {
            target,
            end_year: end.0,
            end_month: end.1,
            days_remaining,
            most_recent_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_recompute_adopts_target_without_consuming() {
        let now = at(2024, 3, 15);
        let mut window = RetrievalWindow::new(now, 40);
        window.recompute(now);

        // 41 days before mid-March is early February
        assert_eq!(window.target(), (2024, 2));
        assert_eq!(window.days_remaining(), 40);
        assert!(!window.clone().take_live_update());
    }

    #[test]
    fn test_recompute_skips_forward_on_empty_batch() {
        let now = at(2024, 3, 15);
        let mut window = RetrievalWindow::new(now, 40);
        window.recompute(now);
        assert_eq!(window.target(), (2024, 2));

        // No records arrived; the next recompute walks day by day until the
        // derived month moves on.
        window.recompute(now);
        assert_eq!(window.target(), (2024, 3));
        assert!(window.days_remaining() < 40);
    }

    #[test]
    fn test_most_recent_batch_armed_at_end_month() {
        let now = at(2024, 3, 15);
        let mut window = RetrievalWindow::new(now, 40);
        window.recompute(now);
        assert!(!window.take_live_update());

        // Spend the backlog down to the end month.
        while window.days_remaining() > 0 {
            window.consume_day();
        }
        window.recompute(now);
        assert_eq!(window.target(), (2024, 3));
        assert!(window.take_live_update());
        // consumed, not re-armed until the next recompute
        assert!(!window.take_live_update());
    }

    #[test]
    fn test_recompute_stops_at_zero_budget() {
        let now = at(2024, 3, 15);
        let mut window = RetrievalWindow::with_state(Some((2024, 3)), (2024, 3), 0, false);
        window.recompute(now);
        assert_eq!(window.days_remaining(), 0);
        assert_eq!(window.target(), (2024, 3));
    }

    #[test]
    fn test_force_minimum_backlog() {
        let now = at(2024, 3, 15);
        let mut window = RetrievalWindow::new(now, 30);
        window.force_minimum_backlog();
        assert_eq!(window.days_remaining(), 30);

        let mut spent = RetrievalWindow::with_state(Some((2024, 3)), (2024, 3), 0, false);
        spent.force_minimum_backlog();
        assert_eq!(spent.days_remaining(), 1);
    }
}
