use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Daily clock-time range during which a camera records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

impl WorkWindow {
    pub fn new(start: NaiveTime, stop: NaiveTime) -> Self {
        Self { start, stop }
    }

    /// Both bounds are exclusive. `stop < start` wraps midnight,
    /// `start == stop` records around the clock.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start == self.stop {
            return true;
        }
        if self.stop < self.start {
            return now > self.start || now < self.stop;
        }
        now > self.start && now < self.stop
    }

    pub fn wraps_midnight(&self) -> bool {
        self.stop < self.start
    }

    /// Day on which the window that contains, or just closed at, `now`
    /// opened. For a wrapping window the morning half belongs to the
    /// previous day.
    pub fn opened_on(&self, now: NaiveDateTime) -> NaiveDate {
        if self.wraps_midnight() && now.time() < self.start {
            now.date() - TimeDelta::days(1)
        } else {
            now.date()
        }
    }
}
