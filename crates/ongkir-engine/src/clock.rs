//! Wall-clock access for time-dependent rules.

use chrono::{Local, NaiveDateTime, Timelike};

/// Source of the store's local time. A plain function pointer so fixed clocks
/// can be swapped in for tests and replays.
pub type Clock = fn() -> NaiveDateTime;

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Hour of day (0-23) on the given clock.
pub fn hour_of(clock: Clock) -> i32 {
    clock().hour() as i32
}
