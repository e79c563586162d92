//! Delay to slot-coordinate decomposition.
//!
//! The wheel's cursors form a mixed-radix counter (finest digit first, each
//! level's slot count is its radix). Placing a job `ticks` ahead means adding
//! `ticks` to that counter: each level's digit is `(cursor + carry) % slots`
//! and the carry into the next level is `(cursor + carry) / slots`. We stop at
//! the first level whose outgoing carry is zero, because every coarser digit
//! is unchanged and the job does not need to wait on it.

use std::time::Duration;

use tickwheel_core::WheelError;

use crate::level::Level;

/// Converts wall-clock delays to tick counts for a wheel of a given shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickScale {
    interval: Duration,
    horizon_ticks: u64,
}

impl TickScale {
    pub fn new(interval: Duration, horizon_ticks: u64) -> Self {
        Self {
            interval,
            horizon_ticks,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Product of all level slot counts.
    pub fn horizon_ticks(&self) -> u64 {
        self.horizon_ticks
    }

    /// Wall-clock span of the whole wheel.
    pub fn horizon(&self) -> Duration {
        self.duration_of(self.horizon_ticks)
    }

    pub fn duration_of(&self, ticks: u64) -> Duration {
        let nanos = self.interval.as_nanos().saturating_mul(ticks as u128);
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Whole ticks in `delay`, rounded down, but never less than one tick.
    ///
    /// Delays of a full horizon or more are rejected instead of wrapping.
    pub fn ticks_for(&self, delay: Duration) -> Result<u64, WheelError> {
        let raw = delay.as_nanos() / self.interval.as_nanos().max(1);
        let ticks = raw.max(1);
        if ticks >= self.horizon_ticks as u128 {
            return Err(WheelError::DelayOutOfRange {
                delay,
                horizon: self.horizon(),
            });
        }
        Ok(ticks as u64)
    }
}

/// Compute the slot index at each level the job has to visit, finest first.
///
/// Always returns at least one index. If the carry is still non-zero past the
/// coarsest level the result wraps; callers bound `ticks` by the wheel horizon.
pub fn coordinates(levels: &[Level], ticks: u64) -> Vec<usize> {
    let mut coords = Vec::with_capacity(levels.len());
    let mut carry = ticks;
    for level in levels {
        let slots = level.slot_count() as u64;
        let acc = level.cursor() as u64 + carry;
        coords.push((acc % slots) as usize);
        carry = acc / slots;
        if carry == 0 {
            break;
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(slots: &[usize]) -> Vec<Level> {
        let last = slots.len().saturating_sub(1);
        slots
            .iter()
            .enumerate()
            .map(|(i, &n)| Level::new(i, n, last))
            .collect()
    }

    #[test]
    fn short_delay_stays_on_finest_level() {
        let lv = levels(&[60, 60, 24]);
        assert_eq!(coordinates(&lv, 2), vec![2]);
        assert_eq!(coordinates(&lv, 59), vec![59]);
    }

    #[test]
    fn zero_ticks_still_yields_one_coordinate() {
        let lv = levels(&[60, 60, 24]);
        assert_eq!(coordinates(&lv, 0), vec![0]);
    }

    #[test]
    fn one_minute_on_second_wheel_reaches_second_level() {
        let lv = levels(&[60, 60, 24]);
        assert_eq!(coordinates(&lv, 60), vec![0, 1]);
        assert_eq!(coordinates(&lv, 61), vec![1, 1]);
        assert_eq!(coordinates(&lv, 3_661), vec![1, 1, 1]);
    }

    #[test]
    fn sixty_seconds_at_fifty_millis() {
        // 1200 ticks over [20, 60, 60] = 0 + 0*20 + 1*1200
        let lv = levels(&[20, 60, 60]);
        assert_eq!(coordinates(&lv, 1_200), vec![0, 0, 1]);
    }

    #[test]
    fn cursor_offset_carries_into_coarser_level() {
        let mut lv = levels(&[60, 60]);
        for _ in 0..50 {
            lv[0].advance();
        }
        // 50 + 20 = 70: slot 10 on the finest level, one carry into the next
        assert_eq!(coordinates(&lv, 20), vec![10, 1]);
        // 50 + 5 stays within the finest rotation
        assert_eq!(coordinates(&lv, 5), vec![55]);
    }

    #[test]
    fn ticks_for_rounds_down_with_one_tick_floor() {
        let scale = TickScale::new(Duration::from_millis(50), 20 * 60 * 60);
        assert_eq!(scale.ticks_for(Duration::from_millis(120)).unwrap(), 2);
        assert_eq!(scale.ticks_for(Duration::from_millis(10)).unwrap(), 1);
        assert_eq!(scale.ticks_for(Duration::ZERO).unwrap(), 1);
        assert_eq!(scale.ticks_for(Duration::from_secs(60)).unwrap(), 1_200);
    }

    #[test]
    fn ticks_for_rejects_horizon_and_beyond() {
        let scale = TickScale::new(Duration::from_secs(1), 86_400);
        assert_eq!(scale.horizon(), Duration::from_secs(86_400));
        assert_eq!(
            scale.ticks_for(Duration::from_secs(86_399)).unwrap(),
            86_399
        );
        let err = scale.ticks_for(Duration::from_secs(86_400)).unwrap_err();
        assert!(matches!(
            err,
            WheelError::DelayOutOfRange { horizon, .. } if horizon == Duration::from_secs(86_400)
        ));
    }

    #[test]
    fn horizon_sized_delay_wraps_on_coarsest_level() {
        let lv = levels(&[4, 4]);
        // 16 ticks is one full horizon: every digit lands back on its cursor
        assert_eq!(coordinates(&lv, 16), vec![0, 0]);
    }
}
