use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn wheel(slots: &[usize]) -> Wheel {
    Wheel::new(Duration::from_secs(1), slots).unwrap()
}

fn record(log: &Log, label: &'static str) -> Action {
    let log = Arc::clone(log);
    Action::once(move || log.lock().unwrap().push(label))
}

/// Tick `ticks` times, returning `(tick number, label)` for every firing.
fn run(wheel: &mut Wheel, log: &Log, ticks: u64) -> Vec<(u64, &'static str)> {
    let mut fired = Vec::new();
    for t in 1..=ticks {
        wheel.tick();
        fired.extend(log.lock().unwrap().drain(..).map(|label| (t, label)));
    }
    fired
}

#[test]
fn rejects_zero_slot_level_and_zero_interval() {
    assert!(Wheel::new(Duration::from_secs(1), &[60, 0]).is_err());
    assert!(Wheel::new(Duration::ZERO, &[60]).is_err());
}

#[test]
fn zero_level_wheel_refuses_jobs_and_ticks_quietly() {
    let mut w = wheel(&[]);
    assert!(matches!(w.insert(1, Action::once(|| {})), Err(WheelError::NoLevels)));
    assert_eq!(w.tick(), TickReport::default());
}

#[test]
fn single_level_fires_at_requested_tick() {
    let log = Log::default();
    let mut w = wheel(&[60]);
    w.insert(2, record(&log, "f")).unwrap();
    assert_eq!(run(&mut w, &log, 5), vec![(2, "f")]);
    assert!(w.is_empty());
}

#[test]
fn later_job_fires_two_ticks_after_earlier_one() {
    let log = Log::default();
    let mut w = wheel(&[60]);
    w.insert(3, record(&log, "g")).unwrap();
    w.insert(1, record(&log, "h")).unwrap();
    assert_eq!(run(&mut w, &log, 4), vec![(1, "h"), (3, "g")]);
}

#[test]
fn zero_tick_delay_fires_on_next_tick() {
    let log = Log::default();
    let mut w = wheel(&[8]);
    w.insert(0, record(&log, "now")).unwrap();
    assert_eq!(run(&mut w, &log, 8), vec![(1, "now")]);
}

#[test]
fn same_slot_fires_in_insertion_order() {
    let log = Log::default();
    let mut w = wheel(&[60, 60]);
    w.insert(70, record(&log, "first")).unwrap();
    w.insert(70, record(&log, "second")).unwrap();
    w.insert(70, record(&log, "third")).unwrap();
    assert_eq!(
        run(&mut w, &log, 70),
        vec![(70, "first"), (70, "second"), (70, "third")]
    );
}

#[test]
fn one_minute_cascades_from_second_level() {
    let log = Log::default();
    let mut w = wheel(&[60, 60, 24]);
    w.insert(60, record(&log, "minute")).unwrap();
    assert_eq!(w.levels()[1].len(), 1);
    assert_eq!(run(&mut w, &log, 61), vec![(60, "minute")]);
}

#[test]
fn sixty_seconds_at_fifty_millis_demotes_twice() {
    let log = Log::default();
    let mut w = Wheel::new(Duration::from_millis(50), &[20, 60, 60]).unwrap();
    let ticks = w.scale().ticks_for(Duration::from_secs(60)).unwrap();
    assert_eq!(ticks, 1_200);
    w.insert(ticks, record(&log, "f")).unwrap();
    assert_eq!(w.levels()[2].len(), 1);

    let mut demoted = 0;
    let mut fired_at = None;
    for t in 1..=1_250u64 {
        let report = w.tick();
        demoted += report.demoted;
        if report.fired > 0 {
            fired_at = Some(t);
        }
    }
    assert_eq!(fired_at, Some(1_200));
    assert_eq!(demoted, 2);
}

#[test]
fn placement_after_cursor_moved_keeps_exact_delay() {
    let log = Log::default();
    let mut w = wheel(&[60, 60, 24]);
    // Move the cursors off zero on both lower levels.
    run(&mut w, &log, 3_725);
    assert_eq!(w.cursors(), vec![5, 2, 1]);

    for (delay, label) in [(20u64, "a"), (55, "b"), (60, "c"), (3_600, "d"), (7_199, "e")] {
        w.insert(delay, record(&log, label)).unwrap();
    }
    assert_eq!(
        run(&mut w, &log, 7_200),
        vec![(20, "a"), (55, "b"), (60, "c"), (3_600, "d"), (7_199, "e")]
    );
}

#[test]
fn every_delay_fires_at_its_exact_tick() {
    // Exhaustive over a small wheel from every starting position.
    let horizon = wheel(&[4, 3, 2]).scale().horizon_ticks();
    for offset in 0..horizon {
        for delay in 1..horizon {
            let mut w = wheel(&[4, 3, 2]);
            for _ in 0..offset {
                w.tick();
            }
            w.insert(delay, Action::once(|| {})).unwrap();
            let fired_at = (1..=horizon).find(|_| w.tick().fired > 0);
            assert_eq!(fired_at, Some(delay), "offset {offset}, delay {delay}");
        }
    }
}

#[test]
fn delay_at_horizon_is_rejected() {
    let mut w = wheel(&[60, 60, 24]);
    let err = w.insert(86_400, Action::once(|| {})).unwrap_err();
    assert!(matches!(err, WheelError::DelayOutOfRange { .. }));
    assert!(w.insert(86_399, Action::once(|| {})).is_ok());
}

#[test]
fn repeating_job_fires_every_period() {
    let count = Arc::new(Mutex::new(Vec::new()));
    let mut w = wheel(&[10, 10]);
    let seen = Arc::clone(&count);
    let mut n = 0u32;
    w.insert(
        7,
        Action::every(7, move || {
            n += 1;
            seen.lock().unwrap().push(n);
        }),
    )
    .unwrap();

    let mut fired_at = Vec::new();
    for t in 1..=50u64 {
        if w.tick().fired > 0 {
            fired_at.push(t);
        }
    }
    assert_eq!(fired_at, vec![7, 14, 21, 28, 35, 42, 49]);
    assert_eq!(*count.lock().unwrap(), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(w.len(), 1);
}

#[test]
fn panicking_callback_does_not_poison_the_wheel() {
    let log = Log::default();
    let mut w = wheel(&[10]);
    w.insert(1, Action::once(|| panic!("boom"))).unwrap();
    w.insert(1, record(&log, "after-panic")).unwrap();

    let report = w.tick();
    assert_eq!(report.fired, 2);
    assert_eq!(report.panicked, 1);
    assert_eq!(*log.lock().unwrap(), vec!["after-panic"]);
    assert!(w.is_empty());
}

#[test]
fn task_ids_are_sequential() {
    let mut w = wheel(&[10]);
    let a = w.insert(1, Action::once(|| {})).unwrap();
    let b = w.insert(2, Action::once(|| {})).unwrap();
    assert_eq!(a, TaskId(0));
    assert_eq!(b, TaskId(1));
    assert_eq!(w.len(), 2);
}
