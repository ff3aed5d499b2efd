// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_advances_with_real_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 >= t1);
}

#[test]
fn fake_clock_only_advances_when_told() {
    let clock = FakeClock::default();
    let t1 = clock.now();
    let t2 = clock.now();
    assert_eq!(t1, t2);
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now(), t1 + Duration::from_secs(5));
}

#[test]
fn fake_clock_shared_across_clones() {
    let clock = FakeClock::default();
    let clone = clock.clone();
    clock.advance(Duration::from_secs(1));
    assert_eq!(clone.now(), clock.now());
}
