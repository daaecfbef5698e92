//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::NaiveTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stylized_facts::prelude::*;

pub fn t(h: u32, m: u32, s: u32) -> TimeOfDay {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

pub fn boundary() -> SessionBoundary {
    SessionBoundary::new(t(11, 30, 0), t(12, 30, 0)).unwrap()
}

/// One trading day of ticks, 09:00-11:30 and 12:30-15:00, a few per minute
pub fn trading_day_ticks(seed: u64) -> Vec<Event> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    let mut events = Vec::new();

    for (start, end) in [(9 * 60, 11 * 60 + 30), (12 * 60 + 30, 15 * 60)] {
        for minute in start..=end {
            let ticks = rng.gen_range(1..=4);
            for k in 0..ticks {
                let shock: f64 = rng.gen_range(-1.0..1.0);
                price *= (0.002 * shock * shock * shock.signum()).exp();
                let time = NaiveTime::from_num_seconds_from_midnight_opt(
                    minute * 60 + 10 * k,
                    0,
                )
                .unwrap();
                events.push(Event::timed(time, price, rng.gen_range(1.0..50.0)));
            }
        }
    }
    events
}

/// Bar sequence with the given closes, one bar per minute from 09:00
pub fn minute_bars(closes: &[f64]) -> BarSequence {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let time = NaiveTime::from_num_seconds_from_midnight_opt(9 * 3600 + 60 * i as u32, 0)
                .unwrap();
            Bar::new(time, c, c, c, c, 10.0 + (i % 7) as f64, 1 + (i % 5) as u64)
        })
        .collect();
    BarSequence::new(bars)
}

/// Geometric random walk of the given length
pub fn random_walk(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    (0..len)
        .map(|_| {
            let step: f64 = rng.gen_range(-0.01..0.01);
            price *= step.exp();
            price
        })
        .collect()
}

/// Evenly spaced reference curves of `len` bars starting at `start`
pub fn linear_curves(start: TimeOfDay, len: usize) -> ReferenceCurves {
    let index: Vec<TimeOfDay> = (0..len)
        .map(|i| start + chrono::Duration::minutes(i as i64))
        .collect();
    let linear: Vec<f64> = (1..=len).map(|i| i as f64 / len as f64).collect();
    let front_loaded: Vec<f64> = (1..=len)
        .map(|i| (i as f64 / len as f64).sqrt())
        .collect();
    ReferenceCurves::new(
        index,
        vec![
            ("linear".to_string(), linear),
            ("front_loaded".to_string(), front_loaded),
        ],
    )
    .unwrap()
}
