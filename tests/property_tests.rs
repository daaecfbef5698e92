//! Property-based tests for resampling and return invariants
//!
//! Invariants:
//! 1. Batched and per-series log returns agree for positive prices
//! 2. scaled_volume sums to one whenever some volume was traded
//! 3. Forward-filled close has no gaps after the first non-empty bar
//! 4. Transaction-count resampling allocates every event exactly once

mod common;

use common::{minute_bars, t};
use proptest::prelude::*;
use stylized_facts::context::RunContext;
use stylized_facts::data::resample::{CalendarResampler, Resampler, TransactionCountResampler};
use stylized_facts::prelude::*;
use stylized_facts::stats::BatchHomogeneityChecker;

fn closes_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (2usize..6, 2usize..80).prop_flat_map(|(series, len)| {
        prop::collection::vec(prop::collection::vec(0.01f64..1_000.0, len), series)
    })
}

proptest! {
    #[test]
    fn batched_returns_match_per_series(closes in closes_strategy()) {
        let sequences: Vec<BarSequence> = closes.iter().map(|c| minute_bars(c)).collect();
        prop_assert!(BatchHomogeneityChecker::is_stacking_possible(&sequences, Column::Close));

        let computer = ReturnComputer::default();
        let batched = computer.batch_returns(&sequences, Column::Close).unwrap();
        prop_assert_eq!(batched.dim(), (closes.len(), closes[0].len() - 1));

        for (row, sequence) in sequences.iter().enumerate() {
            let single = computer.sequence_returns(sequence, Column::Close).unwrap();
            for (a, b) in batched.row(row).iter().zip(single.row(0).iter()) {
                prop_assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0));
            }
        }
    }

    #[test]
    fn scaled_volume_sums_to_one(
        volumes in prop::collection::vec(0.0f64..1e6, 1..200),
    ) {
        prop_assume!(volumes.iter().sum::<f64>() > 0.0);
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let time = t(9, 0, 0) + chrono::Duration::seconds(i as i64);
                Bar::new(time, 1.0, 1.0, 1.0, 1.0, v, 1)
            })
            .collect();
        let derived = SessionPartitioner::new(None).derive(BarSequence::new(bars)).unwrap();
        let total: f64 = derived.derived(DerivedColumn::ScaledVolume).unwrap().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn forward_fill_leaves_no_gaps(
        offsets in prop::collection::btree_set(0u32..3_600, 1..150),
        price in 1.0f64..500.0,
    ) {
        let events: Vec<Event> = offsets
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let time = t(9, 0, 0) + chrono::Duration::seconds(s as i64);
                Event::timed(time, price + i as f64 * 0.01, 1.0)
            })
            .collect();
        let resampled = CalendarResampler::new(ResampleRule::Minute)
            .resample(&events, &mut RunContext::default())
            .unwrap();
        let bars = resampled.bars.bars();
        let first = bars.iter().position(|b| !b.is_empty());
        prop_assert_eq!(first, Some(0));
        prop_assert!(bars.iter().all(|b| b.close.is_some()));
        let total: u64 = bars.iter().map(|b| b.num_events).sum();
        prop_assert_eq!(total as usize, events.len());
    }

    #[test]
    fn transaction_count_allocation_is_exhaustive(
        steps in prop::collection::vec(0.0f64..1.0, 1..60),
        n1 in 0usize..500,
        n2 in 0usize..500,
        seed in any::<u64>(),
    ) {
        let mut cumulative: Vec<f64> = steps
            .iter()
            .scan(0.0, |acc, s| {
                *acc += s;
                Some(*acc)
            })
            .collect();
        let total = cumulative.last().copied().unwrap_or(0.0);
        prop_assume!(total > 0.0);
        for p in cumulative.iter_mut() {
            *p = (*p / total).min(1.0);
        }
        let len = cumulative.len();
        let curves = |start: TimeOfDay| {
            let index = (0..len)
                .map(|i| start + chrono::Duration::minutes(i as i64))
                .collect();
            ReferenceCurves::new(index, vec![("run".to_string(), cumulative.clone())]).unwrap()
        };
        let resampler = TransactionCountResampler::new(curves(t(9, 0, 0)), curves(t(12, 30, 0)));

        let events: Vec<Event> = (0..n1 + n2)
            .map(|i| {
                let session = if i < n1 { SessionId::Session1 } else { SessionId::Session2 };
                Event::in_session(session, 100.0 + i as f64, 1.0)
            })
            .collect();
        let resampled = resampler.resample(&events, &mut RunContext::new(seed)).unwrap();
        let bars = resampled.bars.bars();

        prop_assert_eq!(bars.len(), 2 * len);
        let session1: u64 = bars[..len].iter().map(|b| b.num_events).sum();
        let session2: u64 = bars[len..].iter().map(|b| b.num_events).sum();
        prop_assert_eq!(session1 as usize, n1);
        prop_assert_eq!(session2 as usize, n2);
    }
}
