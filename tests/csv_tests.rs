//! Table ingestion and report output through the filesystem

mod common;

use common::*;
use std::fs::File;
use std::io::BufReader;
use stylized_facts::data::csv_io::{
    read_ohlcv, read_reference_curves, read_ticks, write_ohlcv, write_reference_curves, TickFormat,
};
use stylized_facts::prelude::*;
use tempfile::tempdir;

#[test]
fn test_ohlcv_file_keeps_derived_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("day1.csv");

    let partitioner = SessionPartitioner::new(Some(boundary()));
    let sequence = partitioner.derive(minute_bars(&random_walk(30, 4))).unwrap();
    write_ohlcv(&sequence, File::create(&path).unwrap()).unwrap();

    let restored = read_ohlcv(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(restored.len(), 30);
    assert_eq!(restored.derived_columns().count(), 6);
    assert_eq!(restored.times(), sequence.times());

    // derivation is a no-op on a table that already carries every column
    let again = partitioner.derive(restored.clone()).unwrap();
    assert_eq!(again, restored);
}

#[test]
fn test_uppercase_headers_are_normalized() {
    let data = "Time,Open,HIGH,Low,Close,Volume,Num_Events\n\
                09:00:00,100,101,99,100.5,20,3\n\
                09:01:00,,,,,0,0\n\
                09:02:00,100.5,102,100,101,15,2\n";
    let sequence = read_ohlcv(data.as_bytes()).unwrap();
    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.missing_count(Column::Close), Some(1));
    assert!(sequence.bars()[1].is_empty());
}

#[test]
fn test_synthetic_ticks_and_curves_from_files() {
    let dir = tempdir().unwrap();
    let ticks_path = dir.path().join("sim.csv");
    let mut ticks = String::from("index,event_price (avg),event_volume,session_id\n");
    for i in 0..40 {
        let session = if i < 25 { 1 } else { 2 };
        ticks.push_str(&format!("{},{},{},{}\n", i, 100.0 + i as f64 * 0.1, 2.0, session));
    }
    std::fs::write(&ticks_path, ticks).unwrap();

    let curves_path = dir.path().join("curves.csv");
    write_reference_curves(
        &linear_curves(t(9, 0, 0), 5),
        File::create(&curves_path).unwrap(),
    )
    .unwrap();
    let curves = read_reference_curves(File::open(&curves_path).unwrap()).unwrap();
    assert_eq!(curves.names().collect::<Vec<_>>(), vec!["linear", "front_loaded"]);
    assert_eq!(curves.index().len(), 5);

    let events = read_ticks(
        File::open(&ticks_path).unwrap(),
        &TickFormat::synthetic(),
        MarketMode::Synthetic,
    )
    .unwrap();
    assert_eq!(events.len(), 40);
    assert_eq!(events[30].session, Some(SessionId::Session2));
}

#[test]
fn test_report_written_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.csv");

    let config = CheckerConfig {
        lags: vec![1, 2],
        ..CheckerConfig::default()
    };
    let mut checker = StylizedFactsChecker::new(config).unwrap();
    checker.add_sequence("a", minute_bars(&random_walk(200, 1))).unwrap();
    checker.add_sequence("b", minute_bars(&random_walk(200, 2))).unwrap();
    let report = checker.check_stylized_facts().unwrap();
    report.write_csv(File::create(&path).unwrap()).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers[0], "series");
    assert_eq!(headers.last().unwrap(), "acorr lag2");
    assert_eq!(rdr.records().count(), 2);
}

#[test]
fn test_cumulative_transactions_skip_blank_derived_cells() {
    let data = "time,open,high,low,close,volume,num_events,scaled_num_events\n\
                09:00:00,100,101,99,100.5,20,3,0.5\n\
                09:01:00,100.5,101,100,100.8,0,0,\n\
                09:02:00,100.8,102,100,101,15,3,0.5\n";
    let mut checker = StylizedFactsChecker::new(CheckerConfig::default()).unwrap();
    for name in ["a", "b"] {
        checker
            .add_sequence(name, read_ohlcv(data.as_bytes()).unwrap())
            .unwrap();
    }

    let cumulative = checker.mean_cumulative_transactions(None).unwrap();
    assert_eq!(cumulative.index, vec![t(9, 0, 0), t(9, 2, 0)]);
    assert_eq!(cumulative.series[0].1, vec![0.5, 1.0]);
    assert_eq!(cumulative.mean, vec![0.5, 1.0]);
}
