//! Stress tests for line integrity under load
//!
//! These tests verify:
//! - Concurrent writers never interleave partial lines in a shared file
//! - Every published notification produces exactly one line
//! - Request scopes survive heavy thread interleaving

use serde_json::Value;
use stasher::notifications::{InMemoryBus, Notification, RequestPayload, SqlPayload};
use stasher::sinks::{FileSink, MemorySink};
use stasher::{setup, Config, CurrentScope, Pipeline};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 250;

/// Lines from many threads land whole in the file, one per event
#[test]
fn test_concurrent_file_writes_stay_line_atomic() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("stress.log");

    let pipeline = Arc::new(
        Pipeline::builder()
            .source("source")
            .sink(FileSink::new(&log_file).expect("Failed to open log file"))
            .build()
            .expect("Failed to build pipeline"),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    pipeline
                        .warn(format!("thread {} message {} {}", t, i, "x".repeat(i % 64)))
                        .expect("write succeeds");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer panicked");
    }
    pipeline.flush().expect("Failed to flush");

    let content = std::fs::read_to_string(&log_file).expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);

    for line in lines {
        let value: Value = serde_json::from_str(line).expect("every line is complete JSON");
        assert!(value["@message"].as_str().is_some());
    }
}

/// Publishing through the bus from many threads loses and duplicates nothing
#[test]
fn test_concurrent_bus_publishing() {
    let bus = Arc::new(InMemoryBus::new());
    let sink = MemorySink::new();
    let config = Config {
        source: Some("source".to_string()),
        ..Default::default()
    };
    setup(&config, Pipeline::builder().sink(sink.clone()), &*bus).expect("setup succeeds");

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    bus.publish(&Notification::Sql(SqlPayload {
                        name: format!("Worker{} Load", t),
                        sql: format!("SELECT {}", i),
                        duration: Duration::from_micros(i as u64),
                    }))
                    .expect("publish succeeds");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("publisher panicked");
    }

    let mut per_worker: HashMap<String, usize> = HashMap::new();
    for line in sink.lines() {
        let value: Value = serde_json::from_str(&line).unwrap();
        let name = value["@fields"]["name"].as_str().unwrap().to_string();
        *per_worker.entry(name).or_default() += 1;
    }

    assert_eq!(per_worker.len(), THREADS);
    assert!(per_worker.values().all(|count| *count == PER_THREAD));
}

/// Rapid request units on each thread never leak fields into the next one
#[test]
fn test_rapid_request_units() {
    let sink = MemorySink::new();
    let pipeline = Arc::new(
        Pipeline::builder()
            .source("source")
            .sink(sink.clone())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let payload = RequestPayload {
                        request_id: Some(format!("{}-{}", t, i)),
                        ..Default::default()
                    };
                    pipeline.process_request(&payload, || {
                        if i % 2 == 0 {
                            CurrentScope::set("even", true);
                        }
                        pipeline
                            .process_action(&payload, Duration::ZERO)
                            .expect("write succeeds");
                    });
                    assert!(CurrentScope::fields().is_empty());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let lines = sink.lines();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    for line in lines {
        let value: Value = serde_json::from_str(&line).unwrap();
        let uuid = value["@fields"]["uuid"].as_str().unwrap();
        let i: usize = uuid.rsplit('-').next().unwrap().parse().unwrap();
        assert_eq!(value["@fields"].get("even").is_some(), i % 2 == 0, "line {}", uuid);
    }
}
