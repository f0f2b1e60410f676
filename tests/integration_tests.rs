//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - Log injection prevention
//! - Queue draining on shutdown
//! - Severity-based sink routing
//! - Structured JSONL output
//! - Thread safety under concurrent producers
//! - Registry-based handler discovery

use log_pipeline::prelude::*;
use std::fs;
use std::sync::Arc;
use std::thread;

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read log file")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_log_injection_prevention() {
    // Newlines in messages must be escaped so a single record cannot
    // masquerade as several log lines.
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();

    let malicious = "User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation";
    handle
        .enqueue(Record::new(Severity::Info, "auth", malicious))
        .expect("Failed to enqueue");
    handle.stop();

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 1, "Record must stay a single line");
    assert!(lines[0].contains("\\n"));

    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["level"], "INFO");
}

#[test]
fn test_stop_drains_every_record_in_order() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("drain_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();

    for i in 0..500 {
        handle
            .enqueue(Record::new(Severity::Info, "etl", format!("Message {}", i)))
            .expect("Failed to enqueue");
    }
    handle.stop();

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 500, "Every record enqueued before stop must land");

    for (i, line) in lines.iter().enumerate() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["message"], format!("Message {}", i));
    }
}

#[test]
fn test_severity_split_across_sinks() {
    // The stdout/stderr split, modeled with two filtered file sinks.
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let routine_file = temp_dir.path().join("routine.jsonl");
    let errors_file = temp_dir.path().join("errors.jsonl");
    let all_file = temp_dir.path().join("all.jsonl");

    let mut handle = Pipeline::builder()
        .sink(
            RotatingFileSink::new(&routine_file)
                .expect("Failed to create sink")
                .with_filter(SinkFilter::BelowError),
        )
        .sink(
            RotatingFileSink::new(&errors_file)
                .expect("Failed to create sink")
                .with_filter(SinkFilter::AtOrAbove(Severity::Error)),
        )
        .sink(RotatingFileSink::new(&all_file).expect("Failed to create sink"))
        .build();
    handle.start();

    for severity in [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ] {
        handle
            .enqueue(Record::new(severity, "etl", severity.to_str()))
            .expect("Failed to enqueue");
    }
    handle.stop();

    let levels = |path: &std::path::Path| -> Vec<String> {
        read_lines(path)
            .iter()
            .map(|line| {
                let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
                parsed["level"].as_str().unwrap().to_string()
            })
            .collect()
    };

    assert_eq!(levels(&routine_file), vec!["DEBUG", "INFO", "WARNING"]);
    assert_eq!(levels(&errors_file), vec!["ERROR", "CRITICAL"]);
    assert_eq!(
        levels(&all_file),
        vec!["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    );
}

#[test]
fn test_structured_fields_and_key_remapping() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("structured_test.jsonl");

    let formatter = JsonFormatter::new().with_key("severity", "levelname");
    let mut handle = Pipeline::builder()
        .sink(
            RotatingFileSink::new(&log_file)
                .expect("Failed to create sink")
                .with_formatter(formatter),
        )
        .build();
    handle.start();

    handle
        .enqueue(
            Record::new(Severity::Warning, "etl.transform", "Suspicious value")
                .with_field("row", 42)
                .with_field("column", "amount"),
        )
        .expect("Failed to enqueue");
    handle.stop();

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 1);

    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["message"], "Suspicious value");
    assert_eq!(parsed["severity"], "WARNING");
    assert!(parsed.get("level").is_none(), "remapped key replaces default");
    assert_eq!(parsed["logger"], "etl.transform");
    assert_eq!(parsed["row"], 42);
    assert_eq!(parsed["column"], "amount");
}

#[test]
fn test_exception_info_in_output() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("exception_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();

    let exception = ExceptionInfo::new("ValueError", "invalid literal for int()");
    handle
        .enqueue(Record::new(Severity::Error, "etl.load", "Row rejected").with_exception(exception))
        .expect("Failed to enqueue");
    handle.stop();

    let lines = read_lines(&log_file);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["exc_info"], "ValueError: invalid literal for int()");
}

#[test]
fn test_missing_log_directory_is_created() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("var").join("log").join("etl").join("app.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();
    handle
        .enqueue(Record::new(Severity::Info, "etl", "first record"))
        .expect("Failed to enqueue");
    handle.stop();

    assert!(log_file.exists());
    assert_eq!(read_lines(&log_file).len(), 1);
}

#[test]
fn test_rotation_keeps_bounded_backups() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("rotate_test.jsonl");

    let policy = RotationPolicy {
        max_bytes: 512,
        backup_count: 2,
    };
    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::with_policy(&log_file, policy).expect("Failed to create sink"))
        .build();
    handle.start();

    for i in 0..200 {
        handle
            .enqueue(Record::new(Severity::Info, "etl", format!("Filler message {}", i)))
            .expect("Failed to enqueue");
    }
    handle.stop();

    assert!(log_file.exists());
    assert!(temp_dir.path().join("rotate_test.jsonl.1").exists());
    assert!(temp_dir.path().join("rotate_test.jsonl.2").exists());
    assert!(!temp_dir.path().join("rotate_test.jsonl.3").exists());
}

#[test]
fn test_registry_discovery_workflow() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("registry_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .install("integration-registry-test");
    handle.start();

    // Unrelated code finds the handler by name alone.
    let handler = HandlerRegistry::lookup("integration-registry-test")
        .expect("installed handler must be discoverable");
    handler
        .enqueue(Record::new(Severity::Info, "worker", "found via registry"))
        .expect("Failed to enqueue");

    handle.stop();

    // Stop does not unregister; the handler is simply closed now.
    let handler = HandlerRegistry::lookup("integration-registry-test")
        .expect("registration survives stop");
    assert!(handler.is_closed());
    assert!(handler
        .enqueue(Record::new(Severity::Info, "worker", "late"))
        .is_err());

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["message"], "found via registry");

    HandlerRegistry::unregister("integration-registry-test");
}

#[test]
fn test_failing_sink_does_not_starve_others() {
    struct FailingSink;

    impl Sink for FailingSink {
        fn write(&mut self, _record: &Record) -> log_pipeline::core::Result<()> {
            Err(PipelineError::other("sink intentionally failing"))
        }

        fn flush(&mut self) -> log_pipeline::core::Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn accepts(&self, _severity: Severity) -> bool {
            true
        }
    }

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("isolation_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(FailingSink)
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();

    for i in 0..10 {
        handle
            .enqueue(Record::new(Severity::Info, "etl", format!("Message {}", i)))
            .expect("Failed to enqueue");
    }
    handle.stop();

    assert_eq!(read_lines(&log_file).len(), 10);
    assert_eq!(handle.metrics().sink_errors(), 10);
    assert_eq!(handle.metrics().dropped(), 0, "healthy sink delivered them");
}

#[test]
fn test_concurrent_producers() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent_test.jsonl");

    let mut handle = Pipeline::builder()
        .sink(RotatingFileSink::new(&log_file).expect("Failed to create sink"))
        .build();
    handle.start();

    let handler = Arc::new(handle.handler());
    let mut threads = Vec::new();
    for t in 0..8 {
        let handler = Arc::clone(&handler);
        threads.push(thread::spawn(move || {
            for i in 0..100 {
                handler
                    .enqueue(Record::new(
                        Severity::Info,
                        format!("worker.{}", t),
                        format!("t{} m{}", t, i),
                    ))
                    .expect("Failed to enqueue");
            }
        }));
    }
    for t in threads {
        t.join().expect("Producer thread panicked");
    }
    handle.stop();

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 800);
    assert_eq!(handle.metrics().enqueued(), 800);
    assert_eq!(handle.metrics().dispatched(), 800);
}

#[test]
fn test_block_policy_delivers_everything() {
    // A slow sink keeps the bounded queue full, so the producer hits the
    // Block path repeatedly; every record must still arrive, in order.
    struct SlowSink {
        captured: std::sync::Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl Sink for SlowSink {
        fn write(&mut self, record: &Record) -> log_pipeline::core::Result<()> {
            thread::sleep(std::time::Duration::from_millis(1));
            self.captured.lock().push(record.message.clone());
            Ok(())
        }

        fn flush(&mut self) -> log_pipeline::core::Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn accepts(&self, _severity: Severity) -> bool {
            true
        }
    }

    let captured = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut handle = Pipeline::builder()
        .sink(SlowSink {
            captured: std::sync::Arc::clone(&captured),
        })
        .bounded(2, OverflowPolicy::Block)
        .build();
    handle.start();

    for i in 0..50 {
        handle
            .enqueue(Record::new(Severity::Info, "etl", format!("m{}", i)))
            .expect("Block policy must accept every record");
    }
    handle.stop();

    let messages = captured.lock();
    assert_eq!(messages.len(), 50, "nothing may be lost under Block");
    for (i, message) in messages.iter().enumerate() {
        assert_eq!(message, &format!("m{}", i));
    }
    assert_eq!(handle.metrics().enqueued(), 50);
    assert_eq!(handle.metrics().dropped(), 0);
    assert!(
        handle.metrics().queue_full_events() > 0,
        "the queue must actually have filled for this test to mean anything"
    );
}

#[test]
fn test_config_driven_pipeline() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("config_test.jsonl");

    let json = format!(
        r#"{{
            "queue": {{ "capacity": 1000, "overflow": "block" }},
            "sinks": [
                {{ "type": "rotating_file", "path": {:?},
                   "max_bytes": 1048576, "backup_count": 2,
                   "key_map": {{ "severity": "levelname" }} }}
            ]
        }}"#,
        log_file
    );

    let config = PipelineConfig::from_json_str(&json).expect("Failed to parse config");
    let mut handle = config
        .apply(Pipeline::builder())
        .expect("Failed to apply config")
        .build();
    handle.start();

    handle
        .enqueue(Record::new(Severity::Error, "etl", "configured"))
        .expect("Failed to enqueue");
    handle.stop();

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["severity"], "ERROR");
    assert_eq!(parsed["message"], "configured");
}
