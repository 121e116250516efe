use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ring_logger::{AlignedPool, Error, Level, LogChannel, LogSink};
use tempfile::tempdir;

fn pipeline(pool_bytes: usize, queue_capacity: usize) -> Arc<LogChannel> {
    let pool = AlignedPool::new(pool_bytes, 64).unwrap();
    Arc::new(LogChannel::new(queue_capacity, pool).unwrap())
}

#[test]
fn test_end_to_end_line_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.log");

    let channel = pipeline(4096, 16);
    let mut sink = LogSink::new(Arc::clone(&channel), &path).unwrap();

    for _ in 0..10 {
        channel.log(Level::Info, "hello").unwrap();
    }
    // Shutdown drains everything already queued before returning.
    sink.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 10, "every queued record must reach the file");

    for line in lines {
        assert!(line.starts_with('['), "line must start with a timestamp field: {line}");
        assert!(line.ends_with("[INFO] hello"), "unexpected line shape: {line}");

        // [<secs.micros>] [<thread-id>] [<LEVEL>] <message>
        let fields: Vec<&str> = line.splitn(4, ' ').collect();
        assert_eq!(fields.len(), 4);
        let ts = fields[0].trim_start_matches('[').trim_end_matches(']');
        assert!(ts.parse::<f64>().is_ok(), "timestamp field must be numeric: {ts}");
        let tid = fields[1].trim_start_matches('[').trim_end_matches(']');
        assert!(tid.parse::<u64>().is_ok(), "thread-id field must be numeric: {tid}");
        assert_eq!(fields[2], "[INFO]");
        assert_eq!(fields[3], "hello");
    }
}

#[test]
fn test_all_levels_render() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("levels.log");

    let channel = pipeline(4096, 16);
    let mut sink = LogSink::new(Arc::clone(&channel), &path).unwrap();
    channel.log(Level::Info, "i").unwrap();
    channel.log(Level::Warning, "w").unwrap();
    channel.log(Level::Error, "e").unwrap();
    sink.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("[INFO] i"));
    assert!(lines[1].contains("[WARNING] w"));
    assert!(lines[2].contains("[ERROR] e"));
}

#[test]
fn test_shutdown_drains_and_returns_promptly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("drain.log");

    let channel = pipeline(8192, 32);
    let mut sink = LogSink::new(Arc::clone(&channel), &path).unwrap();

    for i in 0..10 {
        channel.log(Level::Info, &format!("entry {i}")).unwrap();
    }

    let start = Instant::now();
    sink.shutdown();
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "shutdown must return in bounded time"
    );

    let lines = fs::read_to_string(&path).unwrap().lines().count();
    assert!(lines <= 10, "the file can never hold more than was logged");
}

#[test]
fn test_shutdown_twice_is_a_noop() {
    let dir = tempdir().unwrap();
    let channel = pipeline(4096, 16);
    let mut sink = LogSink::new(Arc::clone(&channel), dir.path().join("twice.log")).unwrap();

    channel.log(Level::Info, "once").unwrap();
    sink.shutdown();
    sink.shutdown();
    drop(sink);
}

#[test]
fn test_drop_shuts_the_sink_down() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dropped.log");

    let channel = pipeline(4096, 16);
    {
        let _sink = LogSink::new(Arc::clone(&channel), &path).unwrap();
        channel.log(Level::Info, "flushed by drop").unwrap();
    }

    let contents = fs::read_to_string(&path).unwrap();
    assert!(
        contents.contains("flushed by drop"),
        "dropping the sink must drain and flush: {contents:?}"
    );
}

#[test]
fn test_unopenable_path_fails_construction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("out.log");

    let channel = pipeline(4096, 16);
    match LogSink::new(channel, &path) {
        Err(Error::SinkOpen { path: reported, .. }) => assert_eq!(reported, path),
        Ok(_) => panic!("opening inside a missing directory must fail"),
        Err(other) => panic!("expected SinkOpen, got {other:?}"),
    }
}

#[test]
fn test_sink_keeps_up_with_a_small_pool() {
    // The pool holds only 8 records; the channel's recycling plus the sink's
    // draining must still move a much larger volume end to end.
    let dir = tempdir().unwrap();
    let path = dir.path().join("recycled.log");

    let channel = pipeline(8 * std::mem::size_of::<ring_logger::LogRecord>(), 8);
    let mut sink = LogSink::new(Arc::clone(&channel), &path).unwrap();

    let mut accepted = 0u64;
    let deadline = Instant::now() + Duration::from_secs(10);
    while accepted < 200 && Instant::now() < deadline {
        match channel.log(Level::Info, "steady") {
            Ok(()) => accepted += 1,
            // Pool or queue momentarily full: give the sink a beat.
            Err(_) => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    sink.shutdown();

    assert_eq!(accepted, 200, "a draining sink must let the pool recycle indefinitely");
    let lines = fs::read_to_string(&path).unwrap().lines().count() as u64;
    assert!(
        lines >= accepted.saturating_sub(channel.dropped()),
        "accepted entries minus racy drops must land"
    );
}
