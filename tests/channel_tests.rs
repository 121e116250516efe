use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::thread;

use ring_logger::{AlignedPool, Error, Level, LogChannel, LogRecord};

fn record_size() -> usize {
    mem::size_of::<LogRecord>()
}

#[test]
fn test_single_record_roundtrip() {
    let pool = AlignedPool::new(4096, 64).unwrap();
    let channel = LogChannel::new(16, pool).unwrap();

    channel.log(Level::Warning, "look out").unwrap();

    let record = channel.consume().expect("one record should be queued");
    assert_eq!(record.level(), Level::Warning);
    assert_eq!(record.message(), "look out");
    assert!(channel.consume().is_none(), "queue should be drained");
    assert_eq!(channel.dropped(), 0);
}

#[test]
fn test_misaligned_pool_is_rejected() {
    let pool = AlignedPool::new(4096, 16).unwrap();
    match LogChannel::new(16, pool) {
        Err(Error::MisalignedPool { required, actual }) => {
            assert_eq!(required, 64);
            assert_eq!(actual, 16);
        }
        _ => panic!("a 16-byte-aligned pool cannot hold cache-line records"),
    }
}

#[test]
fn test_concurrent_producers_all_observed_in_thread_order() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 250;

    let pool = AlignedPool::new(THREADS * PER_THREAD * record_size(), 64).unwrap();
    let channel = Arc::new(LogChannel::new(2048, pool).unwrap());

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for seq in 0..PER_THREAD {
                    channel.log(Level::Info, &format!("seq {seq}")).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut per_thread: HashMap<u64, Vec<usize>> = HashMap::new();
    while let Some(record) = channel.consume() {
        let seq = record
            .message()
            .strip_prefix("seq ")
            .and_then(|s| s.parse().ok())
            .expect("well-formed message");
        per_thread.entry(record.thread_id()).or_default().push(seq);
    }

    assert_eq!(channel.dropped(), 0, "capacity was sized for zero drops");
    assert_eq!(per_thread.len(), THREADS);
    let expected: Vec<usize> = (0..PER_THREAD).collect();
    for (thread_id, seqs) in per_thread {
        assert_eq!(
            seqs, expected,
            "thread {thread_id} records must arrive in its call order"
        );
    }
}

#[test]
fn test_full_queue_drops_are_reported() {
    let pool = AlignedPool::new(4096, 64).unwrap();
    let channel = LogChannel::new(1, pool).unwrap();

    let mut failures = 0;
    for _ in 0..5 {
        if channel.log(Level::Info, "burst").is_err() {
            failures += 1;
        }
    }

    assert!(failures >= 3, "a capacity-1 queue must reject most of a burst");
    assert!(channel.dropped() >= 3, "drops must be counted, not silently succeed");

    let mut observed = 0;
    while channel.consume().is_some() {
        observed += 1;
    }
    assert!(observed <= 1, "at most one record can have been in flight");
}

#[test]
fn test_rejected_entries_roll_back_their_pool_space() {
    let pool = AlignedPool::new(4096, 64).unwrap();
    let channel = LogChannel::new(1, pool).unwrap();

    for _ in 0..5 {
        let _ = channel.log(Level::Info, "rejected");
    }

    // Every enqueue failed (capacity 1 holds nothing), so every allocation
    // must have been rolled back.
    assert_eq!(
        channel.pool().used(),
        0,
        "queue-full drops must not leak pool space"
    );
}

#[test]
fn test_draining_reopens_a_full_queue() {
    let pool = AlignedPool::new(4096, 64).unwrap();
    let channel = LogChannel::new(4, pool).unwrap();

    for i in 0..3 {
        channel.log(Level::Info, &format!("{i}")).unwrap();
    }
    assert!(matches!(channel.log(Level::Info, "3"), Err(Error::QueueFull)));

    assert_eq!(channel.consume().unwrap().message(), "0");
    channel.log(Level::Info, "3").unwrap();

    let rest: Vec<String> = std::iter::from_fn(|| channel.consume())
        .map(|r| r.message().to_string())
        .collect();
    assert_eq!(rest, ["1", "2", "3"]);
}

#[test]
fn test_recycles_pool_once_fully_drained() {
    // Room for exactly one record: the second log can only succeed if the
    // channel recycles the drained pool.
    let pool = AlignedPool::new(record_size(), 64).unwrap();
    let channel = LogChannel::new(4, pool).unwrap();
    let initial_generation = channel.pool().generation();

    channel.log(Level::Info, "first").unwrap();
    assert_eq!(channel.consume().unwrap().message(), "first");

    channel.log(Level::Info, "second").unwrap();
    assert!(
        channel.pool().generation() > initial_generation,
        "exhaustion with a drained queue must recycle the pool"
    );
    assert_eq!(channel.consume().unwrap().message(), "second");
}

#[test]
fn test_exhaustion_with_undrained_queue_is_an_error() {
    let pool = AlignedPool::new(record_size(), 64).unwrap();
    let channel = LogChannel::new(4, pool).unwrap();

    channel.log(Level::Info, "held").unwrap();
    match channel.log(Level::Info, "no room") {
        Err(Error::PoolExhausted { .. }) => {}
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
    assert_eq!(channel.dropped(), 1);

    // The queued record is untouched by the failure.
    assert_eq!(channel.consume().unwrap().message(), "held");
}

#[test]
fn test_long_messages_truncate_through_the_pipeline() {
    let pool = AlignedPool::new(4096, 64).unwrap();
    let channel = LogChannel::new(16, pool).unwrap();

    let long = "m".repeat(300);
    channel.log(Level::Error, &long).unwrap();

    let record = channel.consume().unwrap();
    assert_eq!(record.message().len(), 255);
}
