use std::sync::Arc;
use std::thread;

use ring_logger::{AlignedPool, Level, LogChannel, LogSink};

/// Small demonstration: a few producer threads race through one channel while
/// the sink drains to `ring_logger_demo.log`.
fn main() -> Result<(), ring_logger::Error> {
    let pool = AlignedPool::new(1024 * 1024, 64)?;
    let channel = Arc::new(LogChannel::new(1024, pool)?);
    let mut sink = LogSink::new(Arc::clone(&channel), "ring_logger_demo.log")?;

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for i in 0..1000 {
                    let _ = channel.log(Level::Info, &format!("worker {worker} event {i}"));
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }

    sink.shutdown();
    println!(
        "wrote ring_logger_demo.log ({} entries dropped)",
        channel.dropped()
    );
    Ok(())
}
