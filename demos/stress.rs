// Stress driver: hammer the engine from many writer threads
//
// Run with: cargo run --example stress -- --threads 8 --print-max 100000
//
// Each writer acquires a channel of random capacity, writes messages at
// random severities as fast as it can, and occasionally stalls to let its
// ring fill up. Per-write latency is sampled around every call so the cost
// of the lock-free path (and of drops under backpressure) is visible.

use anyhow::Result;
use clap::Parser;
use logring::{log_at, Engine, EngineConfig, OverflowPolicy, Severity, SinkKind};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(about = "Concurrent logging stress driver", long_about = None)]
struct Args {
    /// Number of concurrent writer threads per round
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Minimum channel capacity a writer may request
    #[arg(long, default_value_t = 32)]
    lines_min: usize,

    /// Maximum channel capacity a writer may request
    #[arg(long, default_value_t = 256)]
    lines_max: usize,

    /// Total write attempts per writer, split over four rounds
    #[arg(long, default_value_t = 20_000)]
    print_max: usize,

    /// Stall duration in microseconds when a writer draws the short straw
    #[arg(long, default_value_t = 200)]
    wait_us: u64,

    /// One-in-N chance per write of stalling for --wait-us
    #[arg(long, default_value_t = 100)]
    chances: u32,

    /// Seconds to idle after init before the writers start
    #[arg(long, default_value_t = 0)]
    start_wait: u64,
}

struct WriterReport {
    id: usize,
    written: u64,
    dropped: u64,
    lost_total: u64,
    worst_ns: u128,
    total_ns: u128,
}

fn writer(engine: &Engine, args: &Args, id: usize, rounds_share: usize) -> WriterReport {
    let mut rng = rand::thread_rng();
    let capacity = rng.gen_range(args.lines_min..=args.lines_max);

    let mut chan = match engine.acquire_channel(capacity) {
        Ok(chan) => chan,
        Err(e) => {
            eprintln!("W{id:02}! no channel available ({e}), exiting");
            return WriterReport {
                id,
                written: 0,
                dropped: 0,
                lost_total: 0,
                worst_ns: 0,
                total_ns: 0,
            };
        }
    };

    let mut report = WriterReport {
        id,
        written: 0,
        dropped: 0,
        lost_total: 0,
        worst_ns: 0,
        total_ns: 0,
    };

    for seq in 0..rounds_share {
        if rng.gen_range(0..args.chances) == 0 {
            std::thread::sleep(Duration::from_micros(args.wait_us));
        }
        let severity = Severity::from_u8(rng.gen_range(0..logring::SEVERITY_COUNT)).unwrap();

        let index = seq % chan.capacity();
        let before = Instant::now();
        let outcome = log_at!(chan, severity, "W{:02} {} => {}", id, seq, index);
        let elapsed = before.elapsed().as_nanos();

        report.total_ns += elapsed;
        report.worst_ns = report.worst_ns.max(elapsed);
        match outcome {
            Ok(()) => report.written += 1,
            Err(_) => report.dropped += 1,
        }
    }

    report.lost_total = chan.lost_total();
    chan.release();
    report
}

fn main() -> Result<()> {
    let args = Arc::new(Args::parse());
    eprintln!(
        "threads[{}] lines[{}..{}] print_max[{}] (1/{} chance of a {}us stall)",
        args.threads, args.lines_min, args.lines_max, args.print_max, args.chances, args.wait_us
    );

    // Pool sized with 1.5x headroom over the writer count so releases from
    // one round do not starve the next.
    let engine = Arc::new(Engine::new(EngineConfig {
        max_producers: args.threads + args.threads / 2,
        channel_capacity: None,
        overflow: OverflowPolicy::Drop,
        report_loss: true,
        min_severity: Severity::Debug,
        sink: SinkKind::Stderr,
    })?);
    engine.init()?;

    if args.start_wait > 0 {
        eprintln!("waiting {}s before starting writers", args.start_wait);
        std::thread::sleep(Duration::from_secs(args.start_wait));
    }

    // Four rounds of spawn/join, a quarter of the load each, so channel
    // release and reacquisition get exercised under load.
    let rounds_share = args.print_max / 4;
    for round in 0..4 {
        let handles: Vec<_> = (0..args.threads)
            .map(|id| {
                let engine = Arc::clone(&engine);
                let args = Arc::clone(&args);
                std::thread::spawn(move || writer(&engine, &args, id, rounds_share))
            })
            .collect();

        for handle in handles {
            let r = handle.join().expect("writer thread panicked");
            let attempts = r.written + r.dropped;
            let avg_ns = if attempts > 0 {
                r.total_ns / attempts as u128
            } else {
                0
            };
            eprintln!(
                "W{:02}! round {} done: {}/{} written/dropped (lost_total {}), avg {} ns, worst {} ns",
                r.id, round, r.written, r.dropped, r.lost_total, avg_ns, r.worst_ns
            );
        }
    }

    engine.deinit()?;
    Ok(())
}
