// Drain loop: the single consumer that fans in all channels and renders
// their lines to a sink

use crate::engine::EngineShared;
use crate::line::{monotonic_nanos, LogLine};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Output sink for rendered lines.
pub trait LogSink: Send {
    /// Render one log line.
    fn write_line(&mut self, line: &LogLine);

    /// Render a loss notification: `lost` lines were discarded on the
    /// channel owned by `producer_id` since the last notification.
    fn write_loss(&mut self, producer_id: u32, lost: u64);

    /// Flush any buffered output
    fn flush(&mut self);
}

fn split_ns(timestamp_ns: u64) -> (u64, u64) {
    (timestamp_ns / 1_000_000_000, (timestamp_ns % 1_000_000_000) / 1_000)
}

/// Standard error sink (human-readable lines)
pub struct StderrSink {
    stderr: std::io::Stderr,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            stderr: std::io::stderr(),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StderrSink {
    fn write_line(&mut self, line: &LogLine) {
        let (secs, micros) = split_ns(line.timestamp_ns);
        let _ = writeln!(
            self.stderr,
            "[{secs:>6}.{micros:06}] [{:<9}] [p{:02}] {}",
            line.severity.as_str(),
            line.producer_id,
            line.text()
        );
    }

    fn write_loss(&mut self, producer_id: u32, lost: u64) {
        let (secs, micros) = split_ns(monotonic_nanos());
        let _ = writeln!(
            self.stderr,
            "[{secs:>6}.{micros:06}] [LOST     ] [p{producer_id:02}] {lost} lines dropped since last report"
        );
    }

    fn flush(&mut self) {
        let _ = self.stderr.flush();
    }
}

/// Standard output sink (human-readable lines)
pub struct StdoutSink {
    stdout: std::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn write_line(&mut self, line: &LogLine) {
        let (secs, micros) = split_ns(line.timestamp_ns);
        let _ = writeln!(
            self.stdout,
            "[{secs:>6}.{micros:06}] [{:<9}] [p{:02}] {}",
            line.severity.as_str(),
            line.producer_id,
            line.text()
        );
    }

    fn write_loss(&mut self, producer_id: u32, lost: u64) {
        let (secs, micros) = split_ns(monotonic_nanos());
        let _ = writeln!(
            self.stdout,
            "[{secs:>6}.{micros:06}] [LOST     ] [p{producer_id:02}] {lost} lines dropped since last report"
        );
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// One JSON object per line on standard error. Wall-clock time is attached
/// at render time; the monotonic write timestamp rides along unchanged.
pub struct JsonLinesSink {
    stderr: std::io::Stderr,
}

impl JsonLinesSink {
    pub fn new() -> Self {
        Self {
            stderr: std::io::stderr(),
        }
    }
}

impl Default for JsonLinesSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for JsonLinesSink {
    fn write_line(&mut self, line: &LogLine) {
        let record = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "mono_ns": line.timestamp_ns,
            "severity": line.severity.as_str(),
            "producer": line.producer_id,
            "thread": line.thread_id,
            "seq": line.seq,
            "msg": line.text(),
        });
        let _ = writeln!(self.stderr, "{record}");
    }

    fn write_loss(&mut self, producer_id: u32, lost: u64) {
        let record = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": "lost",
            "producer": producer_id,
            "count": lost,
        });
        let _ = writeln!(self.stderr, "{record}");
    }

    fn flush(&mut self) {
        let _ = self.stderr.flush();
    }
}

pub(crate) fn sink_for(kind: crate::config::SinkKind) -> Box<dyn LogSink> {
    match kind {
        crate::config::SinkKind::Stderr => Box::new(StderrSink::new()),
        crate::config::SinkKind::Stdout => Box::new(StdoutSink::new()),
        crate::config::SinkKind::JsonStderr => Box::new(JsonLinesSink::new()),
    }
}

/// Sleep between scans that found nothing, trading a small bound on flush
/// latency for near-zero idle CPU.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Default)]
struct LossBaseline {
    epoch: u64,
    lost: u64,
}

/// The single background consumer. Owns the sink for its lifetime and hands
/// it back when stopped, so the engine can restart later with the same sink.
pub(crate) struct DrainLoop {
    shared: Arc<EngineShared>,
    sink: Box<dyn LogSink>,
    baselines: Vec<LossBaseline>,
}

impl DrainLoop {
    pub(crate) fn new(shared: Arc<EngineShared>, sink: Box<dyn LogSink>) -> Self {
        let baselines = vec![LossBaseline::default(); shared.pool.slot_count()];
        Self {
            shared,
            sink,
            baselines,
        }
    }

    /// Run until the engine clears its running flag, then make one final
    /// full pass so every line written before the stop signal is rendered.
    pub(crate) fn run(mut self) -> Box<dyn LogSink> {
        while self.shared.running.load(Ordering::Acquire) {
            if self.scan() == 0 {
                std::thread::sleep(IDLE_SLEEP);
            } else {
                self.sink.flush();
            }
        }

        self.scan();
        self.sink.flush();
        self.sink
    }

    /// Visit every slot in index order, draining available lines and
    /// reporting loss deltas. Returns the number of rendered lines.
    fn scan(&mut self) -> usize {
        let mut rendered = 0;

        for idx in 0..self.shared.pool.slot_count() {
            let Some(channel) = self.shared.pool.channel_at(idx) else {
                continue;
            };

            // A rearmed slot is a different channel; restart its baseline.
            let epoch = self.shared.pool.epoch_at(idx);
            if self.baselines[idx].epoch != epoch {
                self.baselines[idx] = LossBaseline { epoch, lost: 0 };
            }

            for line in channel.drain_available() {
                self.sink.write_line(&line);
                rendered += 1;
            }

            if self.shared.report_loss {
                let lost = channel.lost_total();
                if lost > self.baselines[idx].lost {
                    self.sink
                        .write_loss(channel.producer_id(), lost - self.baselines[idx].lost);
                    self.baselines[idx].lost = lost;
                    rendered += 1;
                }
            }

            if self.shared.pool.is_retired(idx) {
                self.shared.pool.try_rearm(idx);
            }
        }

        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::line::LogLine;
    use crate::pool::ChannelPool;
    use crate::severity::Severity;
    use std::sync::atomic::{AtomicBool, AtomicU8};
    use std::sync::Mutex;

    /// Sink that captures rendered output for assertions.
    pub(crate) struct TestSink {
        lines: Arc<Mutex<Vec<String>>>,
        losses: Arc<Mutex<Vec<(u32, u64)>>>,
    }

    impl TestSink {
        pub(crate) fn new() -> (Self, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<(u32, u64)>>>) {
            let lines = Arc::new(Mutex::new(Vec::new()));
            let losses = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    lines: Arc::clone(&lines),
                    losses: Arc::clone(&losses),
                },
                lines,
                losses,
            )
        }
    }

    impl LogSink for TestSink {
        fn write_line(&mut self, line: &LogLine) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("p{} {}", line.producer_id, line.text()));
        }

        fn write_loss(&mut self, producer_id: u32, lost: u64) {
            self.losses.lock().unwrap().push((producer_id, lost));
        }

        fn flush(&mut self) {}
    }

    fn test_shared(slots: usize, report_loss: bool) -> Arc<EngineShared> {
        Arc::new(EngineShared {
            pool: ChannelPool::new(slots),
            running: AtomicBool::new(true),
            min_severity: AtomicU8::new(Severity::Debug.as_u8()),
            policy: OverflowPolicy::Drop,
            report_loss,
        })
    }

    #[test]
    fn test_scan_renders_in_slot_order() {
        let shared = test_shared(2, true);
        let (_, chan_a) = shared.pool.acquire(8).unwrap();
        let (_, chan_b) = shared.pool.acquire(8).unwrap();

        chan_b.try_write(&LogLine::new(Severity::Info, chan_b.producer_id(), "from b"));
        chan_a.try_write(&LogLine::new(Severity::Info, chan_a.producer_id(), "from a"));

        let (sink, lines, _) = TestSink::new();
        let mut drain = DrainLoop::new(Arc::clone(&shared), Box::new(sink));
        assert_eq!(drain.scan(), 2);

        // Slot 0 is always visited before slot 1, regardless of write order.
        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "p0 from a");
        assert_eq!(lines[1], "p1 from b");
    }

    #[test]
    fn test_loss_reported_once_per_delta() {
        let shared = test_shared(1, true);
        let (_, chan) = shared.pool.acquire(4).unwrap();

        chan.record_loss();
        chan.record_loss();
        chan.record_loss();

        let (sink, _, losses) = TestSink::new();
        let mut drain = DrainLoop::new(Arc::clone(&shared), Box::new(sink));

        drain.scan();
        drain.scan();
        assert_eq!(losses.lock().unwrap().as_slice(), &[(0, 3)]);

        chan.record_loss();
        drain.scan();
        assert_eq!(losses.lock().unwrap().as_slice(), &[(0, 3), (0, 1)]);
    }

    #[test]
    fn test_loss_reporting_disabled() {
        let shared = test_shared(1, false);
        let (_, chan) = shared.pool.acquire(4).unwrap();
        chan.record_loss();

        let (sink, _, losses) = TestSink::new();
        let mut drain = DrainLoop::new(Arc::clone(&shared), Box::new(sink));
        drain.scan();
        assert!(losses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scan_rearms_retired_slot_after_draining() {
        let shared = test_shared(1, true);
        let (idx, chan) = shared.pool.acquire(4).unwrap();
        chan.try_write(&LogLine::new(Severity::Info, 0, "leftover"));
        drop(chan);
        shared.pool.release(idx);
        assert_eq!(shared.pool.free_slots(), 0);

        let (sink, lines, _) = TestSink::new();
        let mut drain = DrainLoop::new(Arc::clone(&shared), Box::new(sink));
        drain.scan();

        assert_eq!(lines.lock().unwrap().len(), 1);
        assert_eq!(shared.pool.free_slots(), 1);
    }

    #[test]
    fn test_baseline_resets_when_slot_is_rearmed() {
        let shared = test_shared(1, true);
        let (idx, chan) = shared.pool.acquire(4).unwrap();
        chan.record_loss();

        let (sink, _, losses) = TestSink::new();
        let mut drain = DrainLoop::new(Arc::clone(&shared), Box::new(sink));
        drain.scan();
        assert_eq!(losses.lock().unwrap().as_slice(), &[(0, 1)]);

        drop(chan);
        shared.pool.release(idx);
        drain.scan();

        // New occupant of the same slot starts from a clean baseline.
        let (_, chan2) = shared.pool.acquire(4).unwrap();
        chan2.record_loss();
        chan2.record_loss();
        drain.scan();
        assert_eq!(losses.lock().unwrap().as_slice(), &[(0, 1), (0, 2)]);
    }
}
