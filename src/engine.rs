// SPDX-License-Identifier: Apache-2.0 OR MIT
// Engine lifecycle: owns the channel pool and the drain thread

use crate::channel::ChannelWriter;
use crate::config::{EngineConfig, OverflowPolicy};
use crate::drain::{sink_for, DrainLoop, LogSink};
use crate::error::EngineError;
use crate::pool::ChannelPool;
use crate::severity::Severity;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// State shared between the engine handle, every writer, and the drain
/// thread. Writers keep it alive after the engine is torn down so a write
/// through a stale handle fails loudly instead of touching freed state.
pub(crate) struct EngineShared {
    pub(crate) pool: ChannelPool,
    pub(crate) running: AtomicBool,
    pub(crate) min_severity: AtomicU8,
    pub(crate) policy: OverflowPolicy,
    pub(crate) report_loss: bool,
}

/// Process-wide logging engine.
///
/// Explicit handle with an `init`/`deinit` lifecycle; one engine per process
/// is the intended deployment, and callers make the handle reachable however
/// suits them. Producer threads acquire one channel each and write through
/// it lock-free while the drain thread renders everything in the background.
///
/// ```no_run
/// use logring::{Engine, EngineConfig, Severity};
///
/// let engine = Engine::new(EngineConfig::default())?;
/// engine.init()?;
///
/// let mut chan = engine.acquire_channel(256)?;
/// chan.write(Severity::Info, "worker online")?;
///
/// chan.release();
/// engine.deinit()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Engine {
    shared: Arc<EngineShared>,
    config: EngineConfig,
    drain: Mutex<Option<JoinHandle<Box<dyn LogSink>>>>,
    /// Parked sink: present whenever the drain thread is not running.
    sink: Mutex<Option<Box<dyn LogSink>>>,
}

impl Engine {
    /// Build an engine from configuration, with the sink chosen by
    /// `config.sink`. The pool is allocated here; nothing runs until
    /// [`init`](Self::init).
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let sink = sink_for(config.sink);
        Self::with_sink(config, sink)
    }

    /// Build an engine that renders through a caller-provided sink.
    pub fn with_sink(config: EngineConfig, sink: Box<dyn LogSink>) -> Result<Self, EngineError> {
        config.validate()?;

        let shared = Arc::new(EngineShared {
            pool: ChannelPool::new(config.max_producers),
            running: AtomicBool::new(false),
            min_severity: AtomicU8::new(config.min_severity.as_u8()),
            policy: config.overflow,
            report_loss: config.report_loss,
        });

        Ok(Self {
            shared,
            config,
            drain: Mutex::new(None),
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Start the drain thread. Fails with
    /// [`EngineError::AlreadyInitialized`] when called twice without an
    /// intervening [`deinit`](Self::deinit).
    pub fn init(&self) -> Result<(), EngineError> {
        let mut drain_guard = self.drain.lock().unwrap();
        if drain_guard.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }

        let sink = match self.sink.lock().unwrap().take() {
            Some(sink) => sink,
            // Only reachable if an earlier spawn failed and dropped the sink.
            None => {
                return Err(EngineError::DrainSpawn(
                    "sink lost to an earlier spawn failure".into(),
                ))
            }
        };

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("logring-drain".into())
            .spawn(move || DrainLoop::new(shared, sink).run())
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                EngineError::DrainSpawn(e.to_string())
            })?;

        *drain_guard = Some(handle);
        Ok(())
    }

    /// Stop the engine: signal the drain thread, wait for its final flush,
    /// and join it. Outstanding writer handles stay valid to hold but any
    /// later write on them returns [`WriteError::ShutDown`](crate::WriteError::ShutDown).
    /// Fails with [`EngineError::NotInitialized`] when the engine is not
    /// running.
    pub fn deinit(&self) -> Result<(), EngineError> {
        let mut drain_guard = self.drain.lock().unwrap();
        let Some(handle) = drain_guard.take() else {
            return Err(EngineError::NotInitialized);
        };

        self.shared.running.store(false, Ordering::Release);
        let sink = handle.join().map_err(|_| EngineError::DrainPanicked)?;
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    /// Acquire exclusive ownership of one channel, sized to `capacity_hint`
    /// lines (or the configured fixed capacity when one is set).
    ///
    /// Never waits: when the pool is exhausted this returns
    /// [`PoolError::Exhausted`](crate::PoolError::Exhausted) and the caller
    /// must treat logging from this thread as unavailable rather than retry
    /// in a tight loop.
    pub fn acquire_channel(&self, capacity_hint: usize) -> Result<ChannelWriter, EngineError> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(EngineError::NotInitialized);
        }
        let capacity = self.config.channel_capacity.unwrap_or(capacity_hint);
        let (slot, channel) = self.shared.pool.acquire(capacity)?;
        Ok(ChannelWriter::new(
            channel,
            Arc::clone(&self.shared),
            slot,
        ))
    }

    /// Adjust the single global severity threshold. Takes effect on the
    /// next write of every producer.
    pub fn set_min_severity(&self, min: Severity) {
        self.shared.min_severity.store(min.as_u8(), Ordering::Relaxed);
    }

    pub fn min_severity(&self) -> Severity {
        Severity::from_u8(self.shared.min_severity.load(Ordering::Relaxed))
            .unwrap_or(Severity::Info)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Channel slots currently available for acquisition.
    pub fn free_channels(&self) -> usize {
        self.shared.pool.free_slots()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Best effort: flush and join if the caller forgot to deinit.
        let _ = self.deinit();
    }
}
