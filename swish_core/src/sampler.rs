//! Background sensor acquisition.
//!
//! Spawns a thread that owns the `SampleSource`, forwards every reading over a
//! bounded channel, and tracks the last-ok timestamp for watchdog logic. The
//! `Sampler` is itself a `SampleSource`, so the trainer drains it exactly like
//! a direct source.
//!
//! Each `Sampler` spawns exactly one thread that is shut down and joined when
//! the `Sampler` is dropped.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use swish_traits::{Clock, ImuReading, SampleSource};

/// Readings buffered between the acquisition thread and the control loop.
pub const CHANNEL_CAPACITY: usize = 256;

pub struct Sampler {
    rx: xch::Receiver<ImuReading>,
    last_ok: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    exhausted: Arc<AtomicBool>,
    epoch: Instant,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    /// Poll `source` every `1/hz` seconds on a background thread.
    pub fn spawn<S, C>(mut source: S, hz: u32, clock: C) -> Self
    where
        S: SampleSource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let exhausted = Arc::new(AtomicBool::new(false));
        let last_ok = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));
        let errors = Arc::new(AtomicU64::new(0));
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();

        let (shutdown_t, exhausted_t, last_ok_t, dropped_t, errors_t) = (
            shutdown.clone(),
            exhausted.clone(),
            last_ok.clone(),
            dropped.clone(),
            errors.clone(),
        );
        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_t.load(Ordering::Relaxed) {
                    tracing::debug!("Sampler thread received shutdown signal");
                    break;
                }

                // drain whatever is ready this period, bounded per pass
                for _ in 0..CHANNEL_CAPACITY {
                    match source.next_sample() {
                        Ok(Some(r)) => {
                            match tx.try_send(r) {
                                Ok(()) => {}
                                Err(xch::TrySendError::Full(_)) => {
                                    dropped_t.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(xch::TrySendError::Disconnected(_)) => {
                                    tracing::debug!("Sampler consumer disconnected, exiting thread");
                                    return;
                                }
                            }
                            last_ok_t.store(clock.ms_since(epoch), Ordering::Relaxed);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            errors_t.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(error = %e, "sampler read failed");
                            break;
                        }
                    }
                }

                if source.is_exhausted() {
                    exhausted_t.store(true, Ordering::Release);
                    tracing::debug!("Sampler source exhausted");
                    break;
                }
                if shutdown_t.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("Sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            dropped,
            errors,
            exhausted,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Readings lost because the control loop fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Source errors swallowed by the acquisition thread.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Convenience helper: compute stall using this sampler's epoch and a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let now_ms = {
            let dur = Instant::now().saturating_duration_since(self.epoch);
            let ms = dur.as_millis();
            (ms.min(u128::from(u64::MAX))) as u64
        };
        self.stalled_for(now_ms)
    }
}

impl SampleSource for Sampler {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        match self.rx.try_recv() {
            Ok(r) => Ok(Some(r)),
            Err(xch::TryRecvError::Empty | xch::TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire) && self.rx.is_empty()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits at its next shutdown check: between drains, or
        // after the current period sleep.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Sampler thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "Sampler thread panicked during shutdown");
                }
            }
        }
    }
}
