//! Batch accumulator: buffers batched-lane events and flushes them.
//!
//! One global buffer shared by the event path ([`BatchAccumulator::push`])
//! and the timer task ([`BatchAccumulator::run`]). A flush takes the whole
//! buffer under the lock, so pushes never interleave with it. The buffer is
//! not persisted: a crash loses at most one flush interval of events.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use hearth_domain::activity::Activity;
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;
use hearth_domain::time::{self, Timestamp};

use crate::ports::{ActivityLog, AgentGateway};

/// Owned buffer of batched-lane events.
pub struct BatchAccumulator<G, L> {
    buffer: Mutex<Vec<DeviceEvent>>,
    gateway: G,
    log: L,
}

impl<G: AgentGateway, L: ActivityLog> BatchAccumulator<G, L> {
    pub fn new(gateway: G, log: L) -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            gateway,
            log,
        }
    }

    /// The buffer is a plain `Vec` with no invariant a panicking holder
    /// could break, so a poisoned lock is recovered.
    fn buffer(&self) -> MutexGuard<'_, Vec<DeviceEvent>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event to the current window.
    pub fn push(&self, event: DeviceEvent) {
        self.buffer().push(event);
    }

    /// Number of events waiting for the next flush.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver everything buffered as one batch and record a `triage`
    /// activity carrying its `event_count`. Returns the number of events
    /// flushed; an empty buffer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the delivery or storage error. On a delivery error the events
    /// are put back ahead of anything pushed meanwhile.
    pub async fn flush(&self, now: Timestamp) -> Result<usize, HearthError> {
        let events = std::mem::take(&mut *self.buffer());
        if events.is_empty() {
            return Ok(0);
        }

        if let Err(err) = self.gateway.deliver_batch(&events).await {
            self.restore(events);
            return Err(err);
        }
        let count = events.len();
        self.log.record(Activity::batch_flush(&events, now)).await?;
        tracing::info!(count, "batch flushed");
        Ok(count)
    }

    fn restore(&self, mut events: Vec<DeviceEvent>) {
        let mut buffer = self.buffer();
        events.append(&mut buffer);
        *buffer = events;
    }

    /// Flush every `interval` until `shutdown` flips to `true`, then flush
    /// once more so the last partial window is not lost.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.flush(time::now()).await {
                        tracing::warn!(error = %err, "batch flush failed, retrying next interval");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        match self.flush(time::now()).await {
            Ok(count) => tracing::info!(count, "final batch flushed on shutdown"),
            Err(err) => tracing::error!(error = %err, "final batch flush failed"),
        }
    }
}
