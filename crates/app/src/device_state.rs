//! Last known readings per device.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hearth_domain::device_event::DeviceEvent;
use hearth_domain::triage::DeviceState;

/// In-memory map of device id to [`DeviceState`].
///
/// Readings are lost on restart; the first event after a restart has no
/// previous value.
#[derive(Debug, Default)]
pub struct DeviceStateTracker {
    states: Mutex<HashMap<String, DeviceState>>,
}

impl DeviceStateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, DeviceState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the state recorded so far for `device_id`.
    #[must_use]
    pub fn snapshot(&self, device_id: &str) -> DeviceState {
        self.states().get(device_id).cloned().unwrap_or_default()
    }

    /// Remember the event's reading as the device's latest.
    pub fn record(&self, event: &DeviceEvent) {
        self.states()
            .entry(event.device_id.clone())
            .or_default()
            .record(event);
    }
}
