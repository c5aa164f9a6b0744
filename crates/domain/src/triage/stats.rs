//! Read-side rollup of classification activities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activity::{Activity, ClassifyRecord};
use crate::triage::Lane;

/// Aggregate of `|delta|` values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Lane counts and delta aggregates over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneStats {
    pub immediate: u64,
    pub batched: u64,
    pub silent: u64,
    pub total: u64,
    /// Classifications whose delivery was held back by a hold window.
    pub suppressed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaStats>,
    pub rate_per_hour: f64,
}

/// Per-device rollup, plus the totals across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageStats {
    pub window_hours: u32,
    #[serde(flatten)]
    pub overall: LaneStats,
    pub devices: BTreeMap<String, LaneStats>,
}

#[derive(Default)]
struct Accumulator {
    immediate: u64,
    batched: u64,
    silent: u64,
    suppressed: u64,
    deltas: Vec<f64>,
}

impl Accumulator {
    fn add(&mut self, record: &ClassifyRecord) {
        match record.lane {
            Lane::Immediate => self.immediate += 1,
            Lane::Batched => self.batched += 1,
            Lane::Silent => self.silent += 1,
        }
        if record.suppressed {
            self.suppressed += 1;
        }
        if let Some(delta) = record.delta.filter(|d| d.is_finite()) {
            self.deltas.push(delta.abs());
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self, window_hours: u32) -> LaneStats {
        let total = self.immediate + self.batched + self.silent;
        let delta = (!self.deltas.is_empty()).then(|| {
            let sum: f64 = self.deltas.iter().sum();
            DeltaStats {
                avg: sum / self.deltas.len() as f64,
                min: self.deltas.iter().copied().fold(f64::INFINITY, f64::min),
                max: self.deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        });
        LaneStats {
            immediate: self.immediate,
            batched: self.batched,
            silent: self.silent,
            total,
            suppressed: self.suppressed,
            delta,
            rate_per_hour: total as f64 / f64::from(window_hours.max(1)),
        }
    }
}

impl TriageStats {
    /// Roll up the classification entries among `activities`.
    ///
    /// Entries of other kinds are ignored, so callers may pass an unfiltered
    /// slice of the log for the window.
    #[must_use]
    pub fn from_activities(activities: &[Activity], window_hours: u32) -> Self {
        let mut overall = Accumulator::default();
        let mut devices: BTreeMap<String, Accumulator> = BTreeMap::new();

        for activity in activities {
            let Some(record) = activity.classify_record() else {
                continue;
            };
            overall.add(&record);
            if let Some(device_id) = &activity.device_id {
                devices.entry(device_id.clone()).or_default().add(&record);
            }
        }

        Self {
            window_hours,
            overall: overall.finish(window_hours),
            devices: devices
                .into_iter()
                .map(|(id, acc)| (id, acc.finish(window_hours)))
                .collect(),
        }
    }
}
