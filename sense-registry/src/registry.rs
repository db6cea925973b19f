//! The registry proper: insertion-ordered device records plus the aggregate.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::device::{round_watts, DeviceRecord, DeviceState, AGGREGATE_DEVICE_ID};

/// In-memory mapping of device id to its current record.
///
/// Iteration order of [`snapshot`](DeviceRegistry::snapshot) is insertion
/// order, so the hub sees devices in the order they were first discovered.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    records: HashMap<String, DeviceRecord>,
    order: Vec<String>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a device discovered by the metadata refresh.
    ///
    /// Callers only pass devices the upstream marks as listable. A new device
    /// starts off with zero usage; an existing one only has its name
    /// refreshed — state and usage belong to the streaming event processor.
    /// Names are trimmed, and flagged-as-guessed names get a ` (?)` marker.
    pub fn upsert_metadata(&mut self, id: &str, name: &str, guessed: bool) {
        let label = display_name(name, guessed);
        match self.records.get_mut(id) {
            Some(record) => record.name = label,
            None => {
                info!(device = %id, name = %label, "found device");
                self.insert(DeviceRecord {
                    id: id.to_string(),
                    name: label,
                    state: DeviceState::Off,
                    usage: 0,
                });
            }
        }
    }

    /// Guarantee the synthetic aggregate record exists with state `on`.
    ///
    /// Idempotent; an existing aggregate keeps its last observed total.
    pub fn ensure_aggregate(&mut self) {
        match self.records.get_mut(AGGREGATE_DEVICE_ID) {
            Some(record) => record.state = DeviceState::On,
            None => self.insert(DeviceRecord {
                id: AGGREGATE_DEVICE_ID.to_string(),
                name: "Total".to_string(),
                state: DeviceState::On,
                usage: 0,
            }),
        }
    }

    /// Reset every non-aggregate record to off / 0 watts.
    ///
    /// Called once per usage frame before the frame's values are applied, so
    /// devices absent from the frame drop to zero instead of holding stale
    /// power readings.
    pub fn zero_all_except_aggregate(&mut self) {
        for record in self.records.values_mut() {
            if !record.is_aggregate() {
                record.state = DeviceState::Off;
                record.usage = 0;
            }
        }
    }

    /// Apply one device's reported wattage from a usage frame.
    ///
    /// Returns `false` when the device is unknown: a usage frame is never
    /// allowed to fabricate a record the metadata refresh has not seen, so
    /// the entry is logged and skipped while the rest of the frame applies.
    ///
    /// A reading that arrives while the previous stored value was below one
    /// watt is floored at 1 so freshly-on devices never render as zero.
    pub fn apply_usage(&mut self, id: &str, raw_watts: f64) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            warn!(device = %id, "usage frame references unknown device, skipping entry");
            return false;
        };

        let rounded = round_watts(raw_watts);
        record.usage = if record.usage < 1 && rounded != -1 {
            rounded.max(1)
        } else {
            rounded
        };
        record.state = DeviceState::On;
        true
    }

    /// Store the frame's whole-home total on the aggregate record.
    pub fn set_aggregate_usage(&mut self, raw_watts: f64) {
        self.ensure_aggregate();
        if let Some(record) = self.records.get_mut(AGGREGATE_DEVICE_ID) {
            record.usage = round_watts(raw_watts);
            record.state = DeviceState::On;
        }
    }

    /// Current usage on the aggregate record, if one exists yet.
    pub fn aggregate_usage(&self) -> Option<i64> {
        self.records.get(AGGREGATE_DEVICE_ID).map(|r| r.usage)
    }

    /// Look up a single record by id.
    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.records.get(id)
    }

    /// Whether a record exists for the given id.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Number of records, the aggregate included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no device has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clone of all records in insertion order.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect()
    }

    fn insert(&mut self, record: DeviceRecord) {
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record);
    }
}

fn display_name(name: &str, guessed: bool) -> String {
    let trimmed = name.trim();
    if guessed {
        format!("{trimmed} (?)")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(devices: &[(&str, &str)]) -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        for (id, name) in devices {
            registry.upsert_metadata(id, name, false);
        }
        registry.ensure_aggregate();
        registry
    }

    #[test]
    fn upsert_creates_device_off_with_zero_usage() {
        let mut registry = DeviceRegistry::new();
        registry.upsert_metadata("d1", "Lamp", false);

        let record = registry.get("d1").unwrap();
        assert_eq!(record.name, "Lamp");
        assert_eq!(record.state, DeviceState::Off);
        assert_eq!(record.usage, 0);
    }

    #[test]
    fn upsert_existing_device_updates_name_only() {
        let mut registry = registry_with(&[("d1", "Lamp")]);
        registry.apply_usage("d1", 42.0);

        registry.upsert_metadata("d1", "Desk Lamp", false);

        let record = registry.get("d1").unwrap();
        assert_eq!(record.name, "Desk Lamp");
        assert_eq!(record.state, DeviceState::On);
        assert_eq!(record.usage, 42);
    }

    #[test]
    fn upsert_trims_and_marks_guessed_names() {
        let mut registry = DeviceRegistry::new();
        registry.upsert_metadata("d1", "  Fridge  ", true);
        registry.upsert_metadata("d2", "  Oven ", false);

        assert_eq!(registry.get("d1").unwrap().name, "Fridge (?)");
        assert_eq!(registry.get("d2").unwrap().name, "Oven");
    }

    #[test]
    fn ensure_aggregate_is_idempotent_and_preserves_total() {
        let mut registry = DeviceRegistry::new();
        registry.ensure_aggregate();
        registry.set_aggregate_usage(120.0);

        registry.ensure_aggregate();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.aggregate_usage(), Some(120));
        let aggregate = registry.get(AGGREGATE_DEVICE_ID).unwrap();
        assert_eq!(aggregate.state, DeviceState::On);
        assert_eq!(aggregate.name, "Total");
    }

    #[test]
    fn aggregate_stays_on_regardless_of_device_state() {
        let mut registry = registry_with(&[("d1", "Lamp")]);
        registry.zero_all_except_aggregate();

        let aggregate = registry.get(AGGREGATE_DEVICE_ID).unwrap();
        assert_eq!(aggregate.state, DeviceState::On);
        assert_eq!(registry.get("d1").unwrap().state, DeviceState::Off);
    }

    #[test]
    fn zero_all_resets_devices_but_not_aggregate() {
        let mut registry = registry_with(&[("d1", "Lamp"), ("d2", "Oven")]);
        registry.apply_usage("d1", 60.0);
        registry.apply_usage("d2", 1800.0);
        registry.set_aggregate_usage(1900.0);

        registry.zero_all_except_aggregate();

        for id in ["d1", "d2"] {
            let record = registry.get(id).unwrap();
            assert_eq!(record.state, DeviceState::Off);
            assert_eq!(record.usage, 0);
        }
        assert_eq!(registry.aggregate_usage(), Some(1900));
    }

    #[test]
    fn apply_usage_rounds_and_turns_device_on() {
        let mut registry = registry_with(&[("d1", "Lamp")]);

        assert!(registry.apply_usage("d1", 42.7));

        let record = registry.get("d1").unwrap();
        assert_eq!(record.state, DeviceState::On);
        assert_eq!(record.usage, 43);
    }

    #[test]
    fn apply_usage_floors_at_one_watt_when_previously_below_one() {
        let mut registry = registry_with(&[("d1", "Lamp")]);

        // Previous value 0 -> a sub-watt reading floors to 1.
        registry.apply_usage("d1", 0.3);
        assert_eq!(registry.get("d1").unwrap().usage, 1);

        // Previous value >= 1 -> raw rounding applies, even back to 0.
        registry.apply_usage("d1", 0.3);
        assert_eq!(registry.get("d1").unwrap().usage, 0);
    }

    #[test]
    fn apply_usage_passes_unknown_sentinel_unrounded() {
        let mut registry = registry_with(&[("d1", "Lamp")]);

        registry.apply_usage("d1", -1.0);

        let record = registry.get("d1").unwrap();
        assert_eq!(record.usage, -1);
        assert_eq!(record.state, DeviceState::On);
    }

    #[test]
    fn apply_usage_skips_unknown_device() {
        let mut registry = registry_with(&[("d1", "Lamp")]);
        let count = registry.len();

        assert!(!registry.apply_usage("ghost", 100.0));

        assert_eq!(registry.len(), count);
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let mut registry = DeviceRegistry::new();
        registry.upsert_metadata("d2", "Oven", false);
        registry.upsert_metadata("d1", "Lamp", false);
        registry.ensure_aggregate();

        let ids: Vec<String> = registry.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["d2", "d1", AGGREGATE_DEVICE_ID]);
    }

    #[test]
    fn full_frame_matches_worked_example() {
        // Metadata discovers d1, then a frame {devices: [{d1, 42.7}], w: 120}.
        let mut registry = DeviceRegistry::new();
        registry.upsert_metadata("d1", "Lamp", false);
        registry.ensure_aggregate();

        assert_eq!(
            registry.get("d1").unwrap(),
            &DeviceRecord {
                id: "d1".to_string(),
                name: "Lamp".to_string(),
                state: DeviceState::Off,
                usage: 0,
            }
        );

        registry.zero_all_except_aggregate();
        registry.apply_usage("d1", 42.7);
        registry.set_aggregate_usage(120.0);

        let d1 = registry.get("d1").unwrap();
        assert_eq!((d1.state, d1.usage), (DeviceState::On, 43));
        let total = registry.get(AGGREGATE_DEVICE_ID).unwrap();
        assert_eq!((total.state, total.usage), (DeviceState::On, 120));
    }
}
