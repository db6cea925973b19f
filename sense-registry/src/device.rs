//! Device record model shared with the hub-facing HTTP layer.

use serde::Serialize;

/// Reserved id of the synthetic whole-home aggregate record.
///
/// The leading zeros keep it sorted ahead of real device ids on the hub side.
pub const AGGREGATE_DEVICE_ID: &str = "00total";

/// On/off state as the hub expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    On,
    Off,
}

/// One device entry in the registry snapshot.
///
/// `usage` is whole watts. A value of `-1` is the upstream sentinel for
/// "no data" and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub state: DeviceState,
    pub usage: i64,
}

impl DeviceRecord {
    /// Whether this is the synthetic aggregate record.
    pub fn is_aggregate(&self) -> bool {
        self.id == AGGREGATE_DEVICE_ID
    }
}

/// Round a reported wattage to whole watts.
///
/// Exactly `-1.0` is the upstream "unknown" sentinel and is not rounded.
pub(crate) fn round_watts(raw: f64) -> i64 {
    if raw == -1.0 {
        -1
    } else {
        raw.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_watts_rounds_half_up() {
        assert_eq!(round_watts(42.7), 43);
        assert_eq!(round_watts(42.4), 42);
        assert_eq!(round_watts(0.5), 1);
        assert_eq!(round_watts(0.0), 0);
    }

    #[test]
    fn round_watts_passes_unknown_sentinel_through() {
        assert_eq!(round_watts(-1.0), -1);
        // Other negatives are not the sentinel and round normally.
        assert_eq!(round_watts(-0.4), 0);
    }

    #[test]
    fn device_record_serializes_hub_wire_format() {
        let record = DeviceRecord {
            id: "d1".to_string(),
            name: "Lamp".to_string(),
            state: DeviceState::Off,
            usage: 0,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "d1", "name": "Lamp", "state": "off", "usage": 0})
        );
    }

    #[test]
    fn aggregate_id_is_recognized() {
        let record = DeviceRecord {
            id: AGGREGATE_DEVICE_ID.to_string(),
            name: "Total".to_string(),
            state: DeviceState::On,
            usage: 120,
        };
        assert!(record.is_aggregate());
    }
}
