//! Device metadata as the cloud API reports it.

use serde::Deserialize;

/// One device entry from the monitor's device-list endpoint.
///
/// The interesting parts live in string-valued tags: `DeviceListAllowed`
/// gates whether the device should surface to the hub at all, and
/// `NameUserGuess` marks names the monitor inferred rather than the user set.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorDevice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    tags: DeviceTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DeviceTags {
    #[serde(rename = "DeviceListAllowed")]
    device_list_allowed: Option<String>,
    #[serde(rename = "NameUserGuess")]
    name_user_guess: Option<String>,
}

impl MonitorDevice {
    /// Whether the upstream marks this device as listable to integrations.
    pub fn listable(&self) -> bool {
        self.tags.device_list_allowed.as_deref() == Some("true")
    }

    /// Whether the device name is an upstream guess rather than user-set.
    pub fn name_is_guess(&self) -> bool {
        self.tags.name_user_guess.as_deref() == Some("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_listable_device_with_tags() {
        let json = r#"{
            "id": "abc123",
            "name": "Fridge",
            "tags": {
                "DeviceListAllowed": "true",
                "NameUserGuess": "false",
                "DefaultUserDeviceType": "Refrigerator"
            }
        }"#;

        let device: MonitorDevice = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "abc123");
        assert_eq!(device.name, "Fridge");
        assert!(device.listable());
        assert!(!device.name_is_guess());
    }

    #[test]
    fn decodes_guessed_name_flag() {
        let json = r#"{
            "id": "abc123",
            "name": "Heat Pump",
            "tags": {"DeviceListAllowed": "true", "NameUserGuess": "true"}
        }"#;

        let device: MonitorDevice = serde_json::from_str(json).unwrap();
        assert!(device.name_is_guess());
    }

    #[test]
    fn missing_tags_mean_not_listable() {
        let json = r#"{"id": "hidden", "name": "Always On"}"#;

        let device: MonitorDevice = serde_json::from_str(json).unwrap();
        assert!(!device.listable());
        assert!(!device.name_is_guess());
    }
}
