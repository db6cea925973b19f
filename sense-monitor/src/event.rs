//! Events emitted by a monitor session's realtime feed.

use serde::Deserialize;
use serde_json::Value;

/// Events the bridge's dispatch loop consumes, in arrival order.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The feed reported the session is no longer authorized.
    AuthorizationLost,

    /// One realtime usage frame: per-device wattage plus the total load.
    RealtimeUpdate(RealtimeFrame),

    /// The stream ended, locally or remotely.
    StreamClosed,

    /// A transport error on the feed; not fatal to the session.
    StreamError(String),
}

/// Payload of a `realtime_update` feed message.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeFrame {
    /// Devices the monitor currently sees drawing power.
    #[serde(default)]
    pub devices: Vec<FrameDevice>,

    /// Whole-home load in watts.
    #[serde(rename = "w", default)]
    pub total_watts: f64,
}

/// One device's share of a realtime frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameDevice {
    pub id: String,
    #[serde(rename = "w", default)]
    pub watts: f64,
}

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type", default)]
    kind: String,
    payload: Option<Value>,
}

/// Decode one text message off the realtime feed.
///
/// Returns `None` for frame types the bridge does not consume (hello,
/// monitor_info, epoch markers and the like). An explicit
/// `payload.authorized == false` wins over everything else in the message.
pub fn decode_feed_text(text: &str) -> Option<MonitorEvent> {
    let message: FeedMessage = serde_json::from_str(text).ok()?;
    let payload = message.payload?;

    if payload.get("authorized") == Some(&Value::Bool(false)) {
        return Some(MonitorEvent::AuthorizationLost);
    }

    if message.kind == "realtime_update" && payload.get("devices").is_some() {
        let frame: RealtimeFrame = serde_json::from_value(payload).ok()?;
        return Some(MonitorEvent::RealtimeUpdate(frame));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_realtime_update_frame() {
        let text = r#"{
            "type": "realtime_update",
            "payload": {
                "devices": [
                    {"id": "d1", "name": "Lamp", "w": 42.7},
                    {"id": "d2", "name": "Oven", "w": 1800.2}
                ],
                "w": 1960.4,
                "hz": 60.01
            }
        }"#;

        let event = decode_feed_text(text).unwrap();
        let MonitorEvent::RealtimeUpdate(frame) = event else {
            panic!("expected RealtimeUpdate, got {event:?}");
        };
        assert_eq!(frame.devices.len(), 2);
        assert_eq!(frame.devices[0].id, "d1");
        assert_eq!(frame.devices[0].watts, 42.7);
        assert_eq!(frame.total_watts, 1960.4);
    }

    #[test]
    fn authorization_loss_wins_over_frame_type() {
        let text = r#"{
            "type": "realtime_update",
            "payload": {"authorized": false, "devices": [], "w": 0}
        }"#;

        assert!(matches!(
            decode_feed_text(text),
            Some(MonitorEvent::AuthorizationLost)
        ));
    }

    #[test]
    fn ignores_frames_without_device_list() {
        let text = r#"{"type": "realtime_update", "payload": {"w": 1200.0}}"#;
        assert!(decode_feed_text(text).is_none());
    }

    #[test]
    fn ignores_other_message_types() {
        let hello = r#"{"type": "hello", "payload": {"online": true}}"#;
        assert!(decode_feed_text(hello).is_none());

        let no_payload = r#"{"type": "realtime_update"}"#;
        assert!(decode_feed_text(no_payload).is_none());
    }

    #[test]
    fn ignores_unparseable_text() {
        assert!(decode_feed_text("not json at all").is_none());
        assert!(decode_feed_text("").is_none());
    }
}
