//! Socket event wire format
//!
//! Every WebSocket text message is one named event:
//! `{"event": "<name>", "data": { ... }}`.

use dms::FrameVerdict;
use serde::{Deserialize, Serialize};

/// Events sent by the browser
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Frame(FramePayload),
}

/// Payload of a `frame` event
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FramePayload {
    /// `"<mime-header>,<base64>"` or bare base64 still image
    #[serde(default)]
    pub image: Option<String>,
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected { msg: String },
    Drowsiness(FrameVerdict),
}

impl ServerEvent {
    pub fn connected() -> Self {
        ServerEvent::Connected {
            msg: "connected".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_frame() {
        let event = ClientEvent::parse(
            r#"{"event":"frame","data":{"image":"data:image/jpeg;base64,AAAA"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Frame(FramePayload {
                image: Some("data:image/jpeg;base64,AAAA".into())
            })
        );
    }

    #[test]
    fn test_parse_frame_without_image() {
        let event = ClientEvent::parse(r#"{"event":"frame","data":{}}"#).unwrap();
        assert_eq!(event, ClientEvent::Frame(FramePayload::default()));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(ClientEvent::parse(r#"{"event":"ping","data":{}}"#).is_err());
        assert!(ClientEvent::parse("not json").is_err());
    }

    #[test]
    fn test_server_event_shapes() {
        let connected: serde_json::Value =
            serde_json::from_str(&ServerEvent::connected().to_json().unwrap()).unwrap();
        assert_eq!(connected, json!({"event": "connected", "data": {"msg": "connected"}}));

        let verdict = ServerEvent::Drowsiness(FrameVerdict {
            drowsy: true,
            closed_frames: 20,
            alarm: true,
        });
        let value: serde_json::Value = serde_json::from_str(&verdict.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "drowsiness",
                "data": {"drowsy": true, "closed_frames": 20, "alarm": true}
            })
        );
    }
}
