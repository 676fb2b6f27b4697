//! Stream Deck JSON messages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub type Settings = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPayload {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RotatePayload {
    #[serde(default)]
    pub ticks: i32,
}

/// Messages from the host, dispatched on their `event` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Inbound {
    WillAppear {
        action: String,
        context: String,
        #[serde(default)]
        payload: SettingsPayload,
    },
    WillDisappear {
        context: String,
    },
    DidReceiveGlobalSettings {
        #[serde(default)]
        payload: SettingsPayload,
    },
    DidReceiveSettings {
        context: String,
        #[serde(default)]
        payload: SettingsPayload,
    },
    KeyDown {
        context: String,
    },
    KeyUp {
        context: String,
    },
    DialRotate {
        context: String,
        #[serde(default)]
        payload: RotatePayload,
    },
    DialDown {
        context: String,
    },
    TouchTap {
        context: String,
    },
    #[serde(other)]
    Other,
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Messages to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Outbound {
    fn to_context(event: &str, context: &str, payload: Option<Value>) -> Self {
        Self {
            event: event.to_string(),
            uuid: None,
            context: Some(context.to_string()),
            payload,
        }
    }

    pub fn register(register_event: &str, uuid: &str) -> Self {
        Self {
            event: register_event.to_string(),
            uuid: Some(uuid.to_string()),
            context: None,
            payload: None,
        }
    }

    pub fn get_global_settings(uuid: &str) -> Self {
        Self::to_context("getGlobalSettings", uuid, None)
    }

    pub fn set_global_settings(uuid: &str, settings: &Settings) -> Self {
        Self::to_context("setGlobalSettings", uuid, Some(Value::Object(settings.clone())))
    }

    pub fn set_title(context: &str, title: &str) -> Self {
        Self::to_context("setTitle", context, Some(json!({ "title": title, "target": 0 })))
    }

    pub fn set_image(context: &str, image: &str) -> Self {
        Self::to_context("setImage", context, Some(json!({ "image": image, "target": 0 })))
    }

    /// Back to the image from the manifest.
    pub fn reset_image(context: &str) -> Self {
        Self::to_context("setImage", context, Some(json!({ "target": 0 })))
    }

    pub fn set_state(context: &str, state: u8) -> Self {
        Self::to_context("setState", context, Some(json!({ "state": state })))
    }

    pub fn set_feedback(context: &str, feedback: Value) -> Self {
        Self::to_context("setFeedback", context, Some(feedback))
    }

    pub fn set_feedback_layout(context: &str, layout: &str) -> Self {
        Self::to_context("setFeedbackLayout", context, Some(json!({ "layout": layout })))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_will_appear() {
        let text = r#"{"event":"willAppear","action":"com.ampdeck.time","context":"ctx1",
            "device":"dev","payload":{"settings":{"plexToken":"t"},"coordinates":{"column":0,"row":0}}}"#;
        match Inbound::parse(text).unwrap() {
            Inbound::WillAppear { action, context, payload } => {
                assert_eq!(action, "com.ampdeck.time");
                assert_eq!(context, "ctx1");
                assert_eq!(payload.settings["plexToken"], "t");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_dial_rotate() {
        let text = r#"{"event":"dialRotate","action":"a","context":"c","payload":{"ticks":-2,"pressed":false}}"#;
        assert_eq!(
            Inbound::parse(text).unwrap(),
            Inbound::DialRotate {
                context: "c".into(),
                payload: RotatePayload { ticks: -2 }
            }
        );
    }

    #[test]
    fn test_unknown_event_is_other() {
        let text = r#"{"event":"deviceDidConnect","device":"d"}"#;
        assert_eq!(Inbound::parse(text).unwrap(), Inbound::Other);
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(Inbound::parse("{not json").is_err());
        assert!(Inbound::parse(r#"{"context":"c"}"#).is_err());
    }

    #[test]
    fn test_outbound_shapes() {
        let register = Outbound::register("registerPlugin", "uuid-1").to_json().unwrap();
        assert_eq!(register, r#"{"event":"registerPlugin","uuid":"uuid-1"}"#);

        let get = Outbound::get_global_settings("uuid-1").to_json().unwrap();
        assert_eq!(get, r#"{"event":"getGlobalSettings","context":"uuid-1"}"#);

        let state: Value = serde_json::from_str(&Outbound::set_state("c", 1).to_json().unwrap()).unwrap();
        assert_eq!(state["payload"]["state"], 1);
    }
}
