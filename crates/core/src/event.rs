//! Broadcast events delivered to live real-time connections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One event on a broadcast topic.
///
/// Routing is by identity: a connection authenticated as identity X
/// receives the event iff X equals `sender_id` or `recipient_id`. The
/// sender's own other devices receive it too, which is how multi-device
/// state stays in sync. All other fields are opaque to the relay and
/// round-trip unmodified through [`extra`](Self::extra).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Everything else the publisher put in the event (text, ids,
    /// timestamps). Flattened, so the wire shape is a single object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BroadcastEvent {
    /// Whether a connection with the given identity should receive this
    /// event.
    pub fn involves(&self, identity: &str) -> bool {
        self.sender_id.as_deref() == Some(identity)
            || self.recipient_id.as_deref() == Some(identity)
    }

    /// The distinct identities this event addresses, in delivery order.
    /// A self-message (sender == recipient) yields one entry, so it is
    /// delivered once, not twice.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets = Vec::with_capacity(2);
        if let Some(recipient) = self.recipient_id.as_deref() {
            targets.push(recipient);
        }
        if let Some(sender) = self.sender_id.as_deref() {
            if !targets.contains(&sender) {
                targets.push(sender);
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_fields_round_trip_unmodified() {
        let wire = r#"{"senderId":"u1","recipientId":"u2","text":"hi","ts":123}"#;
        let event: BroadcastEvent =
            serde_json::from_str(wire).expect("deserialization should succeed");

        assert_eq!(event.sender_id.as_deref(), Some("u1"));
        assert_eq!(event.recipient_id.as_deref(), Some("u2"));
        assert_eq!(event.extra["text"], "hi");

        let back = serde_json::to_value(&event).expect("serialization should succeed");
        assert_eq!(back["text"], "hi");
        assert_eq!(back["ts"], 123);
        assert_eq!(back["senderId"], "u1");
    }

    #[test]
    fn involves_matches_sender_or_recipient_only() {
        let event: BroadcastEvent =
            serde_json::from_str(r#"{"senderId":"u1","recipientId":"u2"}"#).unwrap();

        assert!(event.involves("u1"));
        assert!(event.involves("u2"));
        assert!(!event.involves("u3"));
    }

    #[test]
    fn self_message_targets_once() {
        let event: BroadcastEvent =
            serde_json::from_str(r#"{"senderId":"u1","recipientId":"u1"}"#).unwrap();

        assert_eq!(event.targets(), vec!["u1"]);
    }
}
