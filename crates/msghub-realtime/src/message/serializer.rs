//! JSON encoding for hub messages.

use msghub_core::result::AppResult;

use super::types::HubMessage;

/// Serialize a message to its wire text.
pub fn encode(message: &HubMessage) -> AppResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Deserialize a message from wire text.
pub fn decode(text: &str) -> AppResult<HubMessage> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use msghub_core::error::ErrorKind;

    #[test]
    fn test_wire_field_names() {
        let mut message = HubMessage::data("presence", serde_json::json!({"online": true}))
            .with_hash("presence:alice");
        message.session_id = Some("c1".to_string());

        let value: serde_json::Value =
            serde_json::from_str(&encode(&message).expect("encode")).expect("json");
        assert_eq!(value["type"], "DATA");
        assert_eq!(value["hash"], "presence:alice");
        assert_eq!(value["sessionId"], "c1");
        assert!(value.get("principal").is_none());
    }

    #[test]
    fn test_decode_authentication() {
        let message = decode(r#"{"type":"AUTHENTICATION","payload":"abc.def.ghi"}"#).expect("decode");
        assert_eq!(message.kind, MessageType::Authentication);
        assert_eq!(message.bearer_token(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_decode_minimal_message() {
        let message = decode(r#"{"type":"ACK"}"#).expect("decode");
        assert_eq!(message.kind, MessageType::Ack);
        assert!(message.payload.is_null());
        assert!(message.bearer_token().is_none());
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let err = decode(r#"{"type":"SHOUT"}"#).expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
