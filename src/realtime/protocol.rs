//! JSON hub protocol framing.
//!
//! Every record is a JSON object terminated by the 0x1E record separator; one
//! websocket frame may carry several records. The first record the server sends
//! is the handshake response (`{}` or `{"error": "..."}`).

use serde_json::{json, Value};

use crate::error::{ClientError, ClientResult};

pub const RECORD_SEPARATOR: char = '\u{1e}';

pub const TYPE_INVOCATION: u64 = 1;
pub const TYPE_PING: u64 = 6;
pub const TYPE_CLOSE: u64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    Close { error: Option<String>, allow_reconnect: bool },
    /// Stream items, completions and anything newer than this client.
    Other(u64),
}

fn frame(value: Value) -> String {
    let mut s = value.to_string();
    s.push(RECORD_SEPARATOR);
    s
}

pub fn handshake_request() -> String {
    frame(json!({"protocol": "json", "version": 1}))
}

pub fn ping() -> String {
    frame(json!({"type": TYPE_PING}))
}

/// Non-empty records in a text frame, separator stripped.
pub fn split_records(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR).map(str::trim).filter(|r| !r.is_empty())
}

pub fn parse_handshake_response(record: &str) -> ClientResult<()> {
    let v: Value = serde_json::from_str(record)
        .map_err(|e| ClientError::hub(format!("malformed handshake response: {}", e)))?;
    match v.get("error").and_then(Value::as_str) {
        Some(err) => Err(ClientError::hub(format!("handshake rejected: {}", err))),
        None => Ok(()),
    }
}

pub fn decode(record: &str) -> ClientResult<HubMessage> {
    let v: Value = serde_json::from_str(record)
        .map_err(|e| ClientError::hub(format!("malformed hub record: {}", e)))?;
    let kind = v.get("type").and_then(Value::as_u64)
        .ok_or_else(|| ClientError::hub("hub record without a type"))?;
    Ok(match kind {
        TYPE_INVOCATION => {
            let target = v.get("target").and_then(Value::as_str)
                .ok_or_else(|| ClientError::hub("invocation without a target"))?
                .to_string();
            let arguments = match v.get("arguments") {
                Some(Value::Array(args)) => args.clone(),
                _ => Vec::new(),
            };
            HubMessage::Invocation { target, arguments }
        }
        TYPE_PING => HubMessage::Ping,
        TYPE_CLOSE => HubMessage::Close {
            error: v.get("error").and_then(Value::as_str).map(str::to_string),
            allow_reconnect: v.get("allowReconnect").and_then(Value::as_bool).unwrap_or(false),
        },
        other => HubMessage::Other(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_is_terminated() {
        let h = handshake_request();
        assert!(h.ends_with(RECORD_SEPARATOR));
        let v: Value = serde_json::from_str(h.trim_end_matches(RECORD_SEPARATOR)).unwrap();
        assert_eq!(v, json!({"protocol": "json", "version": 1}));
        assert!(parse_handshake_response("{}").is_ok());
        assert!(parse_handshake_response(r#"{"error":"unsupported protocol"}"#).is_err());
    }

    #[test]
    fn one_frame_many_records() {
        let text = "{}\u{1e}{\"type\":1,\"target\":\"NewOrderNotification\",\"arguments\":[{\"orderId\":7}]}\u{1e}{\"type\":6}\u{1e}";
        let records: Vec<&str> = split_records(text).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(
            decode(records[1]).unwrap(),
            HubMessage::Invocation { target: "NewOrderNotification".into(), arguments: vec![json!({"orderId": 7})] }
        );
        assert_eq!(decode(records[2]).unwrap(), HubMessage::Ping);
    }

    #[test]
    fn close_and_unknown_types() {
        assert_eq!(
            decode(r#"{"type":7,"error":"shutting down","allowReconnect":true}"#).unwrap(),
            HubMessage::Close { error: Some("shutting down".into()), allow_reconnect: true }
        );
        assert_eq!(decode(r#"{"type":7}"#).unwrap(), HubMessage::Close { error: None, allow_reconnect: false });
        assert_eq!(decode(r#"{"type":3,"invocationId":"1"}"#).unwrap(), HubMessage::Other(3));
        assert!(decode(r#"{"target":"x"}"#).is_err());
    }
}
