//! Engine.IO v4 / Socket.IO v5 text framing
//!
//! Only the subset a signaling client needs is supported: the open
//! handshake, ping/pong, namespace connect/disconnect and JSON events on the
//! default namespace. Binary attachments are rejected.
//!
//! ```text
//! 0{"sid":..}          open          (server → client)
//! 2 / 3                ping / pong
//! 40 / 40{"sid":..}    connect       (both directions)
//! 41                   disconnect
//! 42["kind",payload]   event
//! 44{"message":..}     connect error (server → client)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Parameters announced by the server in the open packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event {
        name: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    },
    Ack {
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError(Value),
}

impl EnginePacket {
    /// Build an event packet; a `null` payload is sent without argument
    pub fn event(name: &str, payload: Value) -> Self {
        let args = if payload.is_null() { Vec::new() } else { vec![payload] };
        EnginePacket::Message(SocketPacket::Event {
            name: name.to_string(),
            args,
            ack_id: None,
        })
    }

    /// Encode to a WebSocket text frame
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

impl SocketPacket {
    fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(data)) => format!("0{}", data),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args, ack_id } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                let ack = ack_id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{}{}", ack, Value::Array(items))
            }
            SocketPacket::Ack { ack_id, args } => format!("3{}{}", ack_id, Value::Array(args.clone())),
            SocketPacket::ConnectError(data) => format!("4{}", data),
        }
    }
}

/// Decode a WebSocket text frame
pub fn decode(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty frame".to_string()))?;
    let body = chars.as_str();

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_string())),
        '3' => Ok(EnginePacket::Pong(body.to_string())),
        '4' => Ok(EnginePacket::Message(decode_socket_packet(body)?)),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(Error::Protocol(format!("unknown engine packet type '{}'", other))),
    }
}

fn decode_socket_packet(body: &str) -> Result<SocketPacket> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty socket packet".to_string()))?;
    let rest = skip_namespace(chars.as_str())?;

    match kind {
        '0' => {
            if rest.is_empty() {
                Ok(SocketPacket::Connect(None))
            } else {
                Ok(SocketPacket::Connect(Some(serde_json::from_str(rest)?)))
            }
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let (ack_id, json) = split_ack_id(rest)?;
            let mut items = match serde_json::from_str::<Value>(json)? {
                Value::Array(items) => items.into_iter(),
                other => return Err(Error::Protocol(format!("event is not an array: {}", other))),
            };
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(Error::Protocol("event without a name".to_string())),
            };
            Ok(SocketPacket::Event {
                name,
                args: items.collect(),
                ack_id,
            })
        }
        '3' => {
            let (ack_id, json) = split_ack_id(rest)?;
            let ack_id = ack_id.ok_or_else(|| Error::Protocol("ack without id".to_string()))?;
            let args = match serde_json::from_str::<Value>(json)? {
                Value::Array(items) => items,
                other => vec![other],
            };
            Ok(SocketPacket::Ack { ack_id, args })
        }
        '4' => Ok(SocketPacket::ConnectError(if rest.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(rest)?
        })),
        '5' | '6' => Err(Error::Protocol("binary packets are not supported".to_string())),
        other => Err(Error::Protocol(format!("unknown socket packet type '{}'", other))),
    }
}

// Only the default namespace is used; an explicit "/," prefix is accepted.
fn skip_namespace(rest: &str) -> Result<&str> {
    if !rest.starts_with('/') {
        return Ok(rest);
    }
    match rest.split_once(',') {
        Some(("/", tail)) => Ok(tail),
        Some((nsp, _)) => Err(Error::Protocol(format!("unexpected namespace {}", nsp))),
        None if rest == "/" => Ok(""),
        None => Err(Error::Protocol(format!("unexpected namespace {}", rest))),
    }
}

fn split_ack_id(rest: &str) -> Result<(Option<u64>, &str)> {
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Ok((None, rest));
    }
    let id = rest[..digits]
        .parse::<u64>()
        .map_err(|e| Error::Protocol(format!("bad ack id: {}", e)))?;
    Ok((Some(id), &rest[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let packet = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#)
            .unwrap();
        match packet {
            EnginePacket::Open(handshake) => {
                assert_eq!(handshake.sid, "abc");
                assert_eq!(handshake.ping_interval, 25000);
                assert_eq!(handshake.max_payload, Some(1_000_000));
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn decodes_event_with_payload() {
        let packet = decode(r#"42["created","hall"]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "created".into(),
                args: vec![json!("hall")],
                ack_id: None,
            })
        );
    }

    #[test]
    fn decodes_event_without_payload_and_with_namespace() {
        let packet = decode(r#"42/,["new_peer"]"#).unwrap();
        match packet {
            EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
                assert_eq!(name, "new_peer");
                assert!(args.is_empty());
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn decodes_event_with_ack_id() {
        let packet = decode(r#"4217["invite",{"type":"offer","sdp":"v=0"}]"#).unwrap();
        match packet {
            EnginePacket::Message(SocketPacket::Event { ack_id, args, .. }) => {
                assert_eq!(ack_id, Some(17));
                assert_eq!(args[0]["type"], "offer");
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn decodes_connect_and_errors() {
        assert_eq!(
            decode(r#"40{"sid":"x"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::Connect(Some(json!({"sid": "x"}))))
        );
        assert_eq!(
            decode(r#"44{"message":"denied"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::ConnectError(json!({"message": "denied"})))
        );
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping(String::new()));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(decode("").is_err());
        assert!(decode("9").is_err());
        assert!(decode(r#"42{"not":"array"}"#).is_err());
        assert!(decode(r#"42[17]"#).is_err());
        assert!(decode(r#"451-["photo",{"_placeholder":true,"num":0}]"#).is_err());
        assert!(decode(r#"42/admin,["created"]"#).is_err());
    }

    #[test]
    fn encodes_outbound_frames() {
        assert_eq!(EnginePacket::event("join", json!("hall")).encode(), r#"42["join","hall"]"#);
        assert_eq!(EnginePacket::event("bye", Value::Null).encode(), r#"42["bye"]"#);
        assert_eq!(EnginePacket::Message(SocketPacket::Connect(None)).encode(), "40");
        assert_eq!(EnginePacket::Message(SocketPacket::Disconnect).encode(), "41");
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
    }
}
