//! Wire codec.
//!
//! Pure functions converting between raw gateway frames and the records in
//! [`model::wire`](crate::model::wire). Nothing here touches a socket.

use secluded_core::Message as _;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;
use crate::model::message::SecludedMessage;
use crate::model::segment::Segment;
use crate::model::wire::{
    InboundCommand, InboundFrame, LoginCredentials, OutboundCommand, OutboundData, OutboundFrame,
    ResponseFrame, WireSegment, keys,
};

/// Builds the `SyncOicq` handshake frame.
pub fn encode_handshake(plugin_id: &str, plugin_name: &str, token: &str, seq: u64) -> OutboundFrame {
    OutboundFrame {
        seq,
        cmd: OutboundCommand::SyncOnline,
        rsp: true,
        data: OutboundData::Login(LoginCredentials {
            pid: plugin_id.to_string(),
            name: plugin_name.to_string(),
            token: token.to_string(),
        }),
    }
}

/// Parses a frame whose `data` is a segment list.
///
/// Fails with [`DecodeError::MalformedPayload`] if the bytes are not JSON,
/// or if `data` is missing, empty, or holds anything other than objects.
pub fn decode_frame(raw: &[u8]) -> Result<InboundFrame, DecodeError> {
    let mut root = parse_object(raw)?;

    let seq = root.get("seq").and_then(Value::as_i64).unwrap_or_default();
    let cmd = parse_command(&root)?;

    let data = match root.remove("data") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(DecodeError::malformed("`data` is not a list")),
        None => return Err(DecodeError::malformed("missing `data`")),
    };
    if data.is_empty() {
        return Err(DecodeError::malformed("`data` is empty"));
    }

    let segments = data
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(segment) => Ok(segment),
            _ => Err(DecodeError::malformed(format!("data[{i}] is not an object"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InboundFrame::new(seq, cmd, segments))
}

/// Parses a `Response` frame whose `data` is an object.
pub fn decode_response(raw: &[u8]) -> Result<ResponseFrame, DecodeError> {
    let mut root = parse_object(raw)?;

    if parse_command(&root)? != InboundCommand::Response {
        return Err(DecodeError::malformed("not a `Response` frame"));
    }
    let seq = root.get("seq").and_then(Value::as_i64).unwrap_or_default();

    match root.remove("data") {
        Some(Value::Object(data)) => Ok(ResponseFrame { seq, data }),
        _ => Err(DecodeError::malformed("response `data` is not an object")),
    }
}

/// Builds a `SendOicqMsg` frame.
///
/// The metadata segment comes first: `Account` always, `Group` + `GroupId`
/// when a group is given, `Reply` when a message id to reply to is given.
/// Every supported segment then becomes one single-purpose wire segment;
/// segments with no wire form are dropped.
///
/// `seq` is left at zero for the session to stamp.
pub fn encode_outbound_message(
    account_id: &str,
    group_id: Option<&str>,
    reply_to: Option<&str>,
    message: &SecludedMessage,
) -> OutboundFrame {
    let mut meta = Map::new();
    meta.insert(keys::ACCOUNT.into(), account_id.into());
    if let Some(group_id) = group_id {
        meta.insert(keys::GROUP.into(), keys::GROUP.into());
        meta.insert(keys::GROUP_ID.into(), group_id.into());
    }
    if let Some(msg_id) = reply_to {
        meta.insert(keys::REPLY.into(), msg_id.into());
    }

    let mut segments = Vec::with_capacity(message.as_slice().len() + 1);
    segments.push(meta);
    segments.extend(message.into_iter().filter_map(encode_segment));

    OutboundFrame {
        seq: 0,
        cmd: OutboundCommand::SendMessage,
        rsp: true,
        data: OutboundData::Segments(segments),
    }
}

fn encode_segment(segment: &Segment) -> Option<WireSegment> {
    let mut out = Map::new();
    match segment {
        Segment::Text(data) => {
            out.insert(keys::TEXT.into(), data.text.clone().into());
        }
        Segment::Img(data) => {
            out.insert(keys::IMG.into(), data.url.clone().into());
        }
        Segment::Gif(data) => {
            out.insert(keys::GIF.into(), data.url.clone().into());
        }
        Segment::At(data) => {
            out.insert(keys::AT_NAME.into(), data.user_name.clone().into());
            out.insert(keys::AT_UIN.into(), data.user_id.clone().into());
        }
        Segment::AtAll => {
            out.insert(keys::AT_ALL.into(), keys::AT_ALL.into());
        }
        Segment::Custom(data) => {
            debug!(kind = %data.kind, "Dropping segment with no wire form");
            return None;
        }
    }
    Some(out)
}

fn parse_object(raw: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_slice(raw)? {
        Value::Object(root) => Ok(root),
        _ => Err(DecodeError::malformed("frame is not a JSON object")),
    }
}

fn parse_command(root: &Map<String, Value>) -> Result<InboundCommand, DecodeError> {
    match root.get("cmd") {
        None | Some(Value::Null) => Ok(InboundCommand::Unknown),
        Some(cmd) => Ok(serde_json::from_value(cmd.clone())?),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secluded_core::MessageSegment as _;
    use serde_json::json;

    #[test]
    fn test_encode_handshake() {
        let frame = encode_handshake("nonebot", "bridge", "secret", 1);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({
                "seq": 1,
                "cmd": "SyncOicq",
                "rsp": true,
                "data": {"pid": "nonebot", "name": "bridge", "token": "secret"}
            })
        );
    }

    #[test]
    fn test_decode_frame() {
        let raw = br#"{"seq":7,"cmd":"PushOicqMsg","data":[{"Account":"10001","Uin":42},{"Text":"hi"}]}"#;
        let frame = decode_frame(raw).unwrap();

        assert_eq!(frame.seq(), 7);
        assert_eq!(frame.cmd(), InboundCommand::PushMessage);
        assert_eq!(frame.meta_string("Account").as_deref(), Some("10001"));
        assert_eq!(frame.meta_string("Uin").as_deref(), Some("42"));
        assert_eq!(frame.content().len(), 1);
        assert_eq!(frame.keys().collect::<Vec<_>>(), ["Account", "Uin", "Text"]);
    }

    #[test]
    fn test_decode_frame_unknown_command() {
        let frame = decode_frame(br#"{"cmd":"Whatever","data":[{"Account":"1"}]}"#).unwrap();
        assert_eq!(frame.cmd(), InboundCommand::Unknown);
        assert_eq!(frame.seq(), 0);
    }

    #[test]
    fn test_decode_frame_rejects_malformed() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"[1, 2]",
            br#"{"cmd":"PushOicqMsg"}"#,
            br#"{"cmd":"PushOicqMsg","data":[]}"#,
            br#"{"cmd":"PushOicqMsg","data":{"status":true}}"#,
            br#"{"cmd":"PushOicqMsg","data":[{"Account":"1"},"text"]}"#,
        ];
        for raw in cases {
            let err = decode_frame(raw).unwrap_err();
            assert!(matches!(err, DecodeError::MalformedPayload { .. }), "{raw:?}");
        }
    }

    #[test]
    fn test_decode_response() {
        let response = decode_response(br#"{"seq":1,"cmd":"Response","data":{"status":true}}"#).unwrap();
        assert_eq!(response.seq, 1);
        assert_eq!(response.status(), Some(true));

        let response = decode_response(br#"{"cmd":"Response","data":{"status":false}}"#).unwrap();
        assert_eq!(response.status(), Some(false));

        let response = decode_response(br#"{"cmd":"Response","data":{}}"#).unwrap();
        assert_eq!(response.status(), None);

        assert!(decode_response(br#"{"cmd":"PushOicqMsg","data":{"status":true}}"#).is_err());
        assert!(decode_response(br#"{"cmd":"Response","data":[{"status":true}]}"#).is_err());
    }

    #[test]
    fn test_encode_group_reply() {
        let message: SecludedMessage = vec![
            Segment::text("hello "),
            Segment::at("42", "Alice"),
            Segment::at_all(),
            Segment::img("http://example.com/a.png"),
            Segment::gif("http://example.com/b.gif"),
        ]
        .into();

        let frame = encode_outbound_message("10001", Some("5000"), Some("m-1"), &message);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({
                "seq": 0,
                "cmd": "SendOicqMsg",
                "rsp": true,
                "data": [
                    {"Account": "10001", "Group": "Group", "GroupId": "5000", "Reply": "m-1"},
                    {"Text": "hello "},
                    {"AtName": "Alice", "AtUin": "42"},
                    {"AtAll": "AtAll"},
                    {"Img": "http://example.com/a.png"},
                    {"Gif": "http://example.com/b.gif"}
                ]
            })
        );
    }

    #[test]
    fn test_encode_private_message() {
        let frame = encode_outbound_message("10001", None, None, &"hi".into());
        let segments = frame.segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 1);
        assert_eq!(segments[0]["Account"], "10001");
        assert_eq!(segments[1]["Text"], "hi");
    }

    #[test]
    fn test_encode_drops_custom_segments() {
        let message: SecludedMessage = vec![
            Segment::custom("poke", Map::new()),
            Segment::text("still here"),
        ]
        .into();

        let frame = encode_outbound_message("10001", None, None, &message);
        let segments = frame.segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1]["Text"], "still here");
    }
}
