//! Gateway wire records.
//!
//! Inbound frames look like
//!
//! ```json
//! {"seq": 3, "cmd": "PushOicqMsg", "data": [{"Account": "10001", "Uin": "42", ...}, {"Text": "hi"}]}
//! ```
//!
//! where `data[0]` is the metadata segment and every later element is a
//! content segment holding a single key. Outbound frames add an `rsp` flag and
//! carry either the login credentials or a segment list shaped the same way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One element of a frame's `data` array.
pub type WireSegment = Map<String, Value>;

/// Field names used on the wire.
pub mod keys {
    pub const ACCOUNT: &str = "Account";
    pub const UIN: &str = "Uin";
    pub const UIN_NAME: &str = "UinName";
    pub const OP_NAME: &str = "OpName";
    pub const GROUP: &str = "Group";
    pub const GROUP_ID: &str = "GroupId";
    pub const GROUP_NAME: &str = "GroupName";
    pub const MSG_ID: &str = "MsgId";
    pub const REPLY: &str = "Reply";

    pub const TEXT: &str = "Text";
    pub const AT_NAME: &str = "AtName";
    pub const AT_UIN: &str = "AtUin";
    pub const AT_ALL: &str = "AtAll";
    pub const IMG: &str = "Img";
    pub const GIF: &str = "Gif";

    pub const GROUP_NOTIFY: &str = "GroupNotify";
    pub const NEW_FRIEND_NOTIFY: &str = "NewFriendNotify";
    pub const GROUP_NEW_MEMBER: &str = "GroupNewMember";
    pub const GROUP_MEMBER_SIGNOUT: &str = "GroupMemberSignout";
    pub const HEARTBEAT: &str = "Heartbeat";
}

/// Renders a scalar wire value as a string.
///
/// The gateway is loose about types: ids arrive as strings or numbers.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Command of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundCommand {
    /// Answer to a frame we sent.
    #[serde(rename = "Response")]
    Response,
    /// A pushed message or event.
    #[serde(rename = "PushOicqMsg")]
    PushMessage,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// A decoded inbound frame.
///
/// Only [`decode_frame`](crate::codec::decode_frame) builds these, so `data`
/// is never empty and `data[0]` is always the metadata segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundFrame {
    seq: i64,
    cmd: InboundCommand,
    data: Vec<WireSegment>,
}

impl InboundFrame {
    pub(crate) fn new(seq: i64, cmd: InboundCommand, data: Vec<WireSegment>) -> Self {
        debug_assert!(!data.is_empty());
        Self { seq, cmd, data }
    }

    /// Sequence number chosen by the gateway.
    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Frame command.
    pub fn cmd(&self) -> InboundCommand {
        self.cmd
    }

    /// All segments, metadata first.
    pub fn data(&self) -> &[WireSegment] {
        &self.data
    }

    /// The metadata segment, `data[0]`.
    pub fn metadata(&self) -> &WireSegment {
        &self.data[0]
    }

    /// The content segments, `data[1..]`.
    pub fn content(&self) -> &[WireSegment] {
        &self.data[1..]
    }

    /// Returns true if the metadata segment has `key`.
    pub fn has_meta(&self, key: &str) -> bool {
        self.metadata().contains_key(key)
    }

    /// Returns a metadata field rendered as a string.
    pub fn meta_string(&self, key: &str) -> Option<String> {
        self.metadata().get(key).and_then(scalar_to_string)
    }

    /// Every key of every segment, in frame order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.iter().flat_map(|seg| seg.keys().map(String::as_str))
    }

    /// Re-serializes the frame, for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// A `Response` frame whose `data` is an object.
///
/// The gateway answers the handshake and every `rsp: true` frame this way.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFrame {
    /// Sequence number of the frame being answered.
    pub seq: i64,
    /// Response body.
    pub data: Map<String, Value>,
}

impl ResponseFrame {
    /// The `status` flag of a handshake answer.
    pub fn status(&self) -> Option<bool> {
        self.data.get("status").and_then(Value::as_bool)
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Command of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundCommand {
    /// Send a chat message.
    #[serde(rename = "SendOicqMsg")]
    SendMessage,
    /// Bring the plugin online (handshake).
    #[serde(rename = "SyncOicq")]
    SyncOnline,
}

/// Plugin credentials carried by the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    pub pid: String,
    pub name: String,
    pub token: String,
}

/// Payload of an outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundData {
    /// Handshake body.
    Login(LoginCredentials),
    /// Message body: metadata segment followed by content segments.
    Segments(Vec<WireSegment>),
}

/// A frame ready to be sent.
///
/// `seq` is stamped by the session at send time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub seq: u64,
    pub cmd: OutboundCommand,
    pub rsp: bool,
    pub data: OutboundData,
}

impl OutboundFrame {
    /// Returns the segment list of a message frame.
    pub fn segments(&self) -> Option<&[WireSegment]> {
        match &self.data {
            OutboundData::Segments(segments) => Some(segments),
            OutboundData::Login(_) => None,
        }
    }
}
