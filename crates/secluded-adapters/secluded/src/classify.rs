//! Event classification.
//!
//! A frame's category is decided by the field names it carries, collected
//! across every segment including the metadata one. Categories are tried in
//! the fixed order of [`CATEGORY_KEYS`]; the first whose key set intersects
//! the frame wins. The sub-kind within a category is then read from the
//! metadata segment alone.

use secluded_core::{EventType, MessageSegment as _};
use serde_json::Value;
use tracing::trace;

use crate::error::ClassifyError;
use crate::model::event::{
    Description, DescriptionKind, MessageEvent, MetaEvent, NoticeEvent, OtherEvent, RequestEvent,
    SecludedEvent,
};
use crate::model::message::SecludedMessage;
use crate::model::segment::Segment;
use crate::model::wire::{InboundFrame, WireSegment, keys, scalar_to_string};

/// Category key sets, in priority order.
pub const CATEGORY_KEYS: &[(EventType, &[&str])] = &[
    (
        EventType::Message,
        &[
            "AtAll",
            "AtUin",
            "AtName",
            "Gif",
            "Img",
            "Text",
            "Audio",
            "Video",
            "GroupFileUpload",
        ],
    ),
    (EventType::Request, &["NewFriendNotify", "GroupNotify"]),
    (
        EventType::Notice,
        &[
            "GroupNewMember",
            "GroupMemberSignout",
            "GroupMemberNickModify",
            // the gateway has shipped this misspelling
            "GroupMemverNickModify",
            "GroupModifyAdmin",
            "GroupModifyNickModify",
            "GroupProhibitAll",
            "GroupProhibitMember",
            "GroupBeatABeat",
            "GroupEssence",
            "GroupDissolut",
        ],
    ),
    (
        EventType::Meta,
        &[
            "Heartbeat",
            "Heartbeating",
            "Offline",
            "Goline",
            "GolineWindows",
            "OfflineWindows",
            "System",
            "Online",
        ],
    ),
];

/// Outcome of [`categorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A chat message.
    Message,
    /// A request of a known sub-kind.
    Request(DescriptionKind),
    /// A notice of a known sub-kind.
    Notice(DescriptionKind),
    /// A meta event of a known sub-kind.
    Meta(DescriptionKind),
    /// The category matched but no sub-kind did.
    Unmatched(EventType),
    /// No category matched.
    Other,
}

/// Returns the category a frame belongs to, with its sub-kind.
pub fn categorize(frame: &InboundFrame) -> Classification {
    let category = CATEGORY_KEYS
        .iter()
        .find(|(_, set)| frame.keys().any(|key| set.contains(&key)))
        .map(|(event_type, _)| *event_type);

    let sub_kind = |candidates: &[(&str, DescriptionKind)]| {
        candidates
            .iter()
            .find(|(key, _)| frame.has_meta(key))
            .map(|(_, kind)| *kind)
    };

    match category {
        None => Classification::Other,
        Some(EventType::Message) => Classification::Message,
        Some(EventType::Request) => sub_kind(&[
            (keys::GROUP_NOTIFY, DescriptionKind::GroupNewMemberRequest),
            (keys::NEW_FRIEND_NOTIFY, DescriptionKind::NewFriendRequest),
        ])
        .map_or(Classification::Unmatched(EventType::Request), Classification::Request),
        Some(EventType::Notice) => sub_kind(&[
            (keys::GROUP_NEW_MEMBER, DescriptionKind::GroupNewMember),
            (keys::GROUP_MEMBER_SIGNOUT, DescriptionKind::GroupMemberSignout),
        ])
        .map_or(Classification::Unmatched(EventType::Notice), Classification::Notice),
        Some(EventType::Meta) => sub_kind(&[(keys::HEARTBEAT, DescriptionKind::Heartbeat)])
            .map_or(Classification::Unmatched(EventType::Meta), Classification::Meta),
        Some(other) => Classification::Unmatched(other),
    }
}

/// Turns a frame into a domain event.
///
/// Returns `Ok(None)` when the frame's category matched but none of its
/// sub-kinds did; callers decide what that becomes.
pub fn classify(frame: &InboundFrame) -> Result<Option<SecludedEvent>, ClassifyError> {
    if frame.metadata().is_empty() {
        return Err(ClassifyError::EmptyMetadata);
    }
    let account_id = required(frame.metadata(), keys::ACCOUNT)?;

    let event = match categorize(frame) {
        Classification::Message => SecludedEvent::Message(message_event(frame, account_id)?),
        Classification::Request(kind) => {
            SecludedEvent::Request(RequestEvent::new(account_id, user_description(frame, kind)?))
        }
        Classification::Notice(kind) => {
            SecludedEvent::Notice(NoticeEvent::new(account_id, user_description(frame, kind)?))
        }
        Classification::Meta(kind) => {
            SecludedEvent::Meta(MetaEvent::new(account_id, Description::bare(kind)))
        }
        Classification::Other => SecludedEvent::Other(OtherEvent::empty(account_id)),
        Classification::Unmatched(event_type) => {
            trace!(%event_type, "No sub-kind matched");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn message_event(frame: &InboundFrame, account_id: String) -> Result<MessageEvent, ClassifyError> {
    let meta = frame.metadata();

    let (group_id, group_name) = if frame.has_meta(keys::GROUP) {
        (
            Some(required(meta, keys::GROUP_ID)?),
            optional(meta, keys::GROUP_NAME)?,
        )
    } else {
        (None, None)
    };

    let message = frame
        .content()
        .iter()
        .filter_map(|seg| content_segment(seg).transpose())
        .collect::<Result<SecludedMessage, _>>()?;

    Ok(MessageEvent {
        account_id,
        user_id: required(meta, keys::UIN)?,
        user_name: required(meta, keys::UIN_NAME)?,
        user_group_name: optional(meta, keys::OP_NAME)?,
        group_id,
        group_name,
        msg_id: optional(meta, keys::MSG_ID)?,
        message,
    })
}

/// Converts one content segment. Only its first key is inspected.
fn content_segment(seg: &WireSegment) -> Result<Option<Segment>, ClassifyError> {
    let Some((key, value)) = seg.iter().next() else {
        return Ok(None);
    };
    let segment = match key.as_str() {
        keys::TEXT => Segment::text(scalar(key, value)?),
        keys::AT_NAME => Segment::at(required(seg, keys::AT_UIN)?, scalar(key, value)?),
        keys::AT_ALL => Segment::at_all(),
        keys::IMG => Segment::img(scalar(key, value)?),
        keys::GIF => Segment::gif(scalar(key, value)?),
        _ => {
            trace!(key = %key, "Ignoring content segment");
            return Ok(None);
        }
    };
    Ok(Some(segment))
}

fn user_description(frame: &InboundFrame, kind: DescriptionKind) -> Result<Description, ClassifyError> {
    let meta = frame.metadata();
    Ok(Description::with_user(
        kind,
        required(meta, keys::UIN)?,
        required(meta, keys::UIN_NAME)?,
    ))
}

fn scalar(key: &str, value: &Value) -> Result<String, ClassifyError> {
    scalar_to_string(value).ok_or_else(|| ClassifyError::TypeMismatch(key.to_string()))
}

fn required(seg: &WireSegment, key: &'static str) -> Result<String, ClassifyError> {
    match seg.get(key) {
        Some(value) => scalar(key, value),
        None => Err(ClassifyError::MissingField(key)),
    }
}

fn optional(seg: &WireSegment, key: &str) -> Result<Option<String>, ClassifyError> {
    match seg.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar(key, value).map(Some),
    }
}

// ============================================================================
// Tests
// ============================================================================
