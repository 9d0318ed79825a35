//! Message segment types.
//!
//! A segment is one unit of content: text, a mention, an image.
//!
//! ```rust,ignore
//! use secluded_adapter::Segment;
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::at("10001", "Alice");
//! let img = Segment::img("https://example.com/1.png");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use secluded_core::MessageSegment as MessageSegmentTrait;

/// A message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Text(TextData),
    /// Mention of one user.
    At(AtData),
    /// Mention of everyone in the group.
    AtAll,
    /// Static image.
    Img(ImageData),
    /// Animated image.
    Gif(ImageData),
    /// A segment kind the gateway has no wire form for.
    ///
    /// Kept so callers can carry it around; it is dropped when encoding.
    Custom(CustomData),
}

/// Text segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// Mention segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtData {
    pub user_id: String,
    pub user_name: String,
}

/// Image segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub url: String,
}

/// Custom segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Segment {
    /// Creates a mention segment.
    pub fn at(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Segment::At(AtData {
            user_id: user_id.into(),
            user_name: user_name.into(),
        })
    }

    /// Creates a mention-everyone segment.
    pub fn at_all() -> Self {
        Segment::AtAll
    }

    /// Creates a static image segment.
    pub fn img(url: impl Into<String>) -> Self {
        Segment::Img(ImageData { url: url.into() })
    }

    /// Creates an animated image segment.
    pub fn gif(url: impl Into<String>) -> Self {
        Segment::Gif(ImageData { url: url.into() })
    }

    /// Creates a custom segment.
    pub fn custom(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Segment::Custom(CustomData {
            kind: kind.into(),
            data,
        })
    }

    /// Returns true for both static and animated images.
    pub fn is_image(&self) -> bool {
        matches!(self, Segment::Img(_) | Segment::Gif(_))
    }

    /// Returns the mentioned user id, if this is a mention.
    pub fn mentioned_user(&self) -> Option<&str> {
        match self {
            Segment::At(data) => Some(&data.user_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Text(data) => f.write_str(&data.text),
            Segment::At(data) => write!(f, "@{}", data.user_name),
            Segment::AtAll => f.write_str("@全体成员"),
            Segment::Img(_) | Segment::Gif(_) | Segment::Custom(_) => Ok(()),
        }
    }
}

impl MessageSegmentTrait for Segment {
    fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    fn segment_type(&self) -> &str {
        match self {
            Segment::Text(_) => "text",
            Segment::At(_) => "at",
            Segment::AtAll => "at_all",
            Segment::Img(_) => "img",
            Segment::Gif(_) => "gif",
            Segment::Custom(data) => &data.kind,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
