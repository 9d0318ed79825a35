//! Message traits.
//!
//! - [`MessageSegment`]: A single unit of content (text, image, mention)
//! - [`Message`]: An ordered collection of segments

use std::fmt::Debug;

/// A single segment of a message.
///
/// A message segment is the smallest unit of content in a message.
/// It can be plain text, an image, a mention, etc.
pub trait MessageSegment: Debug + Clone + Send + Sync + 'static {
    /// Creates a plain text segment.
    fn text(text: impl Into<String>) -> Self;

    /// Returns the type identifier of this segment (e.g., "text", "img", "at").
    fn segment_type(&self) -> &str;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.segment_type() == "text"
    }

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;

    /// Returns a string representation suitable for display.
    fn display(&self) -> String;
}

/// A complete message composed of segments.
pub trait Message: Debug + Clone + Send + Sync + 'static {
    /// The segment type used by this message.
    type Segment: MessageSegment;

    /// Returns the segments in order.
    fn as_slice(&self) -> &[Self::Segment];

    /// Returns an iterator over the message segments.
    fn iter(&self) -> std::slice::Iter<'_, Self::Segment> {
        self.as_slice().iter()
    }

    /// Returns the number of segments in the message.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if the message has no segments.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenates the text content of all text segments.
    fn extract_plain_text(&self) -> String {
        self.iter().filter_map(|seg| seg.as_text()).collect()
    }

    /// Returns a display string representation of the entire message.
    fn display(&self) -> String {
        self.iter().map(MessageSegment::display).collect()
    }
}
