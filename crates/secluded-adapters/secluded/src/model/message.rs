//! Message type: an ordered list of segments.

use serde::{Deserialize, Serialize};

use secluded_core::{Message, MessageSegment as _};

use super::segment::Segment;

/// A message made of [`Segment`]s.
///
/// Anything that reasonably denotes a message converts into one, so send
/// paths can take `impl Into<SecludedMessage>`:
///
/// ```rust,ignore
/// bot.reply(&event, "plain text", false).await?;
/// bot.reply(&event, Segment::img(url), false).await?;
/// bot.reply(&event, vec![Segment::at(uid, name), Segment::text(" hi")], true).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecludedMessage(Vec<Segment>);

impl SecludedMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, segment: Segment) -> Self {
        self.push(segment);
        self
    }

    /// Consumes the message, returning its segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.0
    }
}

impl Message for SecludedMessage {
    type Segment = Segment;

    fn as_slice(&self) -> &[Segment] {
        &self.0
    }
}

impl std::fmt::Display for SecludedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<Segment>> for SecludedMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<Segment> for SecludedMessage {
    fn from(segment: Segment) -> Self {
        Self(vec![segment])
    }
}

impl From<&str> for SecludedMessage {
    fn from(text: &str) -> Self {
        Segment::text(text).into()
    }
}

impl From<String> for SecludedMessage {
    fn from(text: String) -> Self {
        Segment::text(text).into()
    }
}

impl FromIterator<Segment> for SecludedMessage {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SecludedMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SecludedMessage {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_skips_non_text() {
        let message: SecludedMessage = vec![
            Segment::text("a"),
            Segment::at("1", "Bob"),
            Segment::img("u"),
            Segment::text("b"),
        ]
        .into();

        assert_eq!(message.len(), 4);
        assert_eq!(message.extract_plain_text(), "ab");
        assert_eq!(message.to_string(), "a@Bobb");
    }

    #[test]
    fn test_conversions() {
        let message = SecludedMessage::from("hi");
        assert_eq!(message.as_slice(), &[Segment::text("hi")]);

        let built = SecludedMessage::new().with(Segment::at_all());
        assert!(!built.is_empty());
        assert_eq!(built.into_segments(), vec![Segment::AtAll]);
    }
}
