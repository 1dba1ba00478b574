//! Ordered sequence of message segments.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Result, error::Context, segment::Segment};

/// A message as an ordered list of segments.
///
/// On ingest, consecutive text segments (with no extra fields) are fused
/// into one, which keeps downstream command parsing simple. All other
/// segments retain their original order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct MessageArray {
    segments: Vec<Segment>,
}

impl MessageArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded segments, fusing adjacent texts.
    #[must_use]
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut array = Self::new();
        for segment in segments {
            array.push(segment);
        }
        array
    }

    /// Decode from a raw JSON array of `{"type", "data"}` objects.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value.as_array().context("message must be a JSON array")?;
        let mut array = Self::new();
        for item in items {
            array.push(Segment::from_value(item)?);
        }
        Ok(array)
    }

    /// Append a segment, fusing into the previous text segment when both
    /// are plain texts.
    pub fn push(&mut self, segment: Segment) {
        if let Segment::Text(next) = &segment
            && next.extra.is_empty()
            && self.ends_in_plain_text()
        {
            if let Some(Segment::Text(prev)) = self.segments.last_mut() {
                prev.text.push_str(&next.text);
                return;
            }
        }
        self.segments.push(segment);
    }

    fn ends_in_plain_text(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Text(prev)) if prev.extra.is_empty())
    }

    // ── Chainable builders for outbound messages ─────────────────────────

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.push(Segment::text(text));
        self
    }

    #[must_use]
    pub fn at(mut self, user_id: impl Into<String>) -> Self {
        self.push(Segment::at(user_id));
        self
    }

    #[must_use]
    pub fn reply(mut self, message_id: impl Into<String>) -> Self {
        self.push(Segment::reply(message_id));
        self
    }

    #[must_use]
    pub fn image(mut self, file: impl Into<String>) -> Self {
        self.push(Segment::image(file));
        self
    }

    #[must_use]
    pub fn segment(mut self, segment: Segment) -> Self {
        self.push(segment);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenated content of all text segments.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.segments
            .iter()
            .filter_map(Segment::as_text)
            .collect()
    }

    /// Content of the first text segment, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.segments.iter().find_map(Segment::as_text)
    }

    /// True if any segment mentions the given user (or everyone).
    #[must_use]
    pub fn mentions(&self, user_id: &str) -> bool {
        self.segments.iter().any(|s| match s {
            Segment::At(at) => at.qq == user_id || at.is_all(),
            _ => false,
        })
    }
}

impl<'de> Deserialize<'de> for MessageArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let segments = Vec::<Segment>::deserialize(deserializer)?;
        Ok(Self::from_segments(segments))
    }
}

impl IntoIterator for MessageArray {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}
