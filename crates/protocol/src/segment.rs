//! Message segments: the tagged union that makes up a message array.
//!
//! Every segment round-trips through `{"type": T, "data": {...}}`. Decoding
//! looks `T` up in a dispatch table and populates the matching variant;
//! fields the variant does not know about are retained verbatim in an
//! `extra` map and re-emitted on encode, so a frame can pass through the
//! framework without loss even when the gateway grows new fields. Segment
//! types the table does not know at all are preserved as [`Segment::Other`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    Error, Result,
    error::Context,
    ids,
    message::MessageArray,
};

/// Unrecognized `data` fields, preserved for re-serialization.
pub type Extra = Map<String, Value>;

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Per-type payloads ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    #[serde(with = "ids::string_or_int")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Fields shared by every downloadable segment (image, record, video, file).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(flatten)]
    pub file: FileData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordData {
    #[serde(flatten)]
    pub file: FileData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    /// Target user id, or the literal `"all"` for an @everyone mention.
    #[serde(with = "ids::string_or_int")]
    pub qq: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl AtData {
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.qq == "all"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    #[serde(with = "ids::string_or_int")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One entry of a forward chain: either a reference to an existing message
/// (`id`) or an inline authored node (`user_id` + `nickname` + `content`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageArray>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A forwarded message bundle: a remote `id` reference, an inline list of
/// nodes, or both. Gateways routinely elide the content of large forwards;
/// anything unusable inside `content` is dropped rather than rejected, and
/// a fully elided list decodes to `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ForwardData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<NodeData>>,
}

impl ForwardData {
    /// Lenient decode from the segment's `data` object.
    #[must_use]
    pub fn from_value(data: &Value) -> Self {
        let id = data.get("id").and_then(id_to_string);

        let content = data.get("content").and_then(Value::as_array).map(|items| {
            items.iter().filter_map(Self::node_from_item).collect::<Vec<_>>()
        });
        let content = content.filter(|nodes| !nodes.is_empty());

        Self { id, content }
    }

    /// Decode one `content` entry. Entries arrive in three shapes: a bare
    /// node object, a `{"type": "node", "data": {...}}` segment, or a full
    /// message event (carrying `message` and `sender`).
    fn node_from_item(item: &Value) -> Option<NodeData> {
        let obj = item.as_object()?;

        if obj.contains_key("message") {
            let content = obj
                .get("message")
                .and_then(|m| MessageArray::from_value(m).ok());
            return Some(NodeData {
                id: None,
                user_id: obj.get("user_id").and_then(id_to_string),
                nickname: obj
                    .get("sender")
                    .and_then(|s| s.get("nickname"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                content,
                extra: Extra::new(),
            });
        }

        if obj.get("type").and_then(Value::as_str) == Some("node") {
            let data = obj.get("data")?;
            return serde_json::from_value(data.clone()).ok();
        }

        serde_json::from_value(item.clone()).ok()
    }
}

impl<'de> Deserialize<'de> for ForwardData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(with = "ids::lenient_f64")]
    pub lat: f64,
    #[serde(with = "ids::lenient_f64")]
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The wire calls the platform discriminator `type`, which collides with the
/// segment tag only in name: it lives inside `data` and maps to `platform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    #[serde(rename = "type")]
    pub platform: String,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonData {
    pub data: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownData {
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyData {
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PokeData {
    #[serde(default, rename = "type", with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactData {
    /// `qq` or `group`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "ids::string_or_int")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlData {
    pub data: String,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── The union ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(TextData),
    Face(FaceData),
    Image(ImageData),
    Record(RecordData),
    Video(FileData),
    File(FileData),
    At(AtData),
    Reply(ReplyData),
    Forward(ForwardData),
    Node(NodeData),
    Share(ShareData),
    Location(LocationData),
    Music(MusicData),
    Json(JsonData),
    Markdown(MarkdownData),
    Dice(EmptyData),
    Rps(EmptyData),
    Poke(PokeData),
    Anonymous(EmptyData),
    Contact(ContactData),
    Xml(XmlData),
    /// A segment type the dispatch table does not know; carried verbatim.
    Other { kind: String, data: Value },
}

impl Segment {
    /// The wire `type` tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Face(_) => "face",
            Self::Image(_) => "image",
            Self::Record(_) => "record",
            Self::Video(_) => "video",
            Self::File(_) => "file",
            Self::At(_) => "at",
            Self::Reply(_) => "reply",
            Self::Forward(_) => "forward",
            Self::Node(_) => "node",
            Self::Share(_) => "share",
            Self::Location(_) => "location",
            Self::Music(_) => "music",
            Self::Json(_) => "json",
            Self::Markdown(_) => "markdown",
            Self::Dice(_) => "dice",
            Self::Rps(_) => "rps",
            Self::Poke(_) => "poke",
            Self::Anonymous(_) => "anonymous",
            Self::Contact(_) => "contact",
            Self::Xml(_) => "xml",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Decode from a `{"type": T, "data": {...}}` value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().context("segment must be a JSON object")?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField { field: "type" })?;
        let data = obj
            .get("data")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        Ok(match kind {
            "text" => Self::Text(serde_json::from_value(data)?),
            "face" => Self::Face(serde_json::from_value(data)?),
            "image" => Self::Image(serde_json::from_value(data)?),
            "record" => Self::Record(serde_json::from_value(data)?),
            "video" => Self::Video(serde_json::from_value(data)?),
            "file" => Self::File(serde_json::from_value(data)?),
            "at" => Self::At(serde_json::from_value(data)?),
            "reply" => Self::Reply(serde_json::from_value(data)?),
            "forward" => Self::Forward(ForwardData::from_value(&data)),
            "node" => Self::Node(serde_json::from_value(data)?),
            "share" => Self::Share(serde_json::from_value(data)?),
            "location" => Self::Location(serde_json::from_value(data)?),
            "music" => Self::Music(serde_json::from_value(data)?),
            "json" => Self::Json(serde_json::from_value(data)?),
            "markdown" => Self::Markdown(serde_json::from_value(data)?),
            "dice" => Self::Dice(serde_json::from_value(data)?),
            "rps" => Self::Rps(serde_json::from_value(data)?),
            "poke" => Self::Poke(serde_json::from_value(data)?),
            "anonymous" => Self::Anonymous(serde_json::from_value(data)?),
            "contact" => Self::Contact(serde_json::from_value(data)?),
            "xml" => Self::Xml(serde_json::from_value(data)?),
            other => Self::Other {
                kind: other.to_string(),
                data,
            },
        })
    }

    // ── Builders for the common outbound segments ────────────────────────

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextData {
            text: text.into(),
            extra: Extra::new(),
        })
    }

    #[must_use]
    pub fn at(user_id: impl Into<String>) -> Self {
        Self::At(AtData {
            qq: user_id.into(),
            extra: Extra::new(),
        })
    }

    #[must_use]
    pub fn at_all() -> Self {
        Self::At(AtData {
            qq: "all".into(),
            extra: Extra::new(),
        })
    }

    #[must_use]
    pub fn reply(message_id: impl Into<String>) -> Self {
        Self::Reply(ReplyData {
            id: message_id.into(),
            extra: Extra::new(),
        })
    }

    #[must_use]
    pub fn face(id: impl Into<String>) -> Self {
        Self::Face(FaceData {
            id: id.into(),
            extra: Extra::new(),
        })
    }

    #[must_use]
    pub fn image(file: impl Into<String>) -> Self {
        Self::Image(ImageData {
            file: FileData {
                file: Some(file.into()),
                ..FileData::default()
            },
            sub_type: None,
        })
    }

    /// Text content, if this is a text segment.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, T: Serialize> {
            r#type: &'a str,
            data: &'a T,
        }

        macro_rules! tagged {
            ($name:literal, $data:expr) => {
                Tagged {
                    r#type: $name,
                    data: $data,
                }
                .serialize(serializer)
            };
        }

        match self {
            Self::Text(d) => tagged!("text", d),
            Self::Face(d) => tagged!("face", d),
            Self::Image(d) => tagged!("image", d),
            Self::Record(d) => tagged!("record", d),
            Self::Video(d) => tagged!("video", d),
            Self::File(d) => tagged!("file", d),
            Self::At(d) => tagged!("at", d),
            Self::Reply(d) => tagged!("reply", d),
            Self::Forward(d) => tagged!("forward", d),
            Self::Node(d) => tagged!("node", d),
            Self::Share(d) => tagged!("share", d),
            Self::Location(d) => tagged!("location", d),
            Self::Music(d) => tagged!("music", d),
            Self::Json(d) => tagged!("json", d),
            Self::Markdown(d) => tagged!("markdown", d),
            Self::Dice(d) => tagged!("dice", d),
            Self::Rps(d) => tagged!("rps", d),
            Self::Poke(d) => tagged!("poke", d),
            Self::Anonymous(d) => tagged!("anonymous", d),
            Self::Contact(d) => tagged!("contact", d),
            Self::Xml(d) => tagged!("xml", d),
            Self::Other { kind, data } => Tagged {
                r#type: kind,
                data,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}
