//! Schema-tagged JSON interchange.
//!
//! Every object is a JSON map carrying an `"OTIO_SCHEMA": "Name.version"`
//! label. Decoding resolves the label through a [`SchemaRegistry`], runs any
//! upgrade functions, then builds the typed object. Objects with a label the
//! registry does not know survive a round trip untouched as
//! [`UnknownSchema`].

pub mod decode;
pub mod encode;
mod registry;

pub use registry::{SchemaRegistry, UpgradeFn};

use serde_json::Value;

use crate::arena::Subtree;
use crate::collection::SerializableCollection;
use crate::effect::Effect;
use crate::error::Result;
use crate::marker::Marker;
use crate::media_reference::MediaReference;
use crate::timeline::Timeline;
use crate::Metadata;

/// Key holding the schema label of every encoded object.
pub const SCHEMA_KEY: &str = "OTIO_SCHEMA";

/// An object with a schema this registry does not know, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSchema {
    pub schema_name: String,
    pub schema_version: u32,
    /// Every field except the schema label, in document order.
    pub data: Metadata,
}

/// Any top-level object that can be written to or read from a document.
#[derive(Debug, Clone)]
pub enum SchemaObject {
    Timeline(Box<Timeline>),
    Collection(SerializableCollection),
    /// A clip, gap, transition, track or stack with everything below it.
    Composable(Subtree),
    MediaReference(MediaReference),
    Effect(Effect),
    Marker(Marker),
    Unknown(UnknownSchema),
}

impl SchemaObject {
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Timeline(_) => "Timeline",
            Self::Collection(_) => "SerializableCollection",
            Self::Composable(subtree) => subtree
                .root_value()
                .map_or("Composable", |value| value.schema_name()),
            Self::MediaReference(reference) => reference.schema_name(),
            Self::Effect(effect) => effect.schema_name(),
            Self::Marker(_) => "Marker",
            Self::Unknown(unknown) => &unknown.schema_name,
        }
    }
}

impl From<Timeline> for SchemaObject {
    fn from(value: Timeline) -> Self {
        Self::Timeline(Box::new(value))
    }
}

impl From<SerializableCollection> for SchemaObject {
    fn from(value: SerializableCollection) -> Self {
        Self::Collection(value)
    }
}

impl From<Subtree> for SchemaObject {
    fn from(value: Subtree) -> Self {
        Self::Composable(value)
    }
}

impl From<MediaReference> for SchemaObject {
    fn from(value: MediaReference) -> Self {
        Self::MediaReference(value)
    }
}

impl From<Effect> for SchemaObject {
    fn from(value: Effect) -> Self {
        Self::Effect(value)
    }
}

impl From<Marker> for SchemaObject {
    fn from(value: Marker) -> Self {
        Self::Marker(value)
    }
}

impl From<UnknownSchema> for SchemaObject {
    fn from(value: UnknownSchema) -> Self {
        Self::Unknown(value)
    }
}

/// Output formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Indent nested objects instead of writing one line.
    pub pretty: bool,
}

impl EncodeOptions {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Split `"Name.3"` into `("Name", 3)`.
pub(crate) fn split_label(label: &str) -> Option<(&str, u32)> {
    let (name, version) = label.rsplit_once('.')?;
    if name.is_empty() {
        return None;
    }
    Some((name, version.parse().ok()?))
}

pub(crate) fn value_to_string(value: &Value, options: EncodeOptions) -> Result<String> {
    let text = if options.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

pub fn to_json_value(object: &SchemaObject) -> Result<Value> {
    encode::object(object)
}

pub fn to_json_string(object: &SchemaObject, options: EncodeOptions) -> Result<String> {
    value_to_string(&to_json_value(object)?, options)
}

pub fn from_json_value(value: Value, registry: &SchemaRegistry) -> Result<SchemaObject> {
    decode::Decoder::new(registry).object(value)
}

pub fn from_json_str(input: &str, registry: &SchemaRegistry) -> Result<SchemaObject> {
    let value: Value = serde_json::from_str(input)?;
    from_json_value(value, registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("Clip.1"), Some(("Clip", 1)));
        assert_eq!(split_label("My.Custom.12"), Some(("My.Custom", 12)));
        assert_eq!(split_label("Clip"), None);
        assert_eq!(split_label("Clip.x"), None);
        assert_eq!(split_label(".1"), None);
    }

    #[test]
    fn test_schema_object_names() {
        let object = SchemaObject::from(Subtree::new(crate::item::Gap::default()));
        assert_eq!(object.schema_name(), "Gap");
        let unknown = SchemaObject::from(UnknownSchema {
            schema_name: "Widget".to_string(),
            schema_version: 4,
            data: Metadata::new(),
        });
        assert_eq!(unknown.schema_name(), "Widget");
    }
}
