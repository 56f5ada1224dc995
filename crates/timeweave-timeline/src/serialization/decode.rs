//! JSON values to typed objects.

use serde::de::DeserializeOwned;
use serde_json::Value;
use timeweave_core::{ratio_from_f64, Rational64, RationalTime};
use tracing::warn;

use super::{split_label, SchemaObject, SchemaRegistry, UnknownSchema, SCHEMA_KEY};
use crate::arena::{Arena, NodeId, Subtree};
use crate::collection::SerializableCollection;
use crate::effect::{Effect, EffectKind};
use crate::error::{Result, TimelineError};
use crate::item::{Clip, Gap, Item};
use crate::marker::Marker;
use crate::media_reference::{ImageSequence, MediaReference, MediaReferenceKind};
use crate::stack::Stack;
use crate::timeline::Timeline;
use crate::track::{Track, TrackKind};
use crate::transition::{transition_types, Transition};
use crate::Metadata;

/// A labelled object whose schema the registry knows, already upgraded.
struct Fields {
    schema: String,
    data: Metadata,
}

enum Tagged {
    Known(Fields),
    Unknown(UnknownSchema),
}

impl Fields {
    fn malformed(&self, key: &str, reason: impl Into<String>) -> TimelineError {
        TimelineError::Malformed {
            field: format!("{}.{}", self.schema, key),
            reason: reason.into(),
        }
    }

    /// Remove `key`, treating `null` as absent.
    fn take(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key).filter(|v| !v.is_null())
    }

    fn string(&mut self, key: &str) -> Result<String> {
        match self.take(key) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.malformed(key, format!("expected a string, found {other}"))),
        }
    }

    fn bool_or(&mut self, key: &str, default: bool) -> Result<bool> {
        match self.take(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(b),
            Some(other) => Err(self.malformed(key, format!("expected a boolean, found {other}"))),
        }
    }

    fn i64_or(&mut self, key: &str, default: i64) -> Result<i64> {
        match self.take(key) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| self.malformed(key, format!("expected an integer, found {value}"))),
        }
    }

    fn ratio_or(&mut self, key: &str, default: i64) -> Result<Rational64> {
        match self.take(key) {
            None => Ok(Rational64::from_integer(default)),
            Some(value) => value
                .as_f64()
                .and_then(ratio_from_f64)
                .ok_or_else(|| self.malformed(key, format!("expected a finite number, found {value}"))),
        }
    }

    fn metadata(&mut self, key: &str) -> Result<Metadata> {
        match self.take(key) {
            None => Ok(Metadata::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(self.malformed(key, format!("expected an object, found {other}"))),
        }
    }

    fn array(&mut self, key: &str) -> Result<Vec<Value>> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.malformed(key, format!("expected an array, found {other}"))),
        }
    }

    fn parse<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| self.malformed(key, e.to_string())),
        }
    }
}

/// Builds typed objects from JSON using one registry.
pub struct Decoder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    fn tagged(&self, value: Value, field: &str) -> Result<Tagged> {
        let malformed = |reason: String| TimelineError::Malformed {
            field: field.to_string(),
            reason,
        };
        let map = match value {
            Value::Object(map) => map,
            other => return Err(malformed(format!("expected a schema object, found {other}"))),
        };

        // Rebuilt rather than removed from, so the remaining keys keep their order.
        let mut label = None;
        let mut data = Metadata::new();
        for (key, value) in map {
            if key == SCHEMA_KEY {
                label = Some(value);
            } else {
                data.insert(key, value);
            }
        }
        let label = match label {
            Some(Value::String(label)) => label,
            _ => return Err(malformed(format!("missing {SCHEMA_KEY} label"))),
        };
        let (name, version) =
            split_label(&label).ok_or_else(|| malformed(format!("bad schema label '{label}'")))?;

        match self.registry.resolve(name) {
            Some(schema) => {
                self.registry.upgrade(schema, version, &mut data)?;
                Ok(Tagged::Known(Fields {
                    schema: schema.to_string(),
                    data,
                }))
            }
            None => {
                warn!(schema = name, version, "preserving unknown schema");
                Ok(Tagged::Unknown(UnknownSchema {
                    schema_name: name.to_string(),
                    schema_version: version,
                    data,
                }))
            }
        }
    }

    /// Like `tagged`, for positions that need a typed object.
    fn known(&self, value: Value, field: &str) -> Result<Fields> {
        match self.tagged(value, field)? {
            Tagged::Known(fields) => Ok(fields),
            Tagged::Unknown(unknown) => Err(TimelineError::NotSupported(unknown.schema_name)),
        }
    }

    /// Decode any top-level object.
    pub fn object(&self, value: Value) -> Result<SchemaObject> {
        let fields = match self.tagged(value, "document")? {
            Tagged::Known(fields) => fields,
            Tagged::Unknown(unknown) => return Ok(SchemaObject::Unknown(unknown)),
        };

        Ok(match fields.schema.as_str() {
            "Timeline" => SchemaObject::Timeline(Box::new(self.timeline(fields)?)),
            "SerializableCollection" => SchemaObject::Collection(self.collection(fields)?),
            "Clip" | "Gap" | "Transition" | "Track" | "Stack" => {
                let mut arena = Arena::new();
                let root = self.composable_fields(&mut arena, fields)?;
                SchemaObject::Composable(Subtree { arena, root })
            }
            "Marker" => SchemaObject::Marker(self.marker_fields(fields)?),
            "Effect" | "TimeEffect" | "LinearTimeWarp" | "FreezeFrame" => {
                SchemaObject::Effect(self.effect_fields(fields)?)
            }
            "ExternalReference" | "GeneratorReference" | "ImageSequenceReference"
            | "MissingReference" => SchemaObject::MediaReference(self.media_reference_fields(fields)?),
            other => {
                // Registered by the caller, but with no typed form here.
                let schema_version = self.registry.current_version(other).unwrap_or_default();
                warn!(schema = other, "preserving schema without a typed form");
                SchemaObject::Unknown(UnknownSchema {
                    schema_name: fields.schema,
                    schema_version,
                    data: fields.data,
                })
            }
        })
    }

    fn timeline(&self, mut fields: Fields) -> Result<Timeline> {
        let name = fields.string("name")?;
        let metadata = fields.metadata("metadata")?;
        let global_start_time = fields.parse::<RationalTime>("global_start_time")?;

        let mut timeline = match fields.take("tracks") {
            Some(value) => {
                let mut arena = Arena::new();
                let root = self.composable(&mut arena, value, "Timeline.tracks")?;
                Timeline::with_tracks(name, Subtree { arena, root })?
            }
            None => Timeline::new(name),
        };
        timeline.metadata = metadata;
        timeline.global_start_time = global_start_time;
        Ok(timeline)
    }

    fn collection(&self, mut fields: Fields) -> Result<SerializableCollection> {
        let mut collection = SerializableCollection::new(fields.string("name")?);
        collection.metadata = fields.metadata("metadata")?;
        for child in fields.array("children")? {
            collection.children.push(self.object(child)?);
        }
        Ok(collection)
    }

    /// Decode a composable and its descendants into `arena`.
    pub fn composable(&self, arena: &mut Arena, value: Value, field: &str) -> Result<NodeId> {
        let fields = self.known(value, field)?;
        self.composable_fields(arena, fields)
    }

    fn item(&self, fields: &mut Fields) -> Result<Item> {
        let mut effects = Vec::new();
        for value in fields.array("effects")? {
            effects.push(self.effect(value)?);
        }
        let mut markers = Vec::new();
        for value in fields.array("markers")? {
            markers.push(self.marker(value)?);
        }
        Ok(Item {
            name: fields.string("name")?,
            source_range: fields.parse("source_range")?,
            effects,
            markers,
            metadata: fields.metadata("metadata")?,
            enabled: fields.bool_or("enabled", true)?,
        })
    }

    fn composable_fields(&self, arena: &mut Arena, mut fields: Fields) -> Result<NodeId> {
        match fields.schema.as_str() {
            "Clip" => {
                let item = self.item(&mut fields)?;
                let media_reference = match fields.take("media_reference") {
                    Some(value) => self.media_reference(value)?,
                    None => MediaReference::missing(),
                };
                Ok(arena.add(Clip {
                    item,
                    media_reference,
                }))
            }
            "Gap" => {
                let item = self.item(&mut fields)?;
                Ok(arena.add(Gap { item }))
            }
            "Transition" => {
                let mut transition_type = fields.string("transition_type")?;
                if transition_type.is_empty() {
                    transition_type = transition_types::SMPTE_DISSOLVE.to_string();
                }
                let transition = Transition {
                    name: fields.string("name")?,
                    metadata: fields.metadata("metadata")?,
                    transition_type,
                    in_offset: fields.parse("in_offset")?.unwrap_or(RationalTime::ZERO),
                    out_offset: fields.parse("out_offset")?.unwrap_or(RationalTime::ZERO),
                };
                Ok(arena.add(transition))
            }
            "Track" => {
                let item = self.item(&mut fields)?;
                let kind = match fields.string("kind")? {
                    kind if kind.is_empty() => TrackKind::default(),
                    kind => TrackKind::from(kind.as_str()),
                };
                let children = fields.array("children")?;
                let track = arena.add(Track {
                    item,
                    kind,
                    ..Default::default()
                });
                self.children_into(arena, track, children, "Track.children")?;
                Ok(track)
            }
            "Stack" => {
                let item = self.item(&mut fields)?;
                let children = fields.array("children")?;
                let stack = arena.add(Stack {
                    item,
                    ..Default::default()
                });
                self.children_into(arena, stack, children, "Stack.children")?;
                Ok(stack)
            }
            other => Err(TimelineError::TypeMismatch {
                expected: "Composable".to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn children_into(
        &self,
        arena: &mut Arena,
        parent: NodeId,
        children: Vec<Value>,
        field: &str,
    ) -> Result<()> {
        for value in children {
            let child = self.composable(arena, value, field)?;
            arena.append_child(parent, child)?;
        }
        Ok(())
    }

    pub fn marker(&self, value: Value) -> Result<Marker> {
        let fields = self.known(value, "Item.markers")?;
        self.marker_fields(fields)
    }

    fn marker_fields(&self, mut fields: Fields) -> Result<Marker> {
        if fields.schema != "Marker" {
            return Err(TimelineError::TypeMismatch {
                expected: "Marker".to_string(),
                found: fields.schema,
            });
        }
        Ok(Marker {
            name: fields.string("name")?,
            marked_range: fields.parse("marked_range")?.unwrap_or_default(),
            color: fields.parse("color")?.unwrap_or_default(),
            metadata: fields.metadata("metadata")?,
        })
    }

    pub fn effect(&self, value: Value) -> Result<Effect> {
        let fields = self.known(value, "Item.effects")?;
        self.effect_fields(fields)
    }

    fn effect_fields(&self, mut fields: Fields) -> Result<Effect> {
        let kind = match fields.schema.as_str() {
            "Effect" => EffectKind::Effect,
            "TimeEffect" => EffectKind::TimeEffect,
            "LinearTimeWarp" => EffectKind::LinearTimeWarp {
                time_scalar: fields.ratio_or("time_scalar", 1)?,
            },
            "FreezeFrame" => EffectKind::FreezeFrame,
            other => {
                return Err(TimelineError::TypeMismatch {
                    expected: "Effect".to_string(),
                    found: other.to_string(),
                })
            }
        };
        Ok(Effect {
            name: fields.string("name")?,
            effect_name: fields.string("effect_name")?,
            metadata: fields.metadata("metadata")?,
            kind,
        })
    }

    pub fn media_reference(&self, value: Value) -> Result<MediaReference> {
        let fields = self.known(value, "Clip.media_reference")?;
        self.media_reference_fields(fields)
    }

    fn media_reference_fields(&self, mut fields: Fields) -> Result<MediaReference> {
        let kind = match fields.schema.as_str() {
            "ExternalReference" => MediaReferenceKind::External {
                target_url: fields.string("target_url")?,
            },
            "GeneratorReference" => MediaReferenceKind::Generator {
                generator_kind: fields.string("generator_kind")?,
                parameters: fields.metadata("parameters")?,
            },
            "ImageSequenceReference" => {
                let defaults = ImageSequence::default();
                let padding = fields.i64_or("frame_zero_padding", 0)?;
                let frame_zero_padding = usize::try_from(padding)
                    .map_err(|_| fields.malformed("frame_zero_padding", "must not be negative"))?;
                MediaReferenceKind::ImageSequence(ImageSequence {
                    target_url_base: fields.string("target_url_base")?,
                    name_prefix: fields.string("name_prefix")?,
                    name_suffix: fields.string("name_suffix")?,
                    start_frame: fields.i64_or("start_frame", defaults.start_frame)?,
                    frame_step: fields.i64_or("frame_step", defaults.frame_step)?,
                    rate: fields.ratio_or("rate", 1)?,
                    frame_zero_padding,
                    missing_frame_policy: fields
                        .parse("missing_frame_policy")?
                        .unwrap_or_default(),
                })
            }
            "MissingReference" => MediaReferenceKind::Missing,
            other => {
                return Err(TimelineError::TypeMismatch {
                    expected: "MediaReference".to_string(),
                    found: other.to_string(),
                })
            }
        };
        Ok(MediaReference {
            name: fields.string("name")?,
            available_range: fields.parse("available_range")?,
            metadata: fields.metadata("metadata")?,
            kind,
        })
    }
}
