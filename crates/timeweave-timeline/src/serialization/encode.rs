//! Typed objects to JSON values.

use serde::Serialize;
use serde_json::Value;
use timeweave_core::ratio_to_f64;

use super::{SchemaObject, UnknownSchema, SCHEMA_KEY};
use crate::arena::{Arena, NodeId};
use crate::collection::SerializableCollection;
use crate::composable::Composable;
use crate::effect::{Effect, EffectKind};
use crate::error::Result;
use crate::item::Item;
use crate::marker::Marker;
use crate::media_reference::{MediaReference, MediaReferenceKind};
use crate::timeline::Timeline;
use crate::Metadata;

fn header(schema: &str, version: u32, metadata: &Metadata, name: &str) -> Metadata {
    let mut map = Metadata::new();
    map.insert(SCHEMA_KEY.to_string(), Value::String(format!("{schema}.{version}")));
    map.insert("metadata".to_string(), Value::Object(metadata.clone()));
    map.insert("name".to_string(), Value::String(name.to_string()));
    map
}

fn put(map: &mut Metadata, key: &str, value: impl Serialize) -> Result<()> {
    map.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

pub fn object(object: &SchemaObject) -> Result<Value> {
    match object {
        SchemaObject::Timeline(timeline) => self::timeline(timeline),
        SchemaObject::Collection(collection) => self::collection(collection),
        SchemaObject::Composable(subtree) => composable(&subtree.arena, subtree.root),
        SchemaObject::MediaReference(reference) => media_reference(reference),
        SchemaObject::Effect(effect) => self::effect(effect),
        SchemaObject::Marker(marker) => self::marker(marker),
        SchemaObject::Unknown(unknown) => Ok(self::unknown(unknown)),
    }
}

pub fn timeline(timeline: &Timeline) -> Result<Value> {
    let mut map = header("Timeline", 1, &timeline.metadata, &timeline.name);
    put(&mut map, "global_start_time", timeline.global_start_time)?;
    map.insert(
        "tracks".to_string(),
        composable(timeline.arena(), timeline.tracks())?,
    );
    Ok(Value::Object(map))
}

pub fn collection(collection: &SerializableCollection) -> Result<Value> {
    let mut map = header(
        "SerializableCollection",
        1,
        &collection.metadata,
        &collection.name,
    );
    let children = collection
        .children
        .iter()
        .map(object)
        .collect::<Result<Vec<_>>>()?;
    map.insert("children".to_string(), Value::Array(children));
    Ok(Value::Object(map))
}

fn item_fields(map: &mut Metadata, item: &Item) -> Result<()> {
    put(map, "source_range", item.source_range)?;
    let effects = item.effects.iter().map(effect).collect::<Result<Vec<_>>>()?;
    map.insert("effects".to_string(), Value::Array(effects));
    let markers = item.markers.iter().map(marker).collect::<Result<Vec<_>>>()?;
    map.insert("markers".to_string(), Value::Array(markers));
    map.insert("enabled".to_string(), Value::Bool(item.enabled));
    Ok(())
}

fn children(arena: &Arena, id: NodeId) -> Result<Value> {
    let encoded = arena
        .children(id)?
        .iter()
        .map(|child| composable(arena, *child))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(encoded))
}

/// Encode `id` and everything below it.
pub fn composable(arena: &Arena, id: NodeId) -> Result<Value> {
    let value = arena.get(id)?;
    let schema = value.schema_name();
    let version = value.schema_version();

    let map = match value {
        Composable::Transition(transition) => {
            let mut map = header(schema, version, &transition.metadata, &transition.name);
            put(&mut map, "in_offset", transition.in_offset)?;
            put(&mut map, "out_offset", transition.out_offset)?;
            put(&mut map, "transition_type", &transition.transition_type)?;
            map
        }
        Composable::Clip(clip) => {
            let mut map = header(schema, version, &clip.item.metadata, &clip.item.name);
            item_fields(&mut map, &clip.item)?;
            map.insert(
                "media_reference".to_string(),
                media_reference(&clip.media_reference)?,
            );
            map
        }
        Composable::Gap(gap) => {
            let mut map = header(schema, version, &gap.item.metadata, &gap.item.name);
            item_fields(&mut map, &gap.item)?;
            map
        }
        Composable::Track(track) => {
            let mut map = header(schema, version, &track.item.metadata, &track.item.name);
            item_fields(&mut map, &track.item)?;
            map.insert("children".to_string(), children(arena, id)?);
            put(&mut map, "kind", track.kind.as_str())?;
            map
        }
        Composable::Stack(stack) => {
            let mut map = header(schema, version, &stack.item.metadata, &stack.item.name);
            item_fields(&mut map, &stack.item)?;
            map.insert("children".to_string(), children(arena, id)?);
            map
        }
    };
    Ok(Value::Object(map))
}

pub fn marker(marker: &Marker) -> Result<Value> {
    let mut map = header("Marker", 2, &marker.metadata, &marker.name);
    put(&mut map, "color", marker.color)?;
    put(&mut map, "marked_range", marker.marked_range)?;
    Ok(Value::Object(map))
}

pub fn effect(effect: &Effect) -> Result<Value> {
    let mut map = header(effect.schema_name(), 1, &effect.metadata, &effect.name);
    put(&mut map, "effect_name", &effect.effect_name)?;
    match effect.kind {
        EffectKind::LinearTimeWarp { time_scalar } => {
            map.insert("time_scalar".to_string(), Value::from(ratio_to_f64(time_scalar)));
        }
        EffectKind::FreezeFrame => {
            map.insert("time_scalar".to_string(), Value::from(0.0));
        }
        EffectKind::Effect | EffectKind::TimeEffect => {}
    }
    Ok(Value::Object(map))
}

pub fn media_reference(reference: &MediaReference) -> Result<Value> {
    let mut map = header(reference.schema_name(), 1, &reference.metadata, &reference.name);
    put(&mut map, "available_range", reference.available_range)?;

    match &reference.kind {
        MediaReferenceKind::External { target_url } => {
            put(&mut map, "target_url", target_url)?;
        }
        MediaReferenceKind::Generator {
            generator_kind,
            parameters,
        } => {
            put(&mut map, "generator_kind", generator_kind)?;
            map.insert("parameters".to_string(), Value::Object(parameters.clone()));
        }
        MediaReferenceKind::ImageSequence(seq) => {
            put(&mut map, "target_url_base", &seq.target_url_base)?;
            put(&mut map, "name_prefix", &seq.name_prefix)?;
            put(&mut map, "name_suffix", &seq.name_suffix)?;
            put(&mut map, "start_frame", seq.start_frame)?;
            put(&mut map, "frame_step", seq.frame_step)?;
            map.insert("rate".to_string(), Value::from(ratio_to_f64(seq.rate)));
            put(&mut map, "frame_zero_padding", seq.frame_zero_padding)?;
            put(&mut map, "missing_frame_policy", seq.missing_frame_policy)?;
        }
        MediaReferenceKind::Missing => {}
    }
    Ok(Value::Object(map))
}

/// Write an unknown object back exactly as it was read.
pub fn unknown(unknown: &UnknownSchema) -> Value {
    let mut map = Metadata::new();
    map.insert(
        SCHEMA_KEY.to_string(),
        Value::String(format!("{}.{}", unknown.schema_name, unknown.schema_version)),
    );
    map.extend(unknown.data.clone());
    Value::Object(map)
}
