//! Timeweave Timeline - editorial composition model
//!
//! Implements the structure of an edit and the time queries on it:
//! - Clips, gaps and transitions arranged in tracks and stacks
//! - Range, trim and coordinate-space queries across nested compositions
//! - Track trimming, transition expansion, tree filtering and stack flattening
//! - Schema-versioned JSON interchange

pub mod algorithms;
pub mod arena;
pub mod collection;
pub mod composable;
pub mod composition;
pub mod effect;
pub mod error;
pub mod item;
pub mod marker;
pub mod media_reference;
pub mod serialization;
pub mod stack;
pub mod timeline;
pub mod track;
pub mod transition;

/// Free-form, order-preserving key/value data attached to most objects.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub use algorithms::{
    filtered_items, flatten_stack, reduced_items, track_trimmed_to_range,
    track_with_expanded_transitions, ExpandedItem, FilterAction,
};
pub use arena::{Arena, NodeId, Subtree};
pub use collection::SerializableCollection;
pub use composable::{Composable, ComposableKind};
pub use composition::{Children, EachChild, RangeProvider};
pub use effect::{Effect, EffectKind};
pub use error::{Result, TimelineError};
pub use item::{Clip, Gap, Item};
pub use marker::{Marker, MarkerColor};
pub use media_reference::{ImageSequence, MediaReference, MediaReferenceKind, MissingFramePolicy};
pub use serialization::{
    from_json_str, from_json_value, to_json_string, to_json_value, EncodeOptions, SchemaObject,
    SchemaRegistry, UnknownSchema,
};
pub use stack::Stack;
pub use timeline::Timeline;
pub use track::{NeighborGapPolicy, Neighbor, Neighbors, Track, TrackKind};
pub use transition::{transition_types, Transition};
