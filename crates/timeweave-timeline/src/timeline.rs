//! The top-level editorial document.

use timeweave_core::{RationalTime, TimeRange};

use crate::algorithms::{self, FilterAction};
use crate::arena::{Arena, NodeId, Subtree};
use crate::composable::{Composable, ComposableKind};
use crate::composition::EachChild;
use crate::error::{Result, TimelineError};
use crate::serialization::{self, EncodeOptions, SchemaObject, SchemaRegistry};
use crate::stack::Stack;
use crate::track::{Track, TrackKind};
use crate::Metadata;

/// A named stack of tracks plus the arena that owns every node in it.
///
/// Cloning a timeline deep-copies its arena; node ids taken from the
/// original stay valid in the clone.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub name: String,
    /// Where the timeline starts on an external clock, if anywhere.
    pub global_start_time: Option<RationalTime>,
    pub metadata: Metadata,
    arena: Arena,
    tracks: NodeId,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new(name: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let tracks = arena.add(Stack::new("tracks"));
        Self {
            name: name.into(),
            global_start_time: None,
            metadata: Metadata::new(),
            arena,
            tracks,
        }
    }

    /// Build a timeline around an existing stack of tracks.
    pub fn with_tracks(name: impl Into<String>, tracks: Subtree) -> Result<Self> {
        let root = tracks.root_value()?;
        if !matches!(root, Composable::Stack(_)) {
            return Err(TimelineError::TypeMismatch {
                expected: "Stack".to_string(),
                found: root.schema_name().to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            global_start_time: None,
            metadata: Metadata::new(),
            arena: tracks.arena,
            tracks: tracks.root,
        })
    }

    /// The root stack.
    pub fn tracks(&self) -> NodeId {
        self.tracks
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Add a track on top of the existing ones.
    pub fn append_track(&mut self, track: Track) -> Result<NodeId> {
        let id = self.arena.add(track);
        self.arena.append_child(self.tracks, id)?;
        Ok(id)
    }

    pub fn duration(&self) -> Result<RationalTime> {
        self.arena.duration(self.tracks)
    }

    /// Range of any node of the timeline in the time of the root stack.
    pub fn range_of_child(&self, child: NodeId) -> Result<TimeRange> {
        self.arena.range_of_child(self.tracks, child, None)
    }

    pub fn each_child(
        &self,
        search_range: Option<TimeRange>,
        kind: Option<ComposableKind>,
        shallow: bool,
    ) -> Result<EachChild<'_>> {
        self.arena.each_child(self.tracks, search_range, kind, shallow)
    }

    pub fn each_clip(&self, search_range: Option<TimeRange>) -> Result<EachChild<'_>> {
        self.arena.each_clip(self.tracks, search_range)
    }

    /// Direct tracks of the root stack with kind `Video`. Nested stacks are
    /// not searched.
    pub fn video_tracks(&self) -> Result<Vec<NodeId>> {
        self.tracks_of_kind(&TrackKind::Video)
    }

    /// Direct tracks of the root stack with kind `Audio`.
    pub fn audio_tracks(&self) -> Result<Vec<NodeId>> {
        self.tracks_of_kind(&TrackKind::Audio)
    }

    fn tracks_of_kind(&self, kind: &TrackKind) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        for &child in self.arena.children(self.tracks)? {
            if self.arena.get(child)?.as_track().is_some_and(|t| &t.kind == kind) {
                found.push(child);
            }
        }
        Ok(found)
    }

    /// A new timeline whose tracks went through [`algorithms::filtered_items`].
    pub fn filtered_items<F>(&self, filter: F) -> Result<Timeline>
    where
        F: FnMut(&mut Composable) -> FilterAction,
    {
        self.with_rebuilt_tracks(|arena, root| algorithms::filtered_items(arena, root, filter))
    }

    /// A new timeline whose tracks went through [`algorithms::reduced_items`].
    pub fn reduced_items<F>(&self, reduce: F) -> Result<Timeline>
    where
        F: FnMut(Option<&Composable>, &mut Composable, Option<&Composable>) -> FilterAction,
    {
        self.with_rebuilt_tracks(|arena, root| algorithms::reduced_items(arena, root, reduce))
    }

    /// Run `rebuild` on a private copy of the tracks. A single stack that
    /// comes back becomes the new root; anything else is placed in a fresh
    /// empty stack.
    fn with_rebuilt_tracks(
        &self,
        rebuild: impl FnOnce(&mut Arena, NodeId) -> Result<Vec<NodeId>>,
    ) -> Result<Timeline> {
        let mut work = self.arena.extract(self.tracks)?;
        let kept = rebuild(&mut work.arena, work.root)?;
        let tracks = match kept.as_slice() {
            [root] if work.arena.get(*root)?.as_stack().is_some() => work.arena.extract(*root)?,
            _ => {
                let stack = work.arena.add(Stack::new("tracks"));
                for id in kept {
                    work.arena.append_child(stack, id)?;
                }
                work.arena.extract(stack)?
            }
        };

        let mut result = Timeline::with_tracks(self.name.clone(), tracks)?;
        result.global_start_time = self.global_start_time;
        result.metadata = self.metadata.clone();
        Ok(result)
    }

    pub fn to_json_string(&self, options: EncodeOptions) -> Result<String> {
        let value = serialization::encode::timeline(self)?;
        serialization::value_to_string(&value, options)
    }

    /// Decode a document whose root must be a timeline.
    pub fn from_json_str(input: &str, registry: &SchemaRegistry) -> Result<Self> {
        match serialization::from_json_str(input, registry)? {
            SchemaObject::Timeline(timeline) => Ok(*timeline),
            other => Err(TimelineError::TypeMismatch {
                expected: "Timeline".to_string(),
                found: other.schema_name().to_string(),
            }),
        }
    }
}
