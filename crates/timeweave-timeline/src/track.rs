//! Sequential compositions.

use std::fmt;

use timeweave_core::{RationalTime, TimeRange};

use crate::arena::{Arena, NodeId};
use crate::composable::Composable;
use crate::composition::{Children, RangeProvider};
use crate::error::{Result, TimelineError};
use crate::item::{Gap, Item};

/// Kind of track. Anything other than video or audio is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
    Other(String),
}

impl TrackKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for TrackKind {
    fn from(value: &str) -> Self {
        match value {
            "Video" => Self::Video,
            "Audio" => Self::Audio,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Children played one after another.
///
/// Transitions take up no time of their own: they overlap the end of the
/// previous child and the start of the next one.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub item: Item,
    pub kind: TrackKind,
    pub(crate) children: Children,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            item: Item::new(name),
            kind,
            children: Children::default(),
        }
    }

    /// Create a new video track.
    pub fn new_video(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Video)
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    pub fn with_source_range(mut self, source_range: TimeRange) -> Self {
        self.item.source_range = Some(source_range);
        self
    }

    pub fn children(&self) -> &Children {
        &self.children
    }
}

impl RangeProvider for Track {
    fn children(&self) -> &Children {
        &self.children
    }

    fn source_range(&self) -> Option<TimeRange> {
        self.item.source_range
    }

    fn range_of_child_at_index(&self, arena: &Arena, index: usize) -> Result<TimeRange> {
        let child = self.child_at_index(index)?;
        let duration = arena.duration(child)?;

        let mut start = RationalTime::zero_at(duration);
        for &sibling in &self.children.as_slice()[..index] {
            if !arena.get(sibling)?.overlapping() {
                start += arena.duration(sibling)?;
            }
        }
        if let Composable::Transition(transition) = arena.get(child)? {
            start -= transition.in_offset;
        }
        Ok(TimeRange::new(start, duration))
    }

    fn trimmed_range_of_child_at_index(
        &self,
        arena: &Arena,
        index: usize,
    ) -> Result<Option<TimeRange>> {
        let range = self.range_of_child_at_index(arena, index)?;
        Ok(self.trim_child_range(range))
    }

    fn ranges_of_children(&self, arena: &Arena) -> Result<Vec<TimeRange>> {
        let mut ranges = Vec::with_capacity(self.children.len());
        let mut last_end: Option<RationalTime> = None;

        for child in self.children.iter() {
            let range = match arena.get(child)? {
                Composable::Transition(transition) => {
                    let end = last_end.unwrap_or_else(|| RationalTime::zero_at(transition.in_offset));
                    TimeRange::new(end - transition.in_offset, transition.duration())
                }
                _ => {
                    let duration = arena.duration(child)?;
                    let start = last_end.unwrap_or_else(|| RationalTime::zero_at(duration));
                    last_end = Some(start + duration);
                    TimeRange::new(start, duration)
                }
            };
            ranges.push(range);
        }
        Ok(ranges)
    }

    /// Sum of the item durations. A transition at either end borrows
    /// media that is not in the track, so its outer offset counts too.
    fn available_range(&self, arena: &Arena) -> Result<TimeRange> {
        let mut duration = RationalTime::ZERO;

        if let Some(first) = self.children.first() {
            if let Composable::Transition(t) = arena.get(first)? {
                duration += t.in_offset;
            }
        }
        if let Some(last) = self.children.last() {
            if let Composable::Transition(t) = arena.get(last)? {
                duration += t.out_offset;
            }
        }
        for child in self.children.iter() {
            if arena.get(child)?.as_item().is_some() {
                duration += arena.duration(child)?;
            }
        }

        Ok(TimeRange::new(RationalTime::zero_at(duration), duration))
    }

    /// The in offset of a transition just before `child` and the out offset
    /// of one just after it.
    fn handles_of_child(
        &self,
        arena: &Arena,
        child: NodeId,
    ) -> Result<(Option<RationalTime>, Option<RationalTime>)> {
        let index = self.children.index_of(child).ok_or(TimelineError::NotAChild)?;

        let sibling = |i: Option<usize>| {
            i.and_then(|i| self.children.get(i))
                .map(|id| arena.get(id))
                .transpose()
        };

        let head = sibling(index.checked_sub(1))?
            .and_then(Composable::as_transition)
            .map(|t| t.in_offset);
        let tail = sibling(Some(index + 1))?
            .and_then(Composable::as_transition)
            .map(|t| t.out_offset);
        Ok((head, tail))
    }
}

// ── Neighbours ──────────────────────────────────────────────────

/// Whether [`Arena::neighbors_of`] fills the missing side of a transition
/// at the edge of a track with a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborGapPolicy {
    #[default]
    Never,
    AroundTransitions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Neighbor {
    /// A sibling in the track.
    Child(NodeId),
    /// A gap that is not part of the track, sized to the transition's offset.
    Gap(Gap),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Neighbors {
    pub previous: Option<Neighbor>,
    pub next: Option<Neighbor>,
}

impl Arena {
    /// The children either side of `child` in `track`.
    pub fn neighbors_of(
        &self,
        track: NodeId,
        child: NodeId,
        policy: NeighborGapPolicy,
    ) -> Result<Neighbors> {
        let value = self.get(track)?;
        let track_value = value.as_track().ok_or_else(|| TimelineError::TypeMismatch {
            expected: "Track".to_string(),
            found: value.schema_name().to_string(),
        })?;
        let children = &track_value.children;
        let index = children.index_of(child).ok_or(TimelineError::NotAChild)?;

        let padding = match (policy, self.get(child)?) {
            (NeighborGapPolicy::AroundTransitions, Composable::Transition(t)) => {
                Some((t.in_offset, t.out_offset))
            }
            _ => None,
        };

        let previous = match (index, padding) {
            (0, Some((in_offset, _))) => Some(Neighbor::Gap(Gap::with_duration(in_offset))),
            (0, None) => None,
            _ => children.get(index - 1).map(Neighbor::Child),
        };
        let next = match (children.get(index + 1), padding) {
            (Some(id), _) => Some(Neighbor::Child(id)),
            (None, Some((_, out_offset))) => Some(Neighbor::Gap(Gap::with_duration(out_offset))),
            (None, None) => None,
        };

        Ok(Neighbors { previous, next })
    }
}
