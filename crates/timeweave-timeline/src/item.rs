//! Items: the composables that have a trim window, effects and markers.

use timeweave_core::{RationalTime, TimeRange};

use crate::arena::{Arena, NodeId};
use crate::composable::Composable;
use crate::composition::RangeProvider;
use crate::effect::Effect;
use crate::error::{Result, TimelineError};
use crate::marker::Marker;
use crate::media_reference::MediaReference;
use crate::Metadata;

/// Fields shared by clips, gaps, tracks and stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    /// Trim window in the item's own time. `None` means "everything available".
    pub source_range: Option<TimeRange>,
    pub effects: Vec<Effect>,
    pub markers: Vec<Marker>,
    pub metadata: Metadata,
    pub enabled: bool,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            name: String::new(),
            source_range: None,
            effects: Vec::new(),
            markers: Vec::new(),
            metadata: Metadata::new(),
            enabled: true,
        }
    }
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A piece of media placed in a composition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clip {
    pub item: Item,
    pub media_reference: MediaReference,
}

impl Clip {
    /// A clip pointing at a missing reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
            media_reference: MediaReference::missing(),
        }
    }

    pub fn with_source_range(mut self, source_range: TimeRange) -> Self {
        self.item.source_range = Some(source_range);
        self
    }

    pub fn with_media_reference(mut self, media_reference: MediaReference) -> Self {
        self.media_reference = media_reference;
        self
    }
}

/// Empty time in a composition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gap {
    pub item: Item,
}

impl Gap {
    pub fn new(source_range: TimeRange) -> Self {
        Self {
            item: Item {
                source_range: Some(source_range),
                ..Default::default()
            },
        }
    }

    /// A gap of `duration`, starting at zero in its own time.
    pub fn with_duration(duration: RationalTime) -> Self {
        Self::new(TimeRange::new(RationalTime::zero_at(duration), duration))
    }
}

// ── Item-level queries ──────────────────────────────────────────

impl Arena {
    /// The length of `id` in its parent.
    ///
    /// An item's source range wins when set. Otherwise clips and gaps fall
    /// back to their available range, compositions compute theirs from
    /// their children, and a transition lasts `in_offset + out_offset`.
    pub fn duration(&self, id: NodeId) -> Result<RationalTime> {
        let value = self.get(id)?;
        if let Some(range) = value.source_range() {
            return Ok(range.duration);
        }
        match value {
            Composable::Transition(t) => Ok(t.duration()),
            _ => Ok(self.available_range(id)?.duration),
        }
    }

    /// The untrimmed extent `id` could offer.
    pub fn available_range(&self, id: NodeId) -> Result<TimeRange> {
        match self.get(id)? {
            Composable::Clip(clip) => clip
                .media_reference
                .available_range
                .ok_or_else(|| TimelineError::CannotComputeDuration(clip.item.name.clone())),
            Composable::Gap(gap) => gap
                .item
                .source_range
                .ok_or_else(|| TimelineError::CannotComputeDuration(gap.item.name.clone())),
            Composable::Track(track) => track.available_range(self),
            Composable::Stack(stack) => stack.available_range(self),
            Composable::Transition(_) => Err(TimelineError::TypeMismatch {
                expected: "Item".to_string(),
                found: "Transition".to_string(),
            }),
        }
    }

    /// The source range if set, else the available range.
    pub fn trimmed_range(&self, id: NodeId) -> Result<TimeRange> {
        match self.get(id)?.source_range() {
            Some(range) => Ok(range),
            None => self.available_range(id),
        }
    }

    /// The trimmed range widened by any handles the parent exposes through
    /// adjacent transitions.
    pub fn visible_range(&self, id: NodeId) -> Result<TimeRange> {
        let mut result = self.trimmed_range(id)?;
        if let Some(parent) = self.parent(id)? {
            let (head, tail) = self.composition(parent)?.handles_of_child(self, id)?;
            if let Some(head) = head {
                result = TimeRange::new(result.start_time - head, result.duration + head);
            }
            if let Some(tail) = tail {
                result = TimeRange::new(result.start_time, result.duration + tail);
            }
        }
        Ok(result)
    }

    /// Where `id` sits in its parent's time, ignoring the parent's trim.
    pub fn range_in_parent(&self, id: NodeId) -> Result<TimeRange> {
        let parent = self.parent(id)?.ok_or(TimelineError::NotAChild)?;
        let index = self.index_of_child(parent, id)?;
        self.composition(parent)?.range_of_child_at_index(self, index)
    }

    /// Where `id` sits in its parent's time after the parent's trim.
    /// `None` when the parent trims it away completely.
    pub fn trimmed_range_in_parent(&self, id: NodeId) -> Result<Option<TimeRange>> {
        let parent = self.parent(id)?.ok_or(TimelineError::NotAChild)?;
        self.trimmed_range_of_child(parent, id, None)
    }

    /// Convert `time` from the local time of `from` into the local time of
    /// `to`. Both must belong to the same tree.
    pub fn transformed_time(&self, from: NodeId, time: RationalTime, to: NodeId) -> Result<RationalTime> {
        let root = self.root_of(from)?;
        if self.root_of(to)? != root {
            return Err(TimelineError::NotAChild);
        }

        let mut result = time;
        let mut current = from;
        while current != root && current != to {
            let parent = self.parent(current)?.ok_or(TimelineError::NotAChild)?;
            result -= self.trimmed_range(current)?.start_time;
            result += self.range_in_parent(current)?.start_time;
            current = parent;
        }

        let ancestor = current;
        let mut current = to;
        while current != root && current != ancestor {
            let parent = self.parent(current)?.ok_or(TimelineError::NotAChild)?;
            result += self.trimmed_range(current)?.start_time;
            result -= self.range_in_parent(current)?.start_time;
            current = parent;
        }

        Ok(result)
    }

    /// Like [`Arena::transformed_time`] for the start of `range`; the duration is kept.
    pub fn transformed_time_range(&self, from: NodeId, range: TimeRange, to: NodeId) -> Result<TimeRange> {
        Ok(TimeRange::new(
            self.transformed_time(from, range.start_time, to)?,
            range.duration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_reference::MediaReference;
    use crate::track::Track;
    use crate::transition::Transition;

    fn rt(v: i64) -> RationalTime {
        RationalTime::new(v, 24)
    }

    #[test]
    fn test_clip_duration_prefers_source_range() {
        let mut arena = Arena::new();
        let clip = arena.add(
            Clip::new("c")
                .with_media_reference(MediaReference::external(
                    "file:///a.mov",
                    Some(TimeRange::from_frames(0, 100, 24)),
                ))
                .with_source_range(TimeRange::from_frames(10, 20, 24)),
        );
        assert_eq!(arena.duration(clip).unwrap(), rt(20));
        assert_eq!(arena.available_range(clip).unwrap(), TimeRange::from_frames(0, 100, 24));
        assert_eq!(arena.trimmed_range(clip).unwrap(), TimeRange::from_frames(10, 20, 24));
    }

    #[test]
    fn test_clip_duration_falls_back_to_media() {
        let mut arena = Arena::new();
        let clip = arena.add(Clip::new("c").with_media_reference(MediaReference::external(
            "file:///a.mov",
            Some(TimeRange::from_frames(0, 100, 24)),
        )));
        assert_eq!(arena.duration(clip).unwrap(), rt(100));
    }

    #[test]
    fn test_clip_without_any_range_cannot_compute_duration() {
        let mut arena = Arena::new();
        let clip = arena.add(Clip::new("lost"));
        assert!(matches!(
            arena.duration(clip),
            Err(TimelineError::CannotComputeDuration(name)) if name == "lost"
        ));
    }

    #[test]
    fn test_range_in_parent_requires_parent() {
        let mut arena = Arena::new();
        let clip = arena.add(Clip::new("c").with_source_range(TimeRange::from_frames(0, 5, 24)));
        assert!(matches!(arena.range_in_parent(clip), Err(TimelineError::NotAChild)));
        assert!(matches!(
            arena.trimmed_range_in_parent(clip),
            Err(TimelineError::NotAChild)
        ));
    }

    #[test]
    fn test_visible_range_includes_transition_handles() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let a = arena.add(Clip::new("a").with_source_range(TimeRange::from_frames(10, 10, 24)));
        let t = arena.add(Transition::new("x", rt(2), rt(3)));
        let b = arena.add(Clip::new("b").with_source_range(TimeRange::from_frames(30, 10, 24)));
        arena.set_children(track, vec![a, t, b]).unwrap();

        assert_eq!(arena.visible_range(a).unwrap(), TimeRange::from_frames(10, 13, 24));
        assert_eq!(arena.visible_range(b).unwrap(), TimeRange::from_frames(28, 12, 24));
    }

    #[test]
    fn test_transformed_time_between_siblings() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let a = arena.add(Clip::new("a").with_source_range(TimeRange::from_frames(100, 10, 24)));
        let b = arena.add(Clip::new("b").with_source_range(TimeRange::from_frames(50, 10, 24)));
        arena.set_children(track, vec![a, b]).unwrap();

        // Frame 105 of A sits at 5 in the track, which is 5 frames before B begins.
        let t = arena.transformed_time(a, rt(105), b).unwrap();
        assert_eq!(t, rt(45));
        assert_eq!(arena.transformed_time(a, rt(105), track).unwrap(), rt(5));
        assert_eq!(arena.transformed_time(track, rt(12), b).unwrap(), rt(52));

        let range = arena
            .transformed_time_range(a, TimeRange::from_frames(102, 3, 24), track)
            .unwrap();
        assert_eq!(range, TimeRange::from_frames(2, 3, 24));
    }

    #[test]
    fn test_transformed_time_across_trees_fails() {
        let mut arena = Arena::new();
        let a = arena.add(Clip::new("a").with_source_range(TimeRange::from_frames(0, 10, 24)));
        let b = arena.add(Clip::new("b").with_source_range(TimeRange::from_frames(0, 10, 24)));
        assert!(matches!(
            arena.transformed_time(a, rt(1), b),
            Err(TimelineError::NotAChild)
        ));
    }

    #[test]
    fn test_gap_with_duration() {
        let gap = Gap::with_duration(rt(12));
        assert_eq!(gap.item.source_range, Some(TimeRange::from_frames(0, 12, 24)));
    }
}
