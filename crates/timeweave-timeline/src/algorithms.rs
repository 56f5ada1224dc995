//! Whole-track and whole-tree transformations.
//!
//! Every function leaves its input untouched and returns new, detached
//! nodes in the same arena.

use timeweave_core::{RationalTime, TimeRange};
use tracing::debug;

use crate::arena::{Arena, NodeId};
use crate::composable::{Composable, ComposableKind};
use crate::error::{Result, TimelineError};
use crate::item::Gap;
use crate::track::{NeighborGapPolicy, Neighbor, Track};

fn expect_track(arena: &Arena, id: NodeId) -> Result<()> {
    let value = arena.get(id)?;
    if value.as_track().is_none() {
        return Err(TimelineError::TypeMismatch {
            expected: "Track".to_string(),
            found: value.schema_name().to_string(),
        });
    }
    Ok(())
}

/// A copy of `track` holding only what falls inside `trim_range`.
///
/// Children outside the range are dropped. Items that straddle an edge
/// have their source range shortened. A transition that straddles an
/// edge cannot be cut and fails with `CannotTrimTransition`.
pub fn track_trimmed_to_range(arena: &mut Arena, track: NodeId, trim_range: TimeRange) -> Result<NodeId> {
    expect_track(arena, track)?;
    let copy = arena.deep_copy(track)?;
    if let Err(err) = trim_children(arena, copy, trim_range) {
        arena.discard(copy)?;
        return Err(err);
    }
    Ok(copy)
}

fn trim_children(arena: &mut Arena, track: NodeId, trim_range: TimeRange) -> Result<()> {
    let ranges = arena.composition(track)?.ranges_of_children(arena)?;
    let children = arena.children(track)?.to_vec();

    for (child, child_range) in children.into_iter().zip(ranges).rev() {
        if !trim_range.intersects(&child_range) {
            arena.discard(child)?;
            continue;
        }
        if trim_range.contains_range(&child_range) {
            continue;
        }
        if arena.get(child)?.kind() == ComposableKind::Transition {
            return Err(TimelineError::CannotTrimTransition);
        }

        let mut source = arena.trimmed_range(child)?;
        if trim_range.start_time > child_range.start_time {
            let amount = trim_range.start_time - child_range.start_time;
            source = TimeRange::new(source.start_time + amount, source.duration - amount);
        }
        let trim_end = trim_range.end_time_exclusive();
        let child_end = child_range.end_time_exclusive();
        if trim_end < child_end {
            source = TimeRange::new(source.start_time, source.duration - (child_end - trim_end));
        }

        if let Some(item) = arena.get_mut(child)?.as_item_mut() {
            item.source_range = Some(source);
        }
    }
    Ok(())
}

/// Composite the tracks of `stack` into a single track named "Flattened".
///
/// The topmost track wins. Wherever it shows nothing (a gap or a disabled
/// item) the same span is taken from the track below, recursively down to
/// the bottom track, which is always copied as is.
pub fn flatten_stack(arena: &mut Arena, stack: NodeId) -> Result<NodeId> {
    let tracks = arena.children(stack)?.to_vec();
    for &track in &tracks {
        expect_track(arena, track)?;
    }
    debug!(tracks = tracks.len(), "flattening stack");

    let flat = arena.add(Track::new_video("Flattened"));
    if let Some(top) = tracks.len().checked_sub(1) {
        if let Err(err) = flatten_level(arena, flat, &tracks, top, None) {
            arena.discard(flat)?;
            return Err(err);
        }
    }
    Ok(flat)
}

fn flatten_level(
    arena: &mut Arena,
    flat: NodeId,
    tracks: &[NodeId],
    level: usize,
    trim_range: Option<TimeRange>,
) -> Result<()> {
    let source = tracks[level];
    let Some(range) = trim_range else {
        return copy_visible(arena, flat, tracks, level, source, None);
    };

    let trimmed = track_trimmed_to_range(arena, source, range)?;
    let result = copy_visible(arena, flat, tracks, level, trimmed, Some(range));
    arena.discard(trimmed)?;
    result
}

fn copy_visible(
    arena: &mut Arena,
    flat: NodeId,
    tracks: &[NodeId],
    level: usize,
    track: NodeId,
    trim_range: Option<TimeRange>,
) -> Result<()> {
    let ranges = arena.composition(track)?.ranges_of_children(arena)?;
    let children = arena.children(track)?.to_vec();

    for (child, range) in children.into_iter().zip(ranges) {
        let value: &Composable = arena.get(child)?;
        let shows_through = value.as_item().is_none() || value.visible() || level == 0;

        if shows_through {
            let copy = arena.deep_copy(child)?;
            arena.append_child(flat, copy)?;
        } else {
            // Ranges in a trimmed copy restart at zero.
            let offset = trim_range.map(|r| r.start_time);
            let below = match offset {
                Some(start) => TimeRange::new(range.start_time + start, range.duration),
                None => range,
            };
            flatten_level(arena, flat, tracks, level - 1, Some(below))?;
        }
    }
    Ok(())
}

/// One entry of [`track_with_expanded_transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandedItem {
    /// A child that is not a transition, cut back clear of the transitions
    /// beside it.
    Item(NodeId),
    /// A transition with copies of the media it overlaps on either side.
    Transition {
        pre: NodeId,
        transition: NodeId,
        post: NodeId,
    },
}

/// Detached copies of the children of `track` with every transition's
/// overlap spelled out.
///
/// `A, T, B` becomes `A'`, `(A_t, T, B_t)`, `B'` where `A'` and `B'` are the
/// parts of the neighbours outside the transition and `A_t`, `B_t` the
/// parts under it. Two transitions in a row cannot be expanded.
pub fn track_with_expanded_transitions(arena: &mut Arena, track: NodeId) -> Result<Vec<ExpandedItem>> {
    expect_track(arena, track)?;
    let children = arena.children(track)?.to_vec();
    let mut expanded = Vec::with_capacity(children.len());
    if let Err(err) = expand_children(arena, track, &children, &mut expanded) {
        for entry in expanded {
            discard_expanded(arena, entry)?;
        }
        return Err(err);
    }
    debug!(children = children.len(), "expanded transitions");
    Ok(expanded)
}

fn transition_offsets(arena: &Arena, id: Option<&NodeId>) -> Result<Option<(RationalTime, RationalTime)>> {
    match id {
        Some(&id) => Ok(arena.get(id)?.as_transition().map(|t| (t.in_offset, t.out_offset))),
        None => Ok(None),
    }
}

fn expand_children(
    arena: &mut Arena,
    track: NodeId,
    children: &[NodeId],
    expanded: &mut Vec<ExpandedItem>,
) -> Result<()> {
    for (index, &child) in children.iter().enumerate() {
        if let Some((in_offset, out_offset)) = transition_offsets(arena, Some(&child))? {
            expanded.push(expand_transition(arena, track, child, in_offset, out_offset)?);
            continue;
        }

        let before = transition_offsets(arena, index.checked_sub(1).and_then(|i| children.get(i)))?;
        let after = transition_offsets(arena, children.get(index + 1))?;
        let mut range = arena.trimmed_range(child)?;
        if let Some((_, out_offset)) = before {
            range = TimeRange::new(range.start_time + out_offset, range.duration - out_offset);
        }
        if let Some((in_offset, _)) = after {
            range = TimeRange::new(range.start_time, range.duration - in_offset);
        }

        let copy = arena.deep_copy(child)?;
        if let Some(item) = arena.get_mut(copy)?.as_item_mut() {
            item.source_range = Some(range);
        }
        expanded.push(ExpandedItem::Item(copy));
    }
    Ok(())
}

fn expand_transition(
    arena: &mut Arena,
    track: NodeId,
    transition: NodeId,
    in_offset: RationalTime,
    out_offset: RationalTime,
) -> Result<ExpandedItem> {
    let neighbors = arena.neighbors_of(track, transition, NeighborGapPolicy::AroundTransitions)?;
    let duration = in_offset + out_offset;

    let previous = neighbors
        .previous
        .unwrap_or_else(|| Neighbor::Gap(Gap::with_duration(in_offset)));
    let pre = overlap_copy(arena, previous, "_transition_pre", |range| {
        let start = range.end_time_exclusive() - in_offset;
        TimeRange::new(start, duration.rescaled_to(start))
    })?;

    let next = neighbors
        .next
        .unwrap_or_else(|| Neighbor::Gap(Gap::with_duration(out_offset)));
    let post = overlap_copy(arena, next, "_transition_post", |range| {
        let start = (range.start_time - in_offset).rescaled_to(range.start_time);
        TimeRange::new(start, duration.rescaled_to(start))
    });
    let post = match post {
        Ok(post) => post,
        Err(err) => {
            arena.discard(pre)?;
            return Err(err);
        }
    };

    let transition = arena.deep_copy(transition)?;
    Ok(ExpandedItem::Transition {
        pre,
        transition,
        post,
    })
}

/// Copy `neighbor`, add `suffix` to its name and set its source range to
/// `overlap` of its trimmed range.
fn overlap_copy(
    arena: &mut Arena,
    neighbor: Neighbor,
    suffix: &str,
    overlap: impl FnOnce(TimeRange) -> TimeRange,
) -> Result<NodeId> {
    let (copy, range) = match neighbor {
        Neighbor::Child(id) => {
            if arena.get(id)?.kind() == ComposableKind::Transition {
                return Err(TimelineError::TransitionFollowingTransition);
            }
            let range = arena.trimmed_range(id)?;
            (arena.deep_copy(id)?, range)
        }
        Neighbor::Gap(gap) => {
            let id = arena.add(gap);
            (id, arena.trimmed_range(id)?)
        }
    };
    if let Some(item) = arena.get_mut(copy)?.as_item_mut() {
        item.name.push_str(suffix);
        item.source_range = Some(overlap(range));
    }
    Ok(copy)
}

fn discard_expanded(arena: &mut Arena, entry: ExpandedItem) -> Result<()> {
    match entry {
        ExpandedItem::Item(id) => arena.discard(id),
        ExpandedItem::Transition {
            pre,
            transition,
            post,
        } => {
            arena.discard(pre)?;
            arena.discard(transition)?;
            arena.discard(post)
        }
    }
}

/// What a filter decides for one object of the tree.
#[derive(Debug, Clone)]
pub enum FilterAction {
    /// Keep the object, with any edits the filter made to it.
    Keep,
    /// Leave the object and everything under it out.
    Remove,
    /// Put these objects where the object was. The children of a replaced
    /// composition are not visited.
    Replace(Vec<Composable>),
}

/// A detached copy of the tree under `root` with `filter` applied to a copy
/// of every object, parents before children.
///
/// Returns the objects that take `root`'s place: none if it was removed,
/// several if it was replaced by several.
pub fn filtered_items<F>(arena: &mut Arena, root: NodeId, mut filter: F) -> Result<Vec<NodeId>>
where
    F: FnMut(&mut Composable) -> FilterAction,
{
    reduced_items(arena, root, |_, value, _| filter(value))
}

/// Like [`filtered_items`], but `reduce` also sees the siblings before and
/// after each object as they are in the input tree. A removed object is
/// still the previous sibling of the next one. `root` has no siblings.
pub fn reduced_items<F>(arena: &mut Arena, root: NodeId, mut reduce: F) -> Result<Vec<NodeId>>
where
    F: FnMut(Option<&Composable>, &mut Composable, Option<&Composable>) -> FilterAction,
{
    reduce_node(arena, root, None, None, &mut reduce)
}

fn reduce_node<F>(
    arena: &mut Arena,
    id: NodeId,
    previous: Option<NodeId>,
    next: Option<NodeId>,
    reduce: &mut F,
) -> Result<Vec<NodeId>>
where
    F: FnMut(Option<&Composable>, &mut Composable, Option<&Composable>) -> FilterAction,
{
    let mut value = arena.get(id)?.clone();
    let action = {
        let previous = previous.map(|p| arena.get(p)).transpose()?;
        let next = next.map(|n| arena.get(n)).transpose()?;
        reduce(previous, &mut value, next)
    };

    match action {
        FilterAction::Remove => Ok(Vec::new()),
        FilterAction::Replace(values) => Ok(values.into_iter().map(|v| arena.add(v)).collect()),
        FilterAction::Keep => {
            let children: Option<Vec<NodeId>> =
                arena.get(id)?.children().map(|c| c.iter().collect());
            let copy = arena.add(value);
            if let Some(children) = children {
                if let Err(err) = reduce_children(arena, copy, &children, reduce) {
                    arena.discard(copy)?;
                    return Err(err);
                }
            }
            Ok(vec![copy])
        }
    }
}

fn reduce_children<F>(arena: &mut Arena, copy: NodeId, children: &[NodeId], reduce: &mut F) -> Result<()>
where
    F: FnMut(Option<&Composable>, &mut Composable, Option<&Composable>) -> FilterAction,
{
    for (index, &child) in children.iter().enumerate() {
        let previous = index.checked_sub(1).and_then(|i| children.get(i)).copied();
        let next = children.get(index + 1).copied();
        let mut kept = reduce_node(arena, child, previous, next, reduce)?.into_iter();
        while let Some(id) = kept.next() {
            if let Err(err) = arena.append_child(copy, id) {
                arena.discard(id)?;
                for rest in kept {
                    arena.discard(rest)?;
                }
                return Err(err);
            }
        }
    }
    Ok(())
}
