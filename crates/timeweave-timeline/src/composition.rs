//! Compositions: ordered, duplicate-free containers of composables.
//!
//! Tracks and Stacks differ only in how they lay their children out in
//! time, which is captured by the [`RangeProvider`] trait. Everything that
//! walks or edits the tree lives on [`Arena`], because a composition only
//! holds the ids of its children.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use timeweave_core::{RationalTime, TimeRange};
use tracing::trace;

use crate::arena::{Arena, NodeId};
use crate::composable::{Composable, ComposableKind};
use crate::error::{Result, TimelineError};

// ── Children ────────────────────────────────────────────────────

/// Ordered child ids with a mirrored set for O(1) membership tests.
#[derive(Debug, Clone, Default)]
pub struct Children {
    list: Vec<NodeId>,
    set: HashSet<NodeId>,
}

impl Children {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.set.contains(&id)
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.list.iter().position(|c| *c == id)
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.list.get(index).copied()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.list.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.list.last().copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.list
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.list.iter().copied()
    }

    pub(crate) fn insert(&mut self, index: usize, id: NodeId) {
        self.list.insert(index, id);
        self.set.insert(id);
    }

    pub(crate) fn remove(&mut self, index: usize) -> NodeId {
        let id = self.list.remove(index);
        self.set.remove(&id);
        id
    }

    pub(crate) fn remove_id(&mut self, id: NodeId) -> Option<usize> {
        let index = self.index_of(id)?;
        self.remove(index);
        Some(index)
    }

    pub(crate) fn replace(&mut self, index: usize, id: NodeId) -> NodeId {
        let old = std::mem::replace(&mut self.list[index], id);
        self.set.remove(&old);
        self.set.insert(id);
        old
    }

    pub(crate) fn take(&mut self) -> Vec<NodeId> {
        self.set.clear();
        std::mem::take(&mut self.list)
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
        self.set.clear();
    }
}

// ── Range provider ──────────────────────────────────────────────

/// How a composition places its children in its own time.
///
/// All ranges are in the composition's coordinate space. Implementors
/// provide the per-kind layout; trimming and range searches come for free.
pub trait RangeProvider {
    fn children(&self) -> &Children;

    fn source_range(&self) -> Option<TimeRange>;

    /// The child's range, ignoring this composition's own trim.
    fn range_of_child_at_index(&self, arena: &Arena, index: usize) -> Result<TimeRange>;

    /// The child's range clipped to this composition's source range.
    /// `None` when the child is trimmed away entirely.
    fn trimmed_range_of_child_at_index(
        &self,
        arena: &Arena,
        index: usize,
    ) -> Result<Option<TimeRange>>;

    /// Ranges of every child, in child order.
    fn ranges_of_children(&self, arena: &Arena) -> Result<Vec<TimeRange>>;

    fn available_range(&self, arena: &Arena) -> Result<TimeRange>;

    fn child_at_index(&self, index: usize) -> Result<NodeId> {
        let children = self.children();
        children
            .get(index)
            .ok_or(TimelineError::NoSuchChildAtIndex {
                index,
                len: children.len(),
            })
    }

    /// Extra media exposed before and after `child` by its surroundings.
    fn handles_of_child(
        &self,
        _arena: &Arena,
        child: NodeId,
    ) -> Result<(Option<RationalTime>, Option<RationalTime>)> {
        if !self.children().contains(child) {
            return Err(TimelineError::NotAChild);
        }
        Ok((None, None))
    }

    fn range_of_all_children(&self, arena: &Arena) -> Result<HashMap<NodeId, TimeRange>> {
        let ranges = self.ranges_of_children(arena)?;
        Ok(self.children().iter().zip(ranges).collect())
    }

    /// Indices of the children whose `ranges` reach into `search`.
    ///
    /// When both starts and ends are non-decreasing two bisections bound the
    /// candidates. A transition that reaches past its neighbours breaks
    /// that order, and every range is checked instead.
    fn indices_in_range(&self, ranges: &[TimeRange], search: &TimeRange) -> Vec<usize> {
        let candidates = if laid_out_in_order(ranges) {
            bisect_span(ranges, search)
        } else {
            0..ranges.len()
        };
        candidates
            .filter(|&i| ranges.get(i).is_some_and(|r| range_touches(r, search)))
            .collect()
    }

    fn children_in_range(&self, arena: &Arena, search: &TimeRange) -> Result<Vec<NodeId>> {
        let ranges = self.ranges_of_children(arena)?;
        let children = self.children();
        Ok(self
            .indices_in_range(&ranges, search)
            .into_iter()
            .filter_map(|i| children.get(i))
            .collect())
    }

    /// Crop `child_range` to this composition's source range.
    fn trim_child_range(&self, child_range: TimeRange) -> Option<TimeRange> {
        let Some(source_range) = self.source_range() else {
            return Some(child_range);
        };

        let past_end = source_range.start_time >= child_range.end_time_exclusive();
        let before_start = source_range.end_time_exclusive() <= child_range.start_time;
        if past_end || before_start {
            return None;
        }

        let mut result = child_range;
        if result.start_time < source_range.start_time {
            result = TimeRange::range_from_start_end_time(
                source_range.start_time,
                result.end_time_exclusive(),
            );
        }
        if result.end_time_exclusive() > source_range.end_time_exclusive() {
            result = TimeRange::range_from_start_end_time(
                result.start_time,
                source_range.end_time_exclusive(),
            );
        }
        Some(result)
    }
}

/// Whether a child occupying `range` reaches into `search`.
/// An instant search matches the child that contains it.
pub(crate) fn range_touches(range: &TimeRange, search: &TimeRange) -> bool {
    if search.is_empty() {
        range.start_time <= search.start_time && search.start_time < range.end_time_exclusive()
    } else {
        range.end_time_exclusive() > search.start_time
            && range.start_time < search.end_time_exclusive()
    }
}

/// First index in `lo..hi` whose key is not less than `target`.
pub(crate) fn bisect_left<T, K: Ord>(
    items: &[T],
    target: &K,
    key: impl Fn(&T) -> K,
    lo: usize,
    hi: usize,
) -> usize {
    let hi = hi.min(items.len());
    let lo = lo.min(hi);
    lo + items[lo..hi].partition_point(|item| key(item) < *target)
}

/// First index in `lo..hi` whose key is greater than `target`.
pub(crate) fn bisect_right<T, K: Ord>(
    items: &[T],
    target: &K,
    key: impl Fn(&T) -> K,
    lo: usize,
    hi: usize,
) -> usize {
    let hi = hi.min(items.len());
    let lo = lo.min(hi);
    lo + items[lo..hi].partition_point(|item| key(item) <= *target)
}

fn laid_out_in_order(ranges: &[TimeRange]) -> bool {
    ranges.windows(2).all(|pair| {
        pair[0].start_time <= pair[1].start_time
            && pair[0].end_time_exclusive() <= pair[1].end_time_exclusive()
    })
}

/// Candidate indices for `search`. Only valid for ranges that are
/// [`laid_out_in_order`].
fn bisect_span(ranges: &[TimeRange], search: &TimeRange) -> std::ops::Range<usize> {
    let len = ranges.len();
    let first = bisect_right(ranges, &search.start_time, |r| r.end_time_exclusive(), 0, len);
    let last = if search.is_empty() {
        bisect_right(ranges, &search.start_time, |r| r.start_time, first, len)
    } else {
        bisect_left(
            ranges,
            &search.end_time_exclusive(),
            |r| r.start_time,
            first,
            len,
        )
    };
    first..last
}

// ── Structure ───────────────────────────────────────────────────

impl Arena {
    /// The range-computing view of a Track or Stack.
    pub fn composition(&self, id: NodeId) -> Result<&dyn RangeProvider> {
        let value = self.get(id)?;
        value
            .as_composition()
            .ok_or_else(|| TimelineError::TypeMismatch {
                expected: "Track or Stack".to_string(),
                found: value.schema_name().to_string(),
            })
    }

    fn children_mut_of(&mut self, id: NodeId) -> Result<&mut Children> {
        let value = self.get_mut(id)?;
        let found = value.schema_name();
        value
            .children_mut()
            .ok_or_else(|| TimelineError::TypeMismatch {
                expected: "Track or Stack".to_string(),
                found: found.to_string(),
            })
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.composition(id)?.children().as_slice())
    }

    pub fn child(&self, composition: NodeId, index: usize) -> Result<NodeId> {
        self.composition(composition)?.child_at_index(index)
    }

    pub fn contains_child(&self, composition: NodeId, child: NodeId) -> Result<bool> {
        Ok(self.composition(composition)?.children().contains(child))
    }

    pub fn index_of_child(&self, composition: NodeId, child: NodeId) -> Result<usize> {
        self.composition(composition)?
            .children()
            .index_of(child)
            .ok_or(TimelineError::NotAChild)
    }

    /// True when `ancestor` appears on the parent chain of `node`.
    /// Stops at the first repeated node, so a corrupt chain cannot loop.
    pub fn is_parent_of(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        if ancestor == node {
            return Ok(false);
        }
        let mut visited = HashSet::new();
        let mut current = self.parent(node)?;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            if !visited.insert(parent) {
                break;
            }
            current = self.parent(parent)?;
        }
        Ok(false)
    }

    fn check_insertable(&self, composition: NodeId, child: NodeId) -> Result<()> {
        let parent = self.get(composition)?;
        if parent.children().is_none() {
            return Err(TimelineError::TypeMismatch {
                expected: "Track or Stack".to_string(),
                found: parent.schema_name().to_string(),
            });
        }
        let value = self.get(child)?;
        if matches!(parent, Composable::Stack(_)) && value.kind() == ComposableKind::Transition {
            return Err(TimelineError::WrongKind {
                parent: "Stack".to_string(),
                child: "Transition".to_string(),
            });
        }
        if composition == child || self.is_parent_of(child, composition)? {
            return Err(TimelineError::WouldCreateCycle);
        }
        Ok(())
    }

    /// Remove `child` from whatever composition currently holds it.
    pub(crate) fn detach(&mut self, child: NodeId) -> Result<()> {
        if let Some(parent) = self.parent(child)? {
            if let Ok(children) = self.children_mut_of(parent) {
                children.remove_id(child);
            }
            self.set_parent(child, None)?;
        }
        Ok(())
    }

    pub(crate) fn attach_unchecked(&mut self, composition: NodeId, child: NodeId) -> Result<()> {
        let children = self.children_mut_of(composition)?;
        children.insert(children.len(), child);
        self.set_parent(child, Some(composition))
    }

    /// Insert `child` at `index` (clamped to the end), moving it out of any
    /// other composition first.
    pub fn insert_child(&mut self, composition: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_insertable(composition, child)?;
        if self.contains_child(composition, child)? {
            return Err(TimelineError::AlreadyPresent);
        }
        self.detach(child)?;

        let children = self.children_mut_of(composition)?;
        let index = index.min(children.len());
        children.insert(index, child);
        self.set_parent(child, Some(composition))?;

        trace!(
            parent = composition.index(),
            child = child.index(),
            index,
            "inserted child"
        );
        Ok(())
    }

    pub fn append_child(&mut self, composition: NodeId, child: NodeId) -> Result<()> {
        let len = self.children(composition)?.len();
        self.insert_child(composition, len, child)
    }

    /// Put `child` in slot `index`, returning the detached previous occupant.
    pub fn set_child(&mut self, composition: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        let current = self.child(composition, index)?;
        if current == child {
            return Ok(child);
        }
        self.check_insertable(composition, child)?;
        if self.contains_child(composition, child)? {
            return Err(TimelineError::AlreadyPresent);
        }
        self.detach(child)?;

        let old = self.children_mut_of(composition)?.replace(index, child);
        self.set_parent(old, None)?;
        self.set_parent(child, Some(composition))?;

        trace!(
            parent = composition.index(),
            child = child.index(),
            replaced = old.index(),
            index,
            "replaced child"
        );
        Ok(old)
    }

    /// Detach and return the child at `index`. The node stays in the arena.
    pub fn remove_child(&mut self, composition: NodeId, index: usize) -> Result<NodeId> {
        let children = self.children_mut_of(composition)?;
        if index >= children.len() {
            return Err(TimelineError::NoSuchChildAtIndex {
                index,
                len: children.len(),
            });
        }
        let removed = children.remove(index);
        self.set_parent(removed, None)?;

        trace!(
            parent = composition.index(),
            child = removed.index(),
            index,
            "removed child"
        );
        Ok(removed)
    }

    /// Detach `child`, returning the index it occupied.
    pub fn remove(&mut self, composition: NodeId, child: NodeId) -> Result<usize> {
        let index = self.index_of_child(composition, child)?;
        self.remove_child(composition, index)?;
        Ok(index)
    }

    /// Detach every child, returning them in their former order.
    pub fn clear_children(&mut self, composition: NodeId) -> Result<Vec<NodeId>> {
        let removed = self.children_mut_of(composition)?.take();
        for &child in &removed {
            self.set_parent(child, None)?;
        }
        trace!(parent = composition.index(), count = removed.len(), "cleared children");
        Ok(removed)
    }

    /// Replace all children at once. Nothing changes if any entry is rejected.
    pub fn set_children(&mut self, composition: NodeId, children: Vec<NodeId>) -> Result<()> {
        let mut seen = HashSet::with_capacity(children.len());
        for &child in &children {
            if !seen.insert(child) {
                return Err(TimelineError::AlreadyPresent);
            }
            self.check_insertable(composition, child)?;
        }

        self.clear_children(composition)?;
        for child in children {
            self.detach(child)?;
            self.attach_unchecked(composition, child)?;
        }
        Ok(())
    }

    /// Ancestors of `child` from its parent up to and including `composition`.
    fn path_from_child(&self, composition: NodeId, child: NodeId) -> Result<SmallVec<[NodeId; 8]>> {
        let mut path = SmallVec::new();
        let mut current = self.parent(child)?;
        while let Some(parent) = current {
            path.push(parent);
            if parent == composition {
                return Ok(path);
            }
            if path.len() > self.len() {
                break;
            }
            current = self.parent(parent)?;
        }
        Err(TimelineError::NotAChild)
    }
}

// ── Ranges of descendants ───────────────────────────────────────

impl Arena {
    /// Range of a descendant `child` in the time of `composition`, or of
    /// `reference_space` when given.
    pub fn range_of_child(
        &self,
        composition: NodeId,
        child: NodeId,
        reference_space: Option<NodeId>,
    ) -> Result<TimeRange> {
        let path = self.path_from_child(composition, child)?;

        let mut current = child;
        let mut result: Option<TimeRange> = None;
        for parent in path {
            let index = self.index_of_child(parent, current)?;
            let parent_range = self.composition(parent)?.range_of_child_at_index(self, index)?;
            result = Some(match result {
                None => parent_range,
                Some(r) => TimeRange::new(r.start_time + parent_range.start_time, r.duration),
            });
            current = parent;
        }
        let result = result.ok_or(TimelineError::NotAChild)?;

        match reference_space {
            Some(space) if space != composition => {
                self.transformed_time_range(composition, result, space)
            }
            _ => Ok(result),
        }
    }

    /// Like [`Arena::range_of_child`] with every level's trim applied.
    /// `None` when the child is trimmed away at any level.
    ///
    /// Only the composition's own time is supported as reference space.
    pub fn trimmed_range_of_child(
        &self,
        composition: NodeId,
        child: NodeId,
        reference_space: Option<NodeId>,
    ) -> Result<Option<TimeRange>> {
        if let Some(space) = reference_space {
            if space != composition {
                return Err(TimelineError::NotImplemented(
                    "trimmed_range_of_child in a foreign reference space".to_string(),
                ));
            }
        }
        let path = self.path_from_child(composition, child)?;

        let mut current = child;
        let mut result: Option<TimeRange> = None;
        for parent in path {
            let index = self.index_of_child(parent, current)?;
            let Some(parent_range) = self
                .composition(parent)?
                .trimmed_range_of_child_at_index(self, index)?
            else {
                return Ok(None);
            };
            result = Some(match result {
                None => parent_range,
                Some(r) => TimeRange::new(r.start_time + parent_range.start_time, r.duration),
            });
            current = parent;
        }
        let result = result.ok_or(TimelineError::NotAChild)?;

        let Some(source_range) = self.get(composition)?.source_range() else {
            return Ok(Some(result));
        };
        let start = source_range.start_time.max(result.start_time);
        let end = source_range
            .end_time_exclusive()
            .min(result.end_time_exclusive());
        if start > end {
            return Ok(None);
        }
        Ok(Some(TimeRange::range_from_start_end_time(start, end)))
    }

    /// The direct child covering `time`, descending into nested
    /// compositions unless `shallow`.
    pub fn child_at_time(
        &self,
        composition: NodeId,
        time: RationalTime,
        shallow: bool,
    ) -> Result<Option<NodeId>> {
        let provider = self.composition(composition)?;
        let ranges = provider.ranges_of_children(self)?;
        let search = TimeRange::new(time, RationalTime::zero_at(time));

        let found = provider
            .indices_in_range(&ranges, &search)
            .into_iter()
            .find(|&i| ranges.get(i).is_some_and(|r| r.contains(time)));
        let Some(index) = found else {
            return Ok(None);
        };
        let child = provider.child_at_index(index)?;

        if shallow || self.get(child)?.as_composition().is_none() {
            return Ok(Some(child));
        }
        let child_time = self.transformed_time(composition, time, child)?;
        self.child_at_time(child, child_time, false)
    }

    /// Depth-first, pre-order walk over the descendants of `composition`.
    ///
    /// With a `search_range` (in `composition`'s time) only children that
    /// reach into it are visited, and the range is carried into each nested
    /// composition's own time. `kind` filters what is yielded, not what is
    /// walked. The arena cannot change while the iterator is alive.
    pub fn each_child(
        &self,
        composition: NodeId,
        search_range: Option<TimeRange>,
        kind: Option<ComposableKind>,
        shallow: bool,
    ) -> Result<EachChild<'_>> {
        let root = Frame::new(self, composition, search_range)?;
        Ok(EachChild {
            arena: self,
            kind,
            shallow,
            frames: vec![root],
        })
    }

    /// Every clip below `composition`, in order.
    pub fn each_clip(
        &self,
        composition: NodeId,
        search_range: Option<TimeRange>,
    ) -> Result<EachChild<'_>> {
        self.each_child(composition, search_range, Some(ComposableKind::Clip), false)
    }
}

// ── Traversal ───────────────────────────────────────────────────

struct Frame {
    parent: NodeId,
    children: Vec<NodeId>,
    next: usize,
    search: Option<TimeRange>,
}

impl Frame {
    fn new(arena: &Arena, composition: NodeId, search: Option<TimeRange>) -> Result<Self> {
        let provider = arena.composition(composition)?;
        let children = match &search {
            Some(range) => provider.children_in_range(arena, range)?,
            None => provider.children().as_slice().to_vec(),
        };
        Ok(Self {
            parent: composition,
            children,
            next: 0,
            search,
        })
    }
}

/// Lazy iterator returned by [`Arena::each_child`].
pub struct EachChild<'a> {
    arena: &'a Arena,
    kind: Option<ComposableKind>,
    shallow: bool,
    frames: Vec<Frame>,
}

impl EachChild<'_> {
    fn descend(&self, parent: NodeId, child: NodeId, search: Option<TimeRange>) -> Result<Option<Frame>> {
        if self.arena.get(child)?.as_composition().is_none() {
            return Ok(None);
        }
        let child_search = search
            .map(|range| self.arena.transformed_time_range(parent, range, child))
            .transpose()?;
        Frame::new(self.arena, child, child_search).map(Some)
    }
}

impl Iterator for EachChild<'_> {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            let Some(&child) = frame.children.get(frame.next) else {
                self.frames.pop();
                continue;
            };
            frame.next += 1;
            let (parent, search) = (frame.parent, frame.search);

            if !self.shallow {
                match self.descend(parent, child, search) {
                    Ok(Some(nested)) => self.frames.push(nested),
                    Ok(None) => {}
                    Err(err) => {
                        self.frames.clear();
                        return Some(Err(err));
                    }
                }
            }

            let matches = match self.kind {
                None => true,
                Some(kind) => self.arena.get(child).map_or(false, |c| c.kind() == kind),
            };
            if matches {
                return Some(Ok(child));
            }
        }
    }
}
