//! Node storage for composition trees.
//!
//! Every composable lives in an [`Arena`] and is addressed by a [`NodeId`].
//! A node knows its parent through a plain id; the parent's child list is
//! the only owner. Slots are never reused, so an id of a discarded node stays
//! invalid forever. Ids carry the arena they were issued by, so an id from
//! one arena is rejected by another.

use uuid::Uuid;

use crate::composable::Composable;
use crate::error::{Result, TimelineError};

/// Handle to a node inside a particular [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    arena: Uuid,
    index: usize,
}

impl NodeId {
    /// Slot number inside the arena. Stable for the node's lifetime.
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    value: Composable,
}

/// Owning store of composition nodes.
///
/// Cloning an arena produces an independent deep copy in which every
/// existing [`NodeId`] keeps pointing at the corresponding copy.
#[derive(Debug, Clone)]
pub struct Arena {
    id: Uuid,
    nodes: Vec<Option<Node>>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            nodes: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a new detached node.
    ///
    /// A composition passed in by value starts out empty; any child ids it
    /// carried are dropped. Use [`Arena::deep_copy`] to duplicate a subtree.
    pub fn add(&mut self, value: impl Into<Composable>) -> NodeId {
        let mut value = value.into();
        if let Some(children) = value.children_mut() {
            children.clear();
        }
        self.push(value)
    }

    fn push(&mut self, value: Composable) -> NodeId {
        let id = NodeId {
            arena: self.id,
            index: self.nodes.len(),
        };
        self.nodes.push(Some(Node {
            parent: None,
            value,
        }));
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        if id.arena != self.id {
            return Err(TimelineError::NoSuchNode);
        }
        self.nodes
            .get(id.index)
            .and_then(Option::as_ref)
            .ok_or(TimelineError::NoSuchNode)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if id.arena != self.id {
            return Err(TimelineError::NoSuchNode);
        }
        self.nodes
            .get_mut(id.index)
            .and_then(Option::as_mut)
            .ok_or(TimelineError::NoSuchNode)
    }

    pub fn get(&self, id: NodeId) -> Result<&Composable> {
        Ok(&self.node(id)?.value)
    }

    /// Mutable access to a node's own fields. Its children can only be
    /// changed through the composition methods.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Composable> {
        Ok(&mut self.node_mut(id)?.value)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.node_mut(id)?.parent = parent;
        Ok(())
    }

    /// The topmost ancestor of `id` (possibly `id` itself).
    pub fn root_of(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        let mut steps = 0usize;
        while let Some(parent) = self.parent(current)? {
            current = parent;
            steps += 1;
            // A well-formed tree is never deeper than the arena is large.
            if steps > self.nodes.len() {
                break;
            }
        }
        Ok(current)
    }

    /// Remove `id` and all of its descendants, detaching it from its parent
    /// first.
    pub fn discard(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let node = self
                .nodes
                .get_mut(next.index)
                .and_then(Option::take)
                .ok_or(TimelineError::NoSuchNode)?;
            if let Some(children) = node.value.children() {
                pending.extend(children.iter());
            }
        }
        Ok(())
    }

    /// Copy `id` and its whole subtree into new, detached nodes.
    pub fn deep_copy(&mut self, id: NodeId) -> Result<NodeId> {
        let subtree = self.extract(id)?;
        self.import(&subtree)
    }

    /// Copy `id` alone; a composition copy starts with no children.
    pub fn shallow_copy(&mut self, id: NodeId) -> Result<NodeId> {
        let value = self.get(id)?.clone();
        Ok(self.add(value))
    }

    /// Deep copy `id` into a fresh arena of its own.
    pub fn extract(&self, id: NodeId) -> Result<Subtree> {
        let mut arena = Arena::new();
        let root = copy_tree(self, id, &mut arena)?;
        Ok(Subtree { arena, root })
    }

    /// Deep copy a subtree from another arena into this one.
    pub fn import(&mut self, subtree: &Subtree) -> Result<NodeId> {
        copy_tree(&subtree.arena, subtree.root, self)
    }

    /// Iterate over every live node id.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let arena = self.id;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(move |(index, _)| NodeId { arena, index })
    }
}

fn copy_tree(src: &Arena, id: NodeId, dst: &mut Arena) -> Result<NodeId> {
    let mut value = src.get(id)?.clone();
    let children = value
        .children_mut()
        .map(|c| c.take())
        .unwrap_or_default();
    let new_id = dst.push(value);
    for child in children {
        let new_child = copy_tree(src, child, dst)?;
        dst.attach_unchecked(new_id, new_child)?;
    }
    Ok(new_id)
}

/// A tree that owns its arena, e.g. a clip or track read from a file on its own.
#[derive(Debug, Clone)]
pub struct Subtree {
    pub arena: Arena,
    pub root: NodeId,
}

impl Subtree {
    pub fn new(value: impl Into<Composable>) -> Self {
        let mut arena = Arena::new();
        let root = arena.add(value);
        Self { arena, root }
    }

    pub fn root_value(&self) -> Result<&Composable> {
        self.arena.get(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Clip;
    use crate::track::Track;

    #[test]
    fn test_ids_are_arena_scoped() {
        let mut a = Arena::new();
        let b = Arena::new();
        let id = a.add(Clip::new("c"));
        assert!(a.get(id).is_ok());
        assert!(matches!(b.get(id), Err(TimelineError::NoSuchNode)));
    }

    #[test]
    fn test_discard_removes_subtree() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let clip = arena.add(Clip::new("c"));
        arena.append_child(track, clip).unwrap();

        arena.discard(track).unwrap();
        assert!(!arena.contains(track));
        assert!(!arena.contains(clip));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_discard_detaches_from_parent() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let clip = arena.add(Clip::new("c"));
        arena.append_child(track, clip).unwrap();

        arena.discard(clip).unwrap();
        assert!(arena.children(track).unwrap().is_empty());
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let clip = arena.add(Clip::new("c"));
        arena.append_child(track, clip).unwrap();

        let copy = arena.deep_copy(track).unwrap();
        assert_ne!(copy, track);
        assert_eq!(arena.parent(copy).unwrap(), None);
        let copied_clip = arena.child(copy, 0).unwrap();
        assert_ne!(copied_clip, clip);
        assert_eq!(arena.parent(copied_clip).unwrap(), Some(copy));
        assert_eq!(arena.get(copied_clip).unwrap().name(), "c");
    }

    #[test]
    fn test_shallow_copy_has_no_children() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let clip = arena.add(Clip::new("c"));
        arena.append_child(track, clip).unwrap();

        let copy = arena.shallow_copy(track).unwrap();
        assert!(arena.children(copy).unwrap().is_empty());
        assert_eq!(arena.parent(clip).unwrap(), Some(track));
    }

    #[test]
    fn test_clone_keeps_ids_valid() {
        let mut arena = Arena::new();
        let clip = arena.add(Clip::new("c"));
        let mut copy = arena.clone();
        if let Composable::Clip(c) = copy.get_mut(clip).unwrap() {
            c.item.name = "renamed".to_string();
        }
        assert_eq!(arena.get(clip).unwrap().name(), "c");
        assert_eq!(copy.get(clip).unwrap().name(), "renamed");
    }

    #[test]
    fn test_extract_and_import() {
        let mut arena = Arena::new();
        let track = arena.add(Track::new_video("v"));
        let clip = arena.add(Clip::new("c"));
        arena.append_child(track, clip).unwrap();

        let subtree = arena.extract(track).unwrap();
        assert_eq!(subtree.arena.len(), 2);

        let mut other = Arena::new();
        let imported = other.import(&subtree).unwrap();
        assert_eq!(other.children(imported).unwrap().len(), 1);
    }
}
