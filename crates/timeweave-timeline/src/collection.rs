//! Loose bundles of timelines, clips and other documents.

use timeweave_core::TimeRange;

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::item::Clip;
use crate::serialization::SchemaObject;
use crate::Metadata;

/// An ordered list of arbitrary top-level objects, e.g. a bin of clips or
/// a set of alternate cuts.
#[derive(Debug, Clone, Default)]
pub struct SerializableCollection {
    pub name: String,
    pub metadata: Metadata,
    pub children: Vec<SchemaObject>,
}

impl SerializableCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, child: impl Into<SchemaObject>) {
        self.children.push(child.into());
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every clip reachable from this collection, in document order.
    ///
    /// Timelines and composition subtrees are searched with `search_range`
    /// in their own top-level time; nested collections are searched too.
    pub fn each_clip(&self, search_range: Option<TimeRange>) -> Result<Vec<&Clip>> {
        let mut clips = Vec::new();
        for child in &self.children {
            match child {
                SchemaObject::Timeline(timeline) => {
                    let ids = timeline.each_clip(search_range)?.collect::<Result<Vec<_>>>()?;
                    clips.extend(clips_of(timeline.arena(), &ids)?);
                }
                SchemaObject::Composable(subtree) => {
                    let root = subtree.root_value()?;
                    if let Some(clip) = root.as_clip() {
                        clips.push(clip);
                    } else if root.as_composition().is_some() {
                        let ids = subtree
                            .arena
                            .each_clip(subtree.root, search_range)?
                            .collect::<Result<Vec<_>>>()?;
                        clips.extend(clips_of(&subtree.arena, &ids)?);
                    }
                }
                SchemaObject::Collection(collection) => {
                    clips.extend(collection.each_clip(search_range)?);
                }
                _ => {}
            }
        }
        Ok(clips)
    }
}

fn clips_of<'a>(arena: &'a Arena, ids: &[NodeId]) -> Result<Vec<&'a Clip>> {
    let mut clips = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(clip) = arena.get(id)?.as_clip() {
            clips.push(clip);
        }
    }
    Ok(clips)
}
