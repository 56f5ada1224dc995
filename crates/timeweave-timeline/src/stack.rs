//! Parallel compositions.

use timeweave_core::{RationalTime, TimeRange};

use crate::arena::Arena;
use crate::composition::{range_touches, Children, RangeProvider};
use crate::error::Result;
use crate::item::Item;

/// Children layered on top of each other, all starting at zero.
/// Later children are above earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub item: Item,
    pub(crate) children: Children,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
            children: Children::default(),
        }
    }

    pub fn with_source_range(mut self, source_range: TimeRange) -> Self {
        self.item.source_range = Some(source_range);
        self
    }

    pub fn children(&self) -> &Children {
        &self.children
    }
}

impl RangeProvider for Stack {
    fn children(&self) -> &Children {
        &self.children
    }

    fn source_range(&self) -> Option<TimeRange> {
        self.item.source_range
    }

    fn range_of_child_at_index(&self, arena: &Arena, index: usize) -> Result<TimeRange> {
        let child = self.child_at_index(index)?;
        let duration = arena.duration(child)?;
        Ok(TimeRange::new(RationalTime::zero_at(duration), duration))
    }

    fn trimmed_range_of_child_at_index(
        &self,
        arena: &Arena,
        index: usize,
    ) -> Result<Option<TimeRange>> {
        let range = self.range_of_child_at_index(arena, index)?;
        Ok(Some(match self.item.source_range {
            None => range,
            Some(source_range) => TimeRange::new(
                source_range.start_time,
                range.duration.min(source_range.duration),
            ),
        }))
    }

    fn ranges_of_children(&self, arena: &Arena) -> Result<Vec<TimeRange>> {
        (0..self.children.len())
            .map(|i| self.range_of_child_at_index(arena, i))
            .collect()
    }

    /// As long as the longest child.
    fn available_range(&self, arena: &Arena) -> Result<TimeRange> {
        let mut longest: Option<RationalTime> = None;
        for child in self.children.iter() {
            let duration = arena.duration(child)?;
            if longest.map_or(true, |l| duration > l) {
                longest = Some(duration);
            }
        }
        Ok(match longest {
            Some(duration) => TimeRange::new(RationalTime::zero_at(duration), duration),
            None => TimeRange::EMPTY,
        })
    }

    // Every child starts at zero, so ranges are not sorted by start.
    fn indices_in_range(&self, ranges: &[TimeRange], search: &TimeRange) -> Vec<usize> {
        ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| range_touches(range, search))
            .map(|(i, _)| i)
            .collect()
    }
}
