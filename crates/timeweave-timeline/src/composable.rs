//! The closed set of node types that can live in a composition tree.

use std::fmt;

use timeweave_core::TimeRange;

use crate::composition::{Children, RangeProvider};
use crate::item::{Clip, Gap, Item};
use crate::stack::Stack;
use crate::track::Track;
use crate::transition::Transition;
use crate::Metadata;

/// Type tag of a [`Composable`], used as a traversal filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposableKind {
    Clip,
    Gap,
    Transition,
    Track,
    Stack,
}

impl ComposableKind {
    pub fn is_composition(self) -> bool {
        matches!(self, Self::Track | Self::Stack)
    }

    pub fn is_item(self) -> bool {
        !matches!(self, Self::Transition)
    }
}

impl fmt::Display for ComposableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clip => "Clip",
            Self::Gap => "Gap",
            Self::Transition => "Transition",
            Self::Track => "Track",
            Self::Stack => "Stack",
        };
        f.write_str(name)
    }
}

/// Any node of a composition tree.
#[derive(Debug, Clone)]
pub enum Composable {
    Clip(Clip),
    Gap(Gap),
    Transition(Transition),
    Track(Track),
    Stack(Stack),
}

impl Composable {
    pub fn kind(&self) -> ComposableKind {
        match self {
            Self::Clip(_) => ComposableKind::Clip,
            Self::Gap(_) => ComposableKind::Gap,
            Self::Transition(_) => ComposableKind::Transition,
            Self::Track(_) => ComposableKind::Track,
            Self::Stack(_) => ComposableKind::Stack,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Transition(t) => &t.name,
            _ => self.as_item().map(|i| i.name.as_str()).unwrap_or_default(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Clip(c) => &c.item.metadata,
            Self::Gap(g) => &g.item.metadata,
            Self::Transition(t) => &t.metadata,
            Self::Track(t) => &t.item.metadata,
            Self::Stack(s) => &s.item.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Self::Clip(c) => &mut c.item.metadata,
            Self::Gap(g) => &mut g.item.metadata,
            Self::Transition(t) => &mut t.metadata,
            Self::Track(t) => &mut t.item.metadata,
            Self::Stack(s) => &mut s.item.metadata,
        }
    }

    /// Whether the node shows anything. Gaps never do; disabled items don't.
    pub fn visible(&self) -> bool {
        match self {
            Self::Gap(_) => false,
            Self::Transition(_) => true,
            _ => self.as_item().map_or(true, |i| i.enabled),
        }
    }

    /// Whether the node overlaps its neighbours instead of taking up time.
    pub fn overlapping(&self) -> bool {
        matches!(self, Self::Transition(_))
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Clip(c) => Some(&c.item),
            Self::Gap(g) => Some(&g.item),
            Self::Track(t) => Some(&t.item),
            Self::Stack(s) => Some(&s.item),
            Self::Transition(_) => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Self::Clip(c) => Some(&mut c.item),
            Self::Gap(g) => Some(&mut g.item),
            Self::Track(t) => Some(&mut t.item),
            Self::Stack(s) => Some(&mut s.item),
            Self::Transition(_) => None,
        }
    }

    pub fn source_range(&self) -> Option<TimeRange> {
        self.as_item().and_then(|i| i.source_range)
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            Self::Clip(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Self::Transition(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_track(&self) -> Option<&Track> {
        match self {
            Self::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_stack(&self) -> Option<&Stack> {
        match self {
            Self::Stack(s) => Some(s),
            _ => None,
        }
    }

    /// The range-computing view of a Track or Stack.
    pub fn as_composition(&self) -> Option<&dyn RangeProvider> {
        match self {
            Self::Track(t) => Some(t),
            Self::Stack(s) => Some(s),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Self::Track(t) => Some(&t.children),
            Self::Stack(s) => Some(&s.children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Self::Track(t) => Some(&mut t.children),
            Self::Stack(s) => Some(&mut s.children),
            _ => None,
        }
    }

    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::Clip(_) => "Clip",
            Self::Gap(_) => "Gap",
            Self::Transition(_) => "Transition",
            Self::Track(_) => "Track",
            Self::Stack(_) => "Stack",
        }
    }

    pub fn schema_version(&self) -> u32 {
        1
    }
}

impl From<Clip> for Composable {
    fn from(value: Clip) -> Self {
        Self::Clip(value)
    }
}

impl From<Gap> for Composable {
    fn from(value: Gap) -> Self {
        Self::Gap(value)
    }
}

impl From<Transition> for Composable {
    fn from(value: Transition) -> Self {
        Self::Transition(value)
    }
}

impl From<Track> for Composable {
    fn from(value: Track) -> Self {
        Self::Track(value)
    }
}

impl From<Stack> for Composable {
    fn from(value: Stack) -> Self {
        Self::Stack(value)
    }
}
