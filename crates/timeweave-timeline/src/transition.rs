//! Transitions between adjacent track children.

use timeweave_core::RationalTime;

use crate::Metadata;

/// Transition type names understood by most interchange formats.
pub mod transition_types {
    pub const SMPTE_DISSOLVE: &str = "SMPTE_Dissolve";
    pub const CUSTOM: &str = "Custom_Transition";
}

/// An overlap between the item before and the item after it in a track.
///
/// `in_offset` reaches back into the previous item, `out_offset` forward
/// into the next one. A transition takes up no time of its own in the track.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub name: String,
    pub metadata: Metadata,
    pub transition_type: String,
    pub in_offset: RationalTime,
    pub out_offset: RationalTime,
}

impl Transition {
    pub fn new(name: impl Into<String>, in_offset: RationalTime, out_offset: RationalTime) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
            transition_type: transition_types::SMPTE_DISSOLVE.to_string(),
            in_offset,
            out_offset,
        }
    }

    pub fn with_type(mut self, transition_type: impl Into<String>) -> Self {
        self.transition_type = transition_type.into();
        self
    }

    /// `in_offset + out_offset`.
    pub fn duration(&self) -> RationalTime {
        self.in_offset + self.out_offset
    }
}
