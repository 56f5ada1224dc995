//! Markers annotate a span of an item's own time.

use serde::{Deserialize, Serialize};
use timeweave_core::TimeRange;

use crate::Metadata;

/// Display colour of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkerColor {
    Pink,
    #[default]
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Black,
    White,
}

/// A named, coloured range attached to an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Marker {
    pub name: String,
    pub marked_range: TimeRange,
    pub color: MarkerColor,
    pub metadata: Metadata,
}

impl Marker {
    pub fn new(name: impl Into<String>, marked_range: TimeRange) -> Self {
        Self {
            name: name.into(),
            marked_range,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: MarkerColor) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_serializes_uppercase() {
        let json = serde_json::to_value(MarkerColor::Magenta).unwrap();
        assert_eq!(json, "MAGENTA");
        let back: MarkerColor = serde_json::from_value(json).unwrap();
        assert_eq!(back, MarkerColor::Magenta);
    }

    #[test]
    fn test_marker_defaults() {
        let m = Marker::new("note", TimeRange::from_frames(4, 1, 24));
        assert_eq!(m.color, MarkerColor::Red);
        assert!(m.metadata.is_empty());
    }
}
