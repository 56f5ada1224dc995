//! Effects attached to items.

use timeweave_core::{Rational64, RationalTime, TimeTransform};

use crate::Metadata;

/// What an effect does to time, if anything.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    /// A plain effect with no effect on timing.
    Effect,
    /// A time effect whose mapping is not modelled.
    TimeEffect,
    /// Plays the source at `time_scalar` times normal speed.
    LinearTimeWarp { time_scalar: Rational64 },
    /// Holds a single frame for the whole item.
    FreezeFrame,
}

/// An effect applied to an item.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub name: String,
    pub effect_name: String,
    pub metadata: Metadata,
    pub kind: EffectKind,
}

impl Effect {
    pub fn new(name: impl Into<String>, effect_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect_name: effect_name.into(),
            metadata: Metadata::new(),
            kind: EffectKind::Effect,
        }
    }

    pub fn linear_time_warp(name: impl Into<String>, time_scalar: Rational64) -> Self {
        Self {
            name: name.into(),
            effect_name: "LinearTimeWarp".to_string(),
            metadata: Metadata::new(),
            kind: EffectKind::LinearTimeWarp { time_scalar },
        }
    }

    pub fn freeze_frame(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect_name: "FreezeFrame".to_string(),
            metadata: Metadata::new(),
            kind: EffectKind::FreezeFrame,
        }
    }

    pub fn is_time_effect(&self) -> bool {
        !matches!(self.kind, EffectKind::Effect)
    }

    /// The time mapping of a speed effect. `None` for effects that do not
    /// describe one.
    pub fn time_transform(&self) -> Option<TimeTransform> {
        let scale = match self.kind {
            EffectKind::LinearTimeWarp { time_scalar } => time_scalar,
            EffectKind::FreezeFrame => Rational64::from_integer(0),
            EffectKind::Effect | EffectKind::TimeEffect => return None,
        };
        Some(TimeTransform::new(RationalTime::ZERO, scale, None))
    }

    pub fn schema_name(&self) -> &'static str {
        match self.kind {
            EffectKind::Effect => "Effect",
            EffectKind::TimeEffect => "TimeEffect",
            EffectKind::LinearTimeWarp { .. } => "LinearTimeWarp",
            EffectKind::FreezeFrame => "FreezeFrame",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_warp_transform() {
        let fx = Effect::linear_time_warp("speed", Rational64::from_integer(2));
        let xf = fx.time_transform().unwrap();
        assert_eq!(xf.applied_to_time(RationalTime::new(5, 24)), RationalTime::new(10, 24));
    }

    #[test]
    fn test_freeze_frame_holds() {
        let fx = Effect::freeze_frame("hold");
        let xf = fx.time_transform().unwrap();
        assert!(xf.applied_to_time(RationalTime::new(99, 24)).is_zero());
        assert!(xf.inverted().is_none());
    }

    #[test]
    fn test_plain_effect_has_no_transform() {
        let fx = Effect::new("blur", "Blur");
        assert!(fx.time_transform().is_none());
        assert!(!fx.is_time_effect());
        assert_eq!(fx.schema_name(), "Effect");
    }
}
