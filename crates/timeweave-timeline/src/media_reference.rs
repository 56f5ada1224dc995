//! Media references: what a clip points at.

use serde::{Deserialize, Serialize};
use timeweave_core::{Rational64, RationalTime, TimeRange, TimeTransform};

use crate::error::{Result, TimelineError};
use crate::Metadata;

/// How a player should treat frames missing from an image sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFramePolicy {
    #[default]
    Error,
    Black,
    Hold,
}

/// A numbered run of image files, one per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSequence {
    pub target_url_base: String,
    pub name_prefix: String,
    pub name_suffix: String,
    pub start_frame: i64,
    pub frame_step: i64,
    pub rate: Rational64,
    pub frame_zero_padding: usize,
    pub missing_frame_policy: MissingFramePolicy,
}

impl Default for ImageSequence {
    fn default() -> Self {
        Self {
            target_url_base: String::new(),
            name_prefix: String::new(),
            name_suffix: String::new(),
            start_frame: 1,
            frame_step: 1,
            rate: Rational64::from_integer(1),
            frame_zero_padding: 0,
            missing_frame_policy: MissingFramePolicy::Error,
        }
    }
}

/// The concrete kind of media a reference points at.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MediaReferenceKind {
    External {
        target_url: String,
    },
    Generator {
        generator_kind: String,
        parameters: Metadata,
    },
    ImageSequence(ImageSequence),
    #[default]
    Missing,
}

/// Media a clip reads from, with its available extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaReference {
    pub name: String,
    pub available_range: Option<TimeRange>,
    pub metadata: Metadata,
    pub kind: MediaReferenceKind,
}

impl MediaReference {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn external(target_url: impl Into<String>, available_range: Option<TimeRange>) -> Self {
        Self {
            available_range,
            kind: MediaReferenceKind::External {
                target_url: target_url.into(),
            },
            ..Default::default()
        }
    }

    pub fn generator(generator_kind: impl Into<String>, available_range: Option<TimeRange>) -> Self {
        Self {
            available_range,
            kind: MediaReferenceKind::Generator {
                generator_kind: generator_kind.into(),
                parameters: Metadata::new(),
            },
            ..Default::default()
        }
    }

    pub fn image_sequence(sequence: ImageSequence, available_range: Option<TimeRange>) -> Self {
        Self {
            available_range,
            kind: MediaReferenceKind::ImageSequence(sequence),
            ..Default::default()
        }
    }

    pub fn is_missing_reference(&self) -> bool {
        matches!(self.kind, MediaReferenceKind::Missing)
    }

    pub fn schema_name(&self) -> &'static str {
        match self.kind {
            MediaReferenceKind::External { .. } => "ExternalReference",
            MediaReferenceKind::Generator { .. } => "GeneratorReference",
            MediaReferenceKind::ImageSequence(_) => "ImageSequenceReference",
            MediaReferenceKind::Missing => "MissingReference",
        }
    }

    pub fn as_image_sequence(&self) -> Option<&ImageSequence> {
        match &self.kind {
            MediaReferenceKind::ImageSequence(seq) => Some(seq),
            _ => None,
        }
    }
}

// ── Image sequence frame arithmetic ─────────────────────────────

impl MediaReference {
    fn sequence(&self) -> Result<&ImageSequence> {
        self.as_image_sequence().ok_or_else(|| TimelineError::TypeMismatch {
            expected: "ImageSequenceReference".to_string(),
            found: self.schema_name().to_string(),
        })
    }

    /// Duration of one image: `frame_step` frames at the sequence rate.
    pub fn frame_duration(&self) -> Result<RationalTime> {
        let seq = self.sequence()?;
        Ok(RationalTime::from_frames(seq.frame_step, seq.rate))
    }

    /// Last frame number covered by the available range, inclusive.
    pub fn end_frame(&self) -> Result<i64> {
        let seq = self.sequence()?;
        Ok(match self.available_range {
            Some(range) => seq.start_frame + range.duration.to_frames(seq.rate) - 1,
            None => seq.start_frame,
        })
    }

    pub fn number_of_images_in_sequence(&self) -> Result<i64> {
        let seq = self.sequence()?;
        match self.available_range {
            Some(range) if seq.frame_step > 0 => {
                Ok(range.duration.to_frames(seq.rate / seq.frame_step))
            }
            _ => Ok(0),
        }
    }

    /// Frame number of the image shown at `time`.
    pub fn frame_for_time(&self, time: RationalTime) -> Result<i64> {
        let seq = self.sequence()?;
        let range = self
            .available_range
            .filter(|r| r.contains(time))
            .ok_or_else(|| {
                TimelineError::InvalidTimeRange(format!("{} is outside the available range", time))
            })?;
        let offset = (time - range.start_time).to_frames(seq.rate);
        Ok(seq.start_frame + offset)
    }

    /// URL of the `image_number`th image (counting from zero).
    pub fn target_url_for_image_number(&self, image_number: i64) -> Result<String> {
        let seq = self.sequence()?;
        match self.available_range {
            Some(range) if !range.duration.is_zero() => {}
            _ => {
                return Err(TimelineError::IllegalIndex(
                    "zero duration sequences have no frames".to_string(),
                ))
            }
        }
        if image_number < 0 || image_number >= self.number_of_images_in_sequence()? {
            return Err(TimelineError::IllegalIndex(format!(
                "image {} is not in the sequence",
                image_number
            )));
        }

        let file_number = seq.start_frame + image_number * seq.frame_step;
        let sign = if file_number < 0 { "-" } else { "" };
        let separator = if seq.target_url_base.ends_with('/') { "" } else { "/" };
        Ok(format!(
            "{}{}{}{}{:0width$}{}",
            seq.target_url_base,
            separator,
            seq.name_prefix,
            sign,
            file_number.unsigned_abs(),
            seq.name_suffix,
            width = seq.frame_zero_padding
        ))
    }

    /// Time at which the `image_number`th image starts.
    pub fn presentation_time_for_image_number(&self, image_number: i64) -> Result<RationalTime> {
        if image_number < 0 || image_number >= self.number_of_images_in_sequence()? {
            return Err(TimelineError::IllegalIndex(format!(
                "image {} is not in the sequence",
                image_number
            )));
        }
        let first_frame = self
            .available_range
            .map(|r| r.start_time)
            .unwrap_or_default();
        let xf = TimeTransform::new(first_frame, Rational64::from_integer(image_number), None);
        Ok(xf.applied_to_time(self.frame_duration()?))
    }
}
