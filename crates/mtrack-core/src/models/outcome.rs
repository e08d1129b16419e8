//! Per-object filter results.

use std::fmt;

use serde::Serialize;

use super::{FrameFeature, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStatus {
    /// Every detected frame survived every rule.
    Passed,
    /// A rule shortened the trajectory, but at least two frames remain.
    Truncated,
    /// The object contributes no trajectory.
    Filtered,
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "passed",
            Self::Truncated => "truncated",
            Self::Filtered => "filtered",
        })
    }
}

/// Machine-checkable reason behind a [`FilterOutcome`].
///
/// Frame positions are physical frame indices (0-based); `Display` renders them
/// 1-based together with the frame time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FilterReason {
    Passed,
    UserExcluded,
    NoFeatureData,
    AreaOutOfRange {
        min: f64,
        max: f64,
    },
    AreaRangeTruncated {
        area_um2: f64,
        min: f64,
        max: f64,
        frame_index: usize,
        time: f64,
    },
    AreaChange {
        ratio: f64,
        threshold: f64,
        frame_index: usize,
        time: f64,
    },
    Velocity {
        velocity: f64,
        min: f64,
        max: f64,
        frame_index: usize,
        time: f64,
    },
    Displacement {
        displacement: f64,
        min: f64,
        max: f64,
    },
    BoundaryContact {
        frame_index: usize,
        time: f64,
    },
    TooClose {
        neighbor: ObjectId,
        distance_um: f64,
        threshold: f64,
        frame_index: usize,
        time: f64,
    },
    InsufficientFrames {
        valid_frames: usize,
    },
}

impl FilterReason {
    /// Physical frame index at which a truncating rule fired.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            Self::AreaRangeTruncated { frame_index, .. }
            | Self::AreaChange { frame_index, .. }
            | Self::Velocity { frame_index, .. }
            | Self::BoundaryContact { frame_index, .. }
            | Self::TooClose { frame_index, .. } => Some(*frame_index),
            _ => None,
        }
    }
}

struct At(usize, f64);

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} (t={:.2}s)", self.0 + 1, self.1)
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Passed => f.write_str("passed all filters"),
            Self::UserExcluded => f.write_str("user exclusion"),
            Self::NoFeatureData => f.write_str("no feature data found"),
            Self::AreaOutOfRange { min, max } => {
                write!(f, "area outside range ({min}~{max} µm²) in every frame")
            }
            Self::AreaRangeTruncated {
                area_um2,
                min,
                max,
                frame_index,
                time,
            } => write!(
                f,
                "area {area_um2:.2} µm² outside range ({min}~{max} µm²) at {}",
                At(frame_index, time)
            ),
            Self::AreaChange {
                ratio,
                threshold,
                frame_index,
                time,
            } => write!(
                f,
                "area change ratio {ratio:.3} below threshold {threshold} at {}",
                At(frame_index, time)
            ),
            Self::Velocity {
                velocity,
                min,
                max,
                frame_index,
                time,
            } => write!(
                f,
                "velocity {velocity:.2} µm/s outside range ({min}~{max} µm/s) at {}",
                At(frame_index, time)
            ),
            Self::Displacement {
                displacement,
                min,
                max,
            } => write!(
                f,
                "total displacement {displacement:.2} µm outside range [{min}-{max}] µm"
            ),
            Self::BoundaryContact { frame_index, time } => {
                write!(f, "touches image boundary at {}", At(frame_index, time))
            }
            Self::TooClose {
                neighbor,
                distance_um,
                threshold,
                frame_index,
                time,
            } => write!(
                f,
                "distance {distance_um:.2} µm to object {neighbor} below threshold {threshold} µm at {}",
                At(frame_index, time)
            ),
            Self::InsufficientFrames { valid_frames } => {
                write!(f, "insufficient valid frames ({valid_frames} < 2)")
            }
        }
    }
}

/// Final classification of one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOutcome {
    pub id: ObjectId,
    pub status: FilterStatus,
    pub reason: FilterReason,
    /// Number of detections before filtering.
    pub original_frame_count: usize,
    /// Frames kept; `None` for filtered objects.
    pub valid_frame_count: Option<usize>,
    /// Physical frame index of the first dropped frame, for truncated objects.
    pub truncated_at: Option<usize>,
}

impl FilterOutcome {
    pub fn filtered(id: ObjectId, reason: FilterReason, original_frame_count: usize) -> Self {
        Self {
            id,
            status: FilterStatus::Filtered,
            reason,
            original_frame_count,
            valid_frame_count: None,
            truncated_at: None,
        }
    }

    pub fn passed(id: ObjectId, frame_count: usize) -> Self {
        Self {
            id,
            status: FilterStatus::Passed,
            reason: FilterReason::Passed,
            original_frame_count: frame_count,
            valid_frame_count: Some(frame_count),
            truncated_at: None,
        }
    }

    pub fn truncated(
        id: ObjectId,
        reason: FilterReason,
        original_frame_count: usize,
        valid_frame_count: usize,
    ) -> Self {
        Self {
            id,
            status: FilterStatus::Truncated,
            truncated_at: reason.frame_index(),
            reason,
            original_frame_count,
            valid_frame_count: Some(valid_frame_count),
        }
    }
}

/// The surviving portion of one object's series.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTrajectory {
    pub id: ObjectId,
    pub features: Vec<FrameFeature>,
}

impl FilteredTrajectory {
    pub fn at_frame(&self, frame_index: usize) -> Option<&FrameFeature> {
        self.features
            .binary_search_by_key(&frame_index, |f| f.frame_index)
            .ok()
            .map(|pos| &self.features[pos])
    }

    pub fn first_frame(&self) -> Option<usize> {
        self.features.first().map(|f| f.frame_index)
    }

    pub fn last_frame(&self) -> Option<usize> {
        self.features.last().map(|f| f.frame_index)
    }
}

/// Aggregate counts over all outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterSummary {
    pub total_objects: usize,
    pub passed: usize,
    pub truncated: usize,
    pub filtered: usize,
}

impl FilterSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a FilterOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.total_objects += 1;
            match outcome.status {
                FilterStatus::Passed => summary.passed += 1,
                FilterStatus::Truncated => summary.truncated += 1,
                FilterStatus::Filtered => summary.filtered += 1,
            }
        }
        summary
    }

    /// Objects contributing trajectory data: passed plus truncated.
    pub fn passed_objects(&self) -> usize {
        self.passed + self.truncated
    }
}
