//! Data model shared by the extractor, filter engine, renderer and exporters.

mod filter_config;
mod outcome;

pub use filter_config::{
    AreaChangeFilter, BoundaryFilter, DistanceFilter, FilterConfig, RangeFilter,
};
pub use outcome::{
    FilterOutcome, FilterReason, FilterStatus, FilterSummary, FilteredTrajectory,
};

use std::fmt;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

/// Identity of a tracked object, stable across the whole sequence.
///
/// Label images encode object `k` as pixel value `k + 1`; value `0` is background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Map a label pixel value to an object id. Background maps to `None`.
    pub fn from_label(value: u32) -> Option<Self> {
        value.checked_sub(1).map(ObjectId)
    }

    /// The pixel value this object carries in a label image.
    pub fn label_value(self) -> u32 {
        self.0 + 1
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 2-D point in either pixel or physical (µm) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Point2 {
        Point2::new(self.x * factor, self.y * factor)
    }
}

/// Ordered boundary points of one connected region, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Ellipse-derived shape attributes of one region in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseAxes {
    /// Half the longer fitted axis, in µm.
    pub major_axis_um: f64,
    /// Half the shorter fitted axis, in µm.
    pub minor_axis_um: f64,
    /// Raw fit orientation in `[0, 180)`, not disambiguated between axes.
    pub angle_deg: f64,
}

/// Geometric attributes of one object in one frame. Computed once per load.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFeature {
    /// 0-based position of the frame in the loaded sequence.
    pub frame_index: usize,
    /// `frame_index / fps`, in seconds.
    pub time: f64,
    pub area_um2: f64,
    pub center_px: Point2,
    pub center_um: Point2,
    /// `None` when the contour has fewer than five points or the fit failed.
    pub ellipse: Option<EllipseAxes>,
    pub touches_boundary: bool,
    /// Boundary of the dominant region for this object in this frame.
    pub contour: Option<Contour>,
}

/// Every detection of one object, sorted by frame index. Gaps are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFeatureSeries {
    pub id: ObjectId,
    pub features: Vec<FrameFeature>,
}

impl ObjectFeatureSeries {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The feature recorded at a physical frame index, if the object was detected there.
    pub fn at_frame(&self, frame_index: usize) -> Option<&FrameFeature> {
        self.features
            .binary_search_by_key(&frame_index, |f| f.frame_index)
            .ok()
            .map(|pos| &self.features[pos])
    }
}

/// Acquisition parameters that feed feature extraction.
///
/// Changing either value invalidates every extracted [`FrameFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionParams {
    /// Frames per second of the source recording.
    pub fps: f64,
    /// Physical size of one pixel edge, in µm.
    pub um_per_pixel: f64,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            fps: 1.0,
            um_per_pixel: 1.0,
        }
    }
}

impl AcquisitionParams {
    pub fn new(fps: f64, um_per_pixel: f64) -> Self {
        Self { fps, um_per_pixel }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(TrackError::Config(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if !(self.um_per_pixel.is_finite() && self.um_per_pixel > 0.0) {
            return Err(TrackError::Config(format!(
                "um_per_pixel must be a positive number, got {}",
                self.um_per_pixel
            )));
        }
        Ok(())
    }
}
