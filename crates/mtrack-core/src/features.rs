//! Per-frame feature extraction.
//!
//! For every decoded frame and every object present in it, the dominant
//! 8-connected region is isolated and measured: area, centroid, ellipse fit,
//! boundary contact and outer contour. Everything is computed once for the
//! whole sequence before any filtering happens.

use std::collections::{BTreeMap, HashMap};

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::decoders::LabelFrame;
use crate::error::Result;
use crate::filter::{apply_filters, FilterResult};
use crate::geometry::fit_ellipse;
use crate::loader::MaskSequence;
use crate::models::{
    AcquisitionParams, Contour, EllipseAxes, FilterConfig, FrameFeature, ObjectFeatureSeries,
    ObjectId, Point2,
};
use crate::progress::{should_report, CancelToken, ProgressSink, Stage};

/// A loaded sequence together with the features extracted from it.
///
/// Filtering can be re-run any number of times with different
/// [`FilterConfig`]s; new acquisition parameters need a fresh extraction.
#[derive(Debug, Clone)]
pub struct ExtractedSequence {
    pub sequence: MaskSequence,
    pub params: AcquisitionParams,
    /// One entry for every object id seen while loading, possibly empty.
    pub series: BTreeMap<ObjectId, ObjectFeatureSeries>,
}

impl ExtractedSequence {
    pub fn refilter(&self, config: &FilterConfig, cancel: &CancelToken) -> Result<FilterResult> {
        apply_filters(&self.series, config, &self.params, cancel)
    }

    pub fn frame_count(&self) -> usize {
        self.sequence.frame_count()
    }
}

/// Extract features for every object in every decoded frame.
pub fn extract_features(
    sequence: MaskSequence,
    params: AcquisitionParams,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ExtractedSequence> {
    sink.status("Extracting object features...");
    let total = sequence.frame_count();

    let mut series: BTreeMap<ObjectId, ObjectFeatureSeries> = sequence
        .object_ids
        .iter()
        .map(|&id| (id, ObjectFeatureSeries::new(id)))
        .collect();

    for (frame_index, frame) in sequence.frames.iter().enumerate() {
        cancel.check()?;
        sink.percent(Stage::Extract.percent(frame_index, total));

        if let Some(frame) = frame {
            for (id, feature) in extract_frame_features(frame, frame_index, &params, cancel)? {
                series
                    .entry(id)
                    .or_insert_with(|| ObjectFeatureSeries::new(id))
                    .features
                    .push(feature);
            }
        }

        if should_report(frame_index, total) {
            sink.status(&format!(
                "Extracted features for frame {}/{}",
                frame_index + 1,
                total
            ));
        }
    }

    sink.percent(Stage::Extract.end());
    let detections: usize = series.values().map(ObjectFeatureSeries::len).sum();
    log::info!(
        "extracted {} detections of {} objects over {} frames",
        detections,
        series.len(),
        total
    );

    Ok(ExtractedSequence {
        sequence,
        params,
        series,
    })
}

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Bounds {
    fn at(x: u32, y: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    fn touches_edge(&self, width: u32, height: u32) -> bool {
        self.x0 == 0 || self.y0 == 0 || self.x1 + 1 >= width || self.y1 + 1 >= height
    }
}

/// Features of every object in one frame, in id order.
pub fn extract_frame_features(
    frame: &LabelFrame,
    frame_index: usize,
    params: &AcquisitionParams,
    cancel: &CancelToken,
) -> Result<Vec<(ObjectId, FrameFeature)>> {
    let mut bounds: HashMap<u32, Bounds> = HashMap::new();
    for y in 0..frame.height {
        for x in 0..frame.width {
            let value = frame.get(x, y);
            if value == 0 {
                continue;
            }
            bounds
                .entry(value)
                .and_modify(|b| b.include(x, y))
                .or_insert_with(|| Bounds::at(x, y));
        }
    }

    let mut labels: Vec<(u32, Bounds)> = bounds.into_iter().collect();
    labels.sort_unstable_by_key(|(value, _)| *value);

    let mut features = Vec::with_capacity(labels.len());
    for (value, bounds) in labels {
        cancel.check()?;
        let Some(id) = ObjectId::from_label(value) else {
            continue;
        };
        match measure_region(frame, value, bounds, frame_index, params) {
            Some(feature) => features.push((id, feature)),
            None => log::debug!("object {} has no contour in frame {}", id, frame_index),
        }
    }
    Ok(features)
}

/// Measure the dominant connected component of one label inside its bounding box.
fn measure_region(
    frame: &LabelFrame,
    value: u32,
    bounds: Bounds,
    frame_index: usize,
    params: &AcquisitionParams,
) -> Option<FrameFeature> {
    // Crop with a one-pixel background border so contours never touch the crop edge.
    let crop_w = bounds.x1 - bounds.x0 + 3;
    let crop_h = bounds.y1 - bounds.y0 + 3;
    let mut mask = GrayImage::new(crop_w, crop_h);
    for y in bounds.y0..=bounds.y1 {
        for x in bounds.x0..=bounds.x1 {
            if frame.get(x, y) == value {
                mask.put_pixel(x - bounds.x0 + 1, y - bounds.y0 + 1, Luma([255]));
            }
        }
    }

    let components = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for pixel in components.pixels() {
        if pixel[0] != 0 {
            *counts.entry(pixel[0]).or_insert(0) += 1;
        }
    }
    // Most pixels wins; ties go to the lowest component label.
    let dominant = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&label, _)| label)?;

    let mut region = GrayImage::new(crop_w, crop_h);
    for (x, y, pixel) in components.enumerate_pixels() {
        if pixel[0] == dominant {
            region.put_pixel(x, y, Luma([255]));
        }
    }

    let offset_x = bounds.x0 as i32 - 1;
    let offset_y = bounds.y0 as i32 - 1;
    let contour = find_contours::<i32>(&region)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .max_by_key(|c| c.points.len())
        .map(|c| {
            Contour::new(
                c.points
                    .iter()
                    .map(|p| Point::new(p.x + offset_x, p.y + offset_y))
                    .collect(),
            )
        })
        .filter(|c| !c.is_empty())?;

    let (n, sum_x, sum_y) = contour_interior(&region);
    let center_px = Point2::new(sum_x / n + offset_x as f64, sum_y / n + offset_y as f64);
    let scale = params.um_per_pixel;

    let ellipse = fit_ellipse(&contour).map(|fit| EllipseAxes {
        major_axis_um: fit.major_axis() / 2.0 * scale,
        minor_axis_um: fit.minor_axis() / 2.0 * scale,
        angle_deg: fit.angle_deg,
    });

    Some(FrameFeature {
        frame_index,
        time: frame_index as f64 / params.fps,
        area_um2: n * scale * scale,
        center_px,
        center_um: center_px.scale(scale),
        ellipse,
        touches_boundary: bounds.touches_edge(frame.width, frame.height),
        contour: Some(contour),
    })
}

/// Pixel count and coordinate sums of everything enclosed by the region's
/// outer border, holes included.
///
/// Background reachable from the crop edge (4-connected, the dual of the
/// region's 8-connectivity) lies outside the contour; every other pixel is
/// inside it. The crop always has a background border, so `(0, 0)` is outside.
fn contour_interior(region: &GrayImage) -> (f64, f64, f64) {
    let background = connected_components(region, Connectivity::Four, Luma([255u8]));
    let outside = background.get_pixel(0, 0)[0];

    let (mut n, mut sum_x, mut sum_y) = (0.0, 0.0, 0.0);
    for (x, y, pixel) in background.enumerate_pixels() {
        if pixel[0] != outside {
            n += 1.0;
            sum_x += x as f64;
            sum_y += y as f64;
        }
    }
    (n, sum_x, sum_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullSink;

    /// Paint an axis-aligned rectangle of `value` into `data`.
    fn fill(data: &mut [u32], width: u32, x0: u32, y0: u32, w: u32, h: u32, value: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                data[(y * width + x) as usize] = value;
            }
        }
    }

    fn frame_with(width: u32, height: u32, rects: &[(u32, u32, u32, u32, u32)]) -> LabelFrame {
        let mut data = vec![0; (width * height) as usize];
        for &(x, y, w, h, v) in rects {
            fill(&mut data, width, x, y, w, h, v);
        }
        LabelFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_area_and_centroid_scaled() {
        let frame = frame_with(20, 20, &[(4, 6, 4, 2, 1)]);
        let params = AcquisitionParams::new(2.0, 0.5);
        let features = extract_frame_features(&frame, 3, &params, &CancelToken::new()).unwrap();

        assert_eq!(features.len(), 1);
        let (id, feature) = &features[0];
        assert_eq!(*id, ObjectId(0));
        assert_eq!(feature.area_um2, 8.0 * 0.25);
        assert_eq!(feature.center_px, Point2::new(5.5, 6.5));
        assert_eq!(feature.center_um, Point2::new(2.75, 3.25));
        assert_eq!(feature.time, 1.5);
        assert!(!feature.touches_boundary);
    }

    #[test]
    fn test_dominant_fragment_selected() {
        // Label 3 split into a 3x3 blob and a lone pixel far away.
        let frame = frame_with(20, 20, &[(2, 2, 3, 3, 3), (15, 15, 1, 1, 3)]);
        let features =
            extract_frame_features(&frame, 0, &AcquisitionParams::default(), &CancelToken::new())
                .unwrap();

        let (id, feature) = &features[0];
        assert_eq!(*id, ObjectId(2));
        assert_eq!(feature.area_um2, 9.0);
        assert_eq!(feature.center_px, Point2::new(3.0, 3.0));
        let contour = feature.contour.as_ref().unwrap();
        assert!(contour.points.iter().all(|p| p.x <= 4 && p.y <= 4));
    }

    #[test]
    fn test_holes_count_toward_area() {
        // 7x7 ring around a 3x3 hole, with a second object sitting in the hole.
        let frame = frame_with(16, 16, &[(3, 3, 7, 7, 1), (5, 5, 3, 3, 0), (6, 6, 1, 1, 2)]);
        let features =
            extract_frame_features(&frame, 0, &AcquisitionParams::default(), &CancelToken::new())
                .unwrap();

        let (id, ring) = &features[0];
        assert_eq!(*id, ObjectId(0));
        assert_eq!(ring.area_um2, 49.0);
        assert_eq!(ring.center_px, Point2::new(6.0, 6.0));

        let (id, inner) = &features[1];
        assert_eq!(*id, ObjectId(1));
        assert_eq!(inner.area_um2, 1.0);
    }

    #[test]
    fn test_boundary_contact() {
        let frame = frame_with(10, 10, &[(0, 3, 2, 2, 1), (4, 4, 2, 2, 2), (7, 8, 3, 2, 3)]);
        let features =
            extract_frame_features(&frame, 0, &AcquisitionParams::default(), &CancelToken::new())
                .unwrap();
        let touches: Vec<bool> = features.iter().map(|(_, f)| f.touches_boundary).collect();
        assert_eq!(touches, vec![true, false, true]);
    }

    #[test]
    fn test_small_region_has_no_ellipse() {
        let frame = frame_with(10, 10, &[(5, 5, 1, 1, 1)]);
        let features =
            extract_frame_features(&frame, 0, &AcquisitionParams::default(), &CancelToken::new())
                .unwrap();
        let feature = &features[0].1;
        assert!(feature.ellipse.is_none());
        assert_eq!(feature.area_um2, 1.0);
    }

    #[test]
    fn test_elongated_region_fits_ellipse() {
        let frame = frame_with(40, 20, &[(5, 5, 24, 6, 1)]);
        let features =
            extract_frame_features(&frame, 0, &AcquisitionParams::default(), &CancelToken::new())
                .unwrap();
        let axes = features[0].1.ellipse.unwrap();
        assert!(axes.major_axis_um > axes.minor_axis_um);
    }

    #[test]
    fn test_gap_frame_produces_series_gap() {
        let frames = vec![
            Some(frame_with(10, 10, &[(2, 2, 3, 3, 1)])),
            None,
            Some(frame_with(10, 10, &[(3, 2, 3, 3, 1)])),
        ];
        let sequence = MaskSequence::from_frames(frames);
        let extracted = extract_features(
            sequence,
            AcquisitionParams::default(),
            &NullSink,
            &CancelToken::new(),
        )
        .unwrap();

        let series = &extracted.series[&ObjectId(0)];
        let frames: Vec<usize> = series.features.iter().map(|f| f.frame_index).collect();
        assert_eq!(frames, vec![0, 2]);
    }

    #[test]
    fn test_cancelled_extraction() {
        let sequence = MaskSequence::from_frames(vec![Some(frame_with(4, 4, &[(1, 1, 2, 2, 1)]))]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = extract_features(sequence, AcquisitionParams::default(), &NullSink, &cancel);
        assert!(matches!(result, Err(crate::TrackError::Cancelled)));
    }
}
