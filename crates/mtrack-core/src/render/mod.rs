//! Visualization of filtered trajectories.
//!
//! Each output frame shows the surviving objects' regions in a stable color,
//! their centroid path up to that frame, the fitted major (red) and minor
//! (blue) axes, and the object id. Ids are painted last so strokes never
//! cover them.

mod palette;
mod text;

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::{Deserialize, Serialize};

pub use palette::{object_palette, PALETTE_SIZE};

use crate::decoders::LabelFrame;
use crate::error::Result;
use crate::features::ExtractedSequence;
use crate::geometry::fit_ellipse;
use crate::models::{FilteredTrajectory, FrameFeature, ObjectId, Point2};
use crate::progress::{should_report, CancelToken, ProgressSink, Stage};

const MAJOR_AXIS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MINOR_AXIS_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Seed for the palette shuffle; same seed, same colors.
    pub palette_seed: u64,
    /// Stroke width of trajectories and axes, in pixels.
    pub line_thickness: u32,
    /// Id label size; the font is 8 pixels tall per unit.
    pub label_scale: u32,
    /// Forward every n-th rendered frame to the preview channel.
    pub preview_interval: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            palette_seed: 42,
            line_thickness: 2,
            label_scale: 2,
            preview_interval: 10,
        }
    }
}

/// One rendered output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationFrame {
    pub frame_index: usize,
    pub image: RgbImage,
}

/// Colors assigned to surviving objects, in id order.
pub fn assign_colors(
    trajectories: &BTreeMap<ObjectId, FilteredTrajectory>,
    seed: u64,
) -> BTreeMap<ObjectId, Rgb<u8>> {
    let palette = object_palette(seed);
    trajectories
        .keys()
        .enumerate()
        .map(|(i, id)| (*id, palette[i % palette.len()]))
        .collect()
}

/// Everything needed to draw one object in one frame.
struct Visible<'a> {
    id: ObjectId,
    color: Rgb<u8>,
    current: &'a FrameFeature,
    path: Vec<Point2>,
}

/// Render a single frame.
pub fn render_frame(
    frame_index: usize,
    labels: Option<&LabelFrame>,
    (width, height): (u32, u32),
    trajectories: &BTreeMap<ObjectId, FilteredTrajectory>,
    colors: &BTreeMap<ObjectId, Rgb<u8>>,
    um_per_pixel: f64,
    options: &RenderOptions,
) -> VisualizationFrame {
    let mut image = RgbImage::new(width, height);

    let visible: Vec<Visible<'_>> = trajectories
        .values()
        .filter_map(|t| {
            let current = t.at_frame(frame_index)?;
            let path = t
                .features
                .iter()
                .take_while(|f| f.frame_index <= frame_index)
                .map(|f| f.center_px)
                .collect();
            Some(Visible {
                id: t.id,
                color: colors.get(&t.id).copied().unwrap_or(LABEL_COLOR),
                current,
                path,
            })
        })
        .collect();

    if let Some(labels) = labels {
        let lookup: BTreeMap<u32, Rgb<u8>> = visible
            .iter()
            .map(|v| (v.id.label_value(), v.color))
            .collect();
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if x >= labels.width || y >= labels.height {
                continue;
            }
            if let Some(color) = lookup.get(&labels.get(x, y)) {
                *pixel = *color;
            }
        }
    }

    for v in &visible {
        for pair in v.path.windows(2) {
            thick_line(&mut image, pair[0], pair[1], v.color, options.line_thickness);
        }
    }

    for v in &visible {
        draw_axes(&mut image, v.current, um_per_pixel, options.line_thickness);
    }

    for v in &visible {
        let center = v.current.center_px;
        text::draw_label(
            &mut image,
            &v.id.to_string(),
            (center.x, center.y),
            options.label_scale,
            LABEL_COLOR,
        );
    }

    VisualizationFrame { frame_index, image }
}

/// Major and minor axis through the centroid.
///
/// Orientation comes from a refit of the current contour; the stored fit
/// angle is used when the refit is not possible. Objects without a stored
/// fit get no axes.
fn draw_axes(image: &mut RgbImage, feature: &FrameFeature, um_per_pixel: f64, thickness: u32) {
    let Some(axes) = feature.ellipse else {
        return;
    };
    if !(axes.major_axis_um > 0.0 && axes.minor_axis_um > 0.0) {
        return;
    }

    let major_angle = feature
        .contour
        .as_ref()
        .and_then(fit_ellipse)
        .map(|fit| fit.major_axis_angle())
        .unwrap_or(axes.angle_deg);
    let minor_angle = major_angle + 90.0;

    let center = feature.center_px;
    let major_px = axes.major_axis_um / um_per_pixel;
    let minor_px = axes.minor_axis_um / um_per_pixel;

    for (half_length, angle, color) in [
        (major_px, major_angle, MAJOR_AXIS_COLOR),
        (minor_px, minor_angle, MINOR_AXIS_COLOR),
    ] {
        let (sin, cos) = angle.to_radians().sin_cos();
        let offset = Point2::new(half_length * cos, half_length * sin);
        let a = Point2::new(center.x - offset.x, center.y - offset.y);
        let b = Point2::new(center.x + offset.x, center.y + offset.y);
        thick_line(image, a, b, color, thickness);
    }
}

/// Line of roughly `thickness` pixels, drawn as parallel one-pixel segments.
fn thick_line(image: &mut RgbImage, a: Point2, b: Point2, color: Rgb<u8>, thickness: u32) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length = dx.hypot(dy);
    let (nx, ny) = if length > 0.0 {
        (-dy / length, dx / length)
    } else {
        (0.0, 0.0)
    };
    let thickness = thickness.max(1);
    let first = -((thickness - 1) as f64) / 2.0;
    for step in 0..thickness {
        let o = first + step as f64;
        draw_line_segment_mut(
            image,
            ((a.x + nx * o) as f32, (a.y + ny * o) as f32),
            ((b.x + nx * o) as f32, (b.y + ny * o) as f32),
            color,
        );
    }
}

/// Render every frame of the sequence, reporting 60% - 100% progress.
pub fn render_sequence(
    extracted: &ExtractedSequence,
    trajectories: &BTreeMap<ObjectId, FilteredTrajectory>,
    options: &RenderOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<Vec<VisualizationFrame>> {
    sink.status("Rendering visualization frames...");
    let sequence = &extracted.sequence;
    let total = sequence.frame_count();
    let dimensions = sequence.dimensions().unwrap_or((0, 0));
    let colors = assign_colors(trajectories, options.palette_seed);
    let interval = options.preview_interval.max(1);

    let mut frames = Vec::with_capacity(total);
    for frame_index in 0..total {
        cancel.check()?;
        sink.percent(Stage::Render.percent(frame_index, total));

        let labels = sequence.frame(frame_index);
        let size = labels.map(|l| (l.width, l.height)).unwrap_or(dimensions);
        let frame = render_frame(
            frame_index,
            labels,
            size,
            trajectories,
            &colors,
            extracted.params.um_per_pixel,
            options,
        );

        if frame_index % interval == 0 || frame_index + 1 == total {
            sink.preview(&frame, frame_index, total);
        }
        if should_report(frame_index, total) {
            sink.status(&format!("Rendered frame {}/{}", frame_index + 1, total));
        }
        frames.push(frame);
    }

    sink.percent(Stage::Render.end());
    log::info!("rendered {} visualization frames", frames.len());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contour, EllipseAxes};
    use imageproc::point::Point;

    fn labels_with_block(value: u32) -> LabelFrame {
        let mut data = vec![0; 40 * 40];
        for y in 10..20 {
            for x in 10..20 {
                data[y * 40 + x] = value;
            }
        }
        LabelFrame::new(40, 40, data).unwrap()
    }

    fn feature(frame_index: usize, x: f64, y: f64) -> FrameFeature {
        FrameFeature {
            frame_index,
            time: frame_index as f64,
            area_um2: 100.0,
            center_px: Point2::new(x, y),
            center_um: Point2::new(x, y),
            ellipse: None,
            touches_boundary: false,
            contour: None,
        }
    }

    fn single(id: u32, features: Vec<FrameFeature>) -> BTreeMap<ObjectId, FilteredTrajectory> {
        let id = ObjectId(id);
        [(id, FilteredTrajectory { id, features })].into()
    }

    #[test]
    fn test_region_painted_only_for_surviving_objects() {
        let labels = labels_with_block(3);
        let trajectories = single(2, vec![feature(0, 35.0, 35.0), feature(1, 35.0, 35.0)]);
        let colors = assign_colors(&trajectories, 42);
        let frame = render_frame(
            0,
            Some(&labels),
            (40, 40),
            &trajectories,
            &colors,
            1.0,
            &RenderOptions::default(),
        );
        assert_eq!(*frame.image.get_pixel(11, 11), colors[&ObjectId(2)]);
        // Background well away from both the block and the "2" label.
        assert_eq!(*frame.image.get_pixel(2, 38), Rgb([0, 0, 0]));

        // Same pixels, but the object was filtered out.
        let frame = render_frame(
            0,
            Some(&labels),
            (40, 40),
            &BTreeMap::new(),
            &BTreeMap::new(),
            1.0,
            &RenderOptions::default(),
        );
        assert_eq!(*frame.image.get_pixel(11, 11), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_object_not_drawn_outside_its_valid_frames() {
        let labels = labels_with_block(1);
        let trajectories = single(0, vec![feature(0, 14.5, 14.5), feature(1, 14.5, 14.5)]);
        let colors = assign_colors(&trajectories, 1);
        let frame = render_frame(
            5,
            Some(&labels),
            (40, 40),
            &trajectories,
            &colors,
            1.0,
            &RenderOptions::default(),
        );
        assert!(frame.image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_trajectory_polyline_up_to_current_frame() {
        let trajectories = single(
            0,
            vec![feature(0, 2.0, 30.0), feature(1, 30.0, 30.0), feature(2, 30.0, 2.0)],
        );
        let colors = assign_colors(&trajectories, 7);
        let color = colors[&ObjectId(0)];
        let options = RenderOptions {
            line_thickness: 1,
            ..Default::default()
        };
        let frame = render_frame(1, None, (40, 40), &trajectories, &colors, 1.0, &options);
        assert_eq!(*frame.image.get_pixel(10, 30), color);
        // Segment towards frame 2 is not drawn yet.
        assert_eq!(*frame.image.get_pixel(30, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_axes_fall_back_to_stored_angle() {
        let mut f = feature(0, 20.0, 20.0);
        f.ellipse = Some(EllipseAxes {
            major_axis_um: 10.0,
            minor_axis_um: 8.0,
            angle_deg: 0.0,
        });
        f.contour = Some(Contour::new(vec![Point::new(0, 0)]));
        let trajectories = single(0, vec![f]);
        let options = RenderOptions {
            line_thickness: 1,
            label_scale: 1,
            ..Default::default()
        };
        let frame = render_frame(
            0,
            None,
            (40, 40),
            &trajectories,
            &assign_colors(&trajectories, 0),
            1.0,
            &options,
        );
        assert_eq!(*frame.image.get_pixel(28, 20), MAJOR_AXIS_COLOR);
        assert_eq!(*frame.image.get_pixel(20, 26), MINOR_AXIS_COLOR);
    }

    #[test]
    fn test_label_painted_over_axes() {
        let mut f = feature(0, 20.0, 20.0);
        f.ellipse = Some(EllipseAxes {
            major_axis_um: 10.0,
            minor_axis_um: 4.0,
            angle_deg: 0.0,
        });
        let trajectories = single(0, vec![f]);
        let options = RenderOptions {
            line_thickness: 1,
            label_scale: 4,
            ..Default::default()
        };
        let frame = render_frame(
            0,
            None,
            (40, 40),
            &trajectories,
            &assign_colors(&trajectories, 0),
            1.0,
            &options,
        );
        // Row 20 is all major axis from x = 10 to 30; the "0" strokes cross it.
        // Anti-aliased strokes: a mostly covered pixel has lost nearly all of its red tint.
        assert!((10..=30).any(|x| frame.image.get_pixel(x, 20)[1] > 200));
        assert!((10..=30).any(|x| *frame.image.get_pixel(x, 20) == MAJOR_AXIS_COLOR));
    }

    #[test]
    fn test_colors_stable_for_same_seed() {
        let trajectories = single(4, vec![feature(0, 1.0, 1.0)]);
        assert_eq!(
            assign_colors(&trajectories, 9),
            assign_colors(&trajectories, 9)
        );
    }
}
