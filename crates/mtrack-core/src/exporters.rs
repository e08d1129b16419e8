//! Result exporters
//!
//! Write accepted trajectories as CSV tables, filtered label frames and
//! visualization frames as PNG, and the filter report as JSON.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::decoders::LabelFrame;
use crate::error::{Result, TrackError};
use crate::features::ExtractedSequence;
use crate::filter::FilterResult;
use crate::models::{
    AcquisitionParams, FilterConfig, FilterOutcome, FilterStatus, FilterSummary,
    FilteredTrajectory, FrameFeature, ObjectId,
};
use crate::render::VisualizationFrame;

/// One row of a per-object trajectory table.
///
/// The posture angle is the raw fit orientation, not corrected to the
/// major axis drawn in the visualization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRow {
    #[serde(rename = "time (s)")]
    pub time: f64,
    #[serde(rename = "area (μm²)")]
    pub area: f64,
    #[serde(rename = "center_x (μm)")]
    pub center_x: f64,
    #[serde(rename = "center_y (μm)")]
    pub center_y: f64,
    #[serde(rename = "major axis length (μm)")]
    pub major_axis: f64,
    #[serde(rename = "minor axis length (μm)")]
    pub minor_axis: f64,
    #[serde(rename = "posture angle (°)")]
    pub angle: f64,
}

impl From<&FrameFeature> for TrajectoryRow {
    fn from(f: &FrameFeature) -> Self {
        let (major_axis, minor_axis, angle) = f
            .ellipse
            .map(|e| (e.major_axis_um, e.minor_axis_um, e.angle_deg))
            .unwrap_or((0.0, 0.0, 0.0));
        Self {
            time: f.time,
            area: f.area_um2,
            center_x: f.center_um.x,
            center_y: f.center_um.y,
            major_axis,
            minor_axis,
            angle,
        }
    }
}

pub fn trajectory_table(trajectory: &FilteredTrajectory) -> Vec<TrajectoryRow> {
    trajectory.features.iter().map(TrajectoryRow::from).collect()
}

/// `frame` with every pixel not belonging to a surviving object at this frame cleared.
pub fn filtered_label_frame(
    frame: &LabelFrame,
    frame_index: usize,
    trajectories: &BTreeMap<ObjectId, FilteredTrajectory>,
) -> LabelFrame {
    let keep: Vec<u32> = trajectories
        .values()
        .filter(|t| t.at_frame(frame_index).is_some())
        .map(|t| t.id.label_value())
        .collect();
    let data = frame
        .data
        .iter()
        .map(|&v| if keep.contains(&v) { v } else { 0 })
        .collect();
    LabelFrame {
        width: frame.width,
        height: frame.height,
        data,
    }
}

/// Write a label frame as grayscale PNG: 8-bit when every value fits, 16-bit otherwise.
pub fn write_label_png<P: AsRef<Path>>(frame: &LabelFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let max = frame.max_label();
    if max > u16::MAX as u32 {
        return Err(TrackError::Export(format!(
            "label value {} does not fit a 16-bit PNG: {}",
            max,
            path.display()
        )));
    }

    let (depth, bytes): (png::BitDepth, Vec<u8>) = if max <= u8::MAX as u32 {
        (
            png::BitDepth::Eight,
            frame.data.iter().map(|&v| v as u8).collect(),
        )
    } else {
        (
            png::BitDepth::Sixteen,
            frame
                .data
                .iter()
                .flat_map(|&v| (v as u16).to_be_bytes())
                .collect(),
        )
    };

    write_png(path, frame.width, frame.height, png::ColorType::Grayscale, depth, &bytes)
}

/// Write an RGB visualization frame as 8-bit PNG.
pub fn write_rgb_png<P: AsRef<Path>>(frame: &VisualizationFrame, path: P) -> Result<()> {
    let image = &frame.image;
    write_png(
        path.as_ref(),
        image.width(),
        image.height(),
        png::ColorType::Rgb,
        png::BitDepth::Eight,
        image.as_raw(),
    )
}

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    color: png::ColorType,
    depth: png::BitDepth,
    data: &[u8],
) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| TrackError::Export(format!("failed to create {}: {}", path.display(), e)))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;
    Ok(())
}

pub fn write_trajectory_csv<P: AsRef<Path>>(rows: &[TrajectoryRow], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportParameters {
    pub acquisition: AcquisitionParams,
    pub filters: FilterConfig,
    pub active_filters: Vec<String>,
}

/// Machine-readable record of one filter run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub dataset: String,
    pub frame_count: usize,
    pub parameters: ReportParameters,
    pub summary: FilterSummary,
    pub outcomes: Vec<FilterOutcome>,
}

impl FilterReport {
    pub fn new(
        dataset: impl Into<String>,
        extracted: &ExtractedSequence,
        config: &FilterConfig,
        result: &FilterResult,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            frame_count: extracted.frame_count(),
            parameters: ReportParameters {
                acquisition: extracted.params,
                filters: config.clone(),
                active_filters: config.describe_active(),
            },
            summary: result.summary,
            outcomes: result.outcomes.values().cloned().collect(),
        }
    }
}

pub fn write_report_json<P: AsRef<Path>>(report: &FilterReport, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

/// Grouped, human-readable summary of a report.
pub fn summary_lines(report: &FilterReport) -> Vec<String> {
    let s = &report.summary;
    let mut lines = vec![format!(
        "Filtering complete: {} objects, {} usable ({} passed, {} truncated), {} excluded",
        s.total_objects,
        s.passed_objects(),
        s.passed,
        s.truncated,
        s.filtered
    )];

    let by_status = |status: FilterStatus| {
        report
            .outcomes
            .iter()
            .filter(move |o| o.status == status)
    };

    let passed: Vec<String> = by_status(FilterStatus::Passed)
        .map(|o| o.id.to_string())
        .collect();
    if !passed.is_empty() {
        lines.push(format!("Fully passed ({}): {}", passed.len(), passed.join(", ")));
    }

    if s.truncated > 0 {
        lines.push(format!("Truncated ({}):", s.truncated));
        for o in by_status(FilterStatus::Truncated) {
            let kept = o.valid_frame_count.unwrap_or(0);
            let percent = if o.original_frame_count > 0 {
                kept as f64 * 100.0 / o.original_frame_count as f64
            } else {
                0.0
            };
            lines.push(format!(
                "  object {}: kept {}/{} frames ({:.1}%), {}",
                o.id, kept, o.original_frame_count, percent, o.reason
            ));
        }
    }

    if s.filtered > 0 {
        lines.push(format!("Excluded ({}):", s.filtered));
        for o in by_status(FilterStatus::Filtered) {
            lines.push(format!("  object {}: {}", o.id, o.reason));
        }
    }
    lines
}

/// Dataset name from the input directory: `masks_sample` becomes `sample`.
pub fn infer_dataset_name(dir: &Path) -> String {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let name = name.strip_prefix("masks_").unwrap_or(name);
    if name.is_empty() {
        "dataset".to_string()
    } else {
        name.to_string()
    }
}

/// Output file layout for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportLayout {
    pub root: PathBuf,
    pub name: String,
}

impl ExportLayout {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    pub fn trajectories_dir(&self) -> PathBuf {
        self.root.join(format!("Trajectories_{}", self.name))
    }

    pub fn masks_dir(&self) -> PathBuf {
        self.root.join(format!("Filtered_Masks_{}", self.name))
    }

    pub fn visualization_dir(&self) -> PathBuf {
        self.root.join(format!("Visualization_{}", self.name))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(format!("filter_report_{}.json", self.name))
    }

    pub fn trajectory_path(&self, id: ObjectId) -> PathBuf {
        self.trajectories_dir().join(format!("Object_{}.csv", id))
    }

    pub fn frame_file_name(frame_index: usize) -> String {
        format!("frame_{:04}.png", frame_index)
    }
}

/// What [`export_results`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub trajectories: usize,
    pub mask_frames: usize,
    pub visualization_frames: usize,
    pub report: PathBuf,
}

/// Write every artifact of a finished run. Frame files are written in parallel.
pub fn export_results(
    layout: &ExportLayout,
    extracted: &ExtractedSequence,
    config: &FilterConfig,
    result: &FilterResult,
    visualization: Option<&[VisualizationFrame]>,
) -> Result<ExportSummary> {
    let trajectories_dir = layout.trajectories_dir();
    let masks_dir = layout.masks_dir();
    std::fs::create_dir_all(&trajectories_dir)?;
    std::fs::create_dir_all(&masks_dir)?;

    result
        .trajectories
        .par_iter()
        .try_for_each(|(id, trajectory)| {
            write_trajectory_csv(&trajectory_table(trajectory), layout.trajectory_path(*id))
        })?;

    let sequence = &extracted.sequence;
    let dimensions = sequence.dimensions().unwrap_or((0, 0));
    (0..sequence.frame_count())
        .into_par_iter()
        .try_for_each(|frame_index| {
            let filtered = match sequence.frame(frame_index) {
                Some(frame) => filtered_label_frame(frame, frame_index, &result.trajectories),
                None => LabelFrame::blank(dimensions.0, dimensions.1),
            };
            write_label_png(
                &filtered,
                masks_dir.join(ExportLayout::frame_file_name(frame_index)),
            )
        })?;

    let mut visualization_frames = 0;
    if let Some(frames) = visualization {
        let dir = layout.visualization_dir();
        std::fs::create_dir_all(&dir)?;
        frames.par_iter().try_for_each(|frame| {
            write_rgb_png(frame, dir.join(ExportLayout::frame_file_name(frame.frame_index)))
        })?;
        visualization_frames = frames.len();
    }

    let report = FilterReport::new(layout.name.clone(), extracted, config, result);
    let report_path = layout.report_path();
    write_report_json(&report, &report_path)?;

    log::info!(
        "exported {} trajectories and {} frames to {}",
        result.trajectories.len(),
        sequence.frame_count(),
        layout.root.display()
    );

    Ok(ExportSummary {
        trajectories: result.trajectories.len(),
        mask_frames: sequence.frame_count(),
        visualization_frames,
        report: report_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::decode_label_image;
    use crate::models::{EllipseAxes, Point2};

    fn feature(frame_index: usize) -> FrameFeature {
        FrameFeature {
            frame_index,
            time: frame_index as f64 * 0.5,
            area_um2: 12.5,
            center_px: Point2::new(4.0, 6.0),
            center_um: Point2::new(2.0, 3.0),
            ellipse: None,
            touches_boundary: false,
            contour: None,
        }
    }

    #[test]
    fn test_row_zero_fills_missing_ellipse() {
        let row = TrajectoryRow::from(&feature(2));
        assert_eq!(row.time, 1.0);
        assert_eq!(row.major_axis, 0.0);
        assert_eq!(row.angle, 0.0);

        let mut f = feature(2);
        f.ellipse = Some(EllipseAxes {
            major_axis_um: 3.0,
            minor_axis_um: 1.0,
            angle_deg: 170.0,
        });
        assert_eq!(TrajectoryRow::from(&f).angle, 170.0);
    }

    #[test]
    fn test_csv_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Object_0.csv");
        write_trajectory_csv(&[TrajectoryRow::from(&feature(0))], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "time (s),area (μm²),center_x (μm),center_y (μm),major axis length (μm),minor axis length (μm),posture angle (°)"
        );
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_filtered_label_frame_keeps_original_values() {
        let frame = LabelFrame::new(4, 1, vec![1, 2, 3, 0]).unwrap();
        let id = ObjectId(1);
        let trajectories = [(
            id,
            FilteredTrajectory {
                id,
                features: vec![feature(0), feature(1)],
            },
        )]
        .into();
        let filtered = filtered_label_frame(&frame, 0, &trajectories);
        assert_eq!(filtered.data, vec![0, 2, 0, 0]);

        let later = filtered_label_frame(&frame, 5, &trajectories);
        assert_eq!(later.data, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_label_png_bit_depth_follows_max_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0000.png");
        let frame = LabelFrame::new(2, 2, vec![0, 300, 7, 0]).unwrap();
        write_label_png(&frame, &path).unwrap();
        assert_eq!(decode_label_image(&path).unwrap(), frame);

        let too_big = LabelFrame::new(1, 1, vec![70_000]).unwrap();
        assert!(matches!(
            write_label_png(&too_big, dir.path().join("big.png")),
            Err(TrackError::Export(_))
        ));
    }

    #[test]
    fn test_infer_dataset_name() {
        assert_eq!(infer_dataset_name(Path::new("/data/masks_sample")), "sample");
        assert_eq!(infer_dataset_name(Path::new("/data/run3")), "run3");
        assert_eq!(infer_dataset_name(Path::new("/")), "dataset");
    }

    #[test]
    fn test_layout_paths() {
        let layout = ExportLayout::new("/out", "sample");
        assert_eq!(
            layout.trajectory_path(ObjectId(4)),
            PathBuf::from("/out/Trajectories_sample/Object_4.csv")
        );
        assert_eq!(ExportLayout::frame_file_name(7), "frame_0007.png");
        assert_eq!(
            layout.report_path(),
            PathBuf::from("/out/filter_report_sample.json")
        );
    }

    #[test]
    fn test_summary_lines_group_outcomes() {
        let outcomes = vec![
            FilterOutcome::passed(ObjectId(0), 10),
            FilterOutcome::truncated(
                ObjectId(1),
                crate::models::FilterReason::BoundaryContact {
                    frame_index: 5,
                    time: 5.0,
                },
                10,
                5,
            ),
            FilterOutcome::filtered(ObjectId(2), crate::models::FilterReason::UserExcluded, 3),
        ];
        let report = FilterReport {
            dataset: "x".into(),
            frame_count: 10,
            parameters: ReportParameters {
                acquisition: AcquisitionParams::default(),
                filters: FilterConfig::default(),
                active_filters: Vec::new(),
            },
            summary: FilterSummary::from_outcomes(&outcomes),
            outcomes,
        };
        let lines = summary_lines(&report);
        assert!(lines[0].contains("3 objects, 2 usable"));
        assert!(lines.iter().any(|l| l == "Fully passed (1): 0"));
        assert!(lines
            .iter()
            .any(|l| l.contains("object 1: kept 5/10 frames (50.0%)")));
        assert!(lines.iter().any(|l| l == "  object 2: user exclusion"));
    }
}
