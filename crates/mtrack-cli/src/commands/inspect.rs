use std::path::PathBuf;

use serde::Serialize;

use mtrack_core::progress::{CancelToken, NullSink};
use mtrack_core::{extract_features, load_mask_sequence, ObjectFeatureSeries};

use super::resolve_config;
use crate::types::Overrides;

/// Per-object overview printed by `mtrack inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ObjectSummary {
    id: u32,
    frames: usize,
    first_frame: usize,
    last_frame: usize,
    mean_area_um2: f64,
    boundary_frames: usize,
}

impl ObjectSummary {
    fn from_series(series: &ObjectFeatureSeries) -> Option<Self> {
        let first = series.features.first()?;
        let last = series.features.last()?;
        let total_area: f64 = series.features.iter().map(|f| f.area_um2).sum();
        Some(Self {
            id: series.id.0,
            frames: series.len(),
            first_frame: first.frame_index,
            last_frame: last.frame_index,
            mean_area_um2: total_area / series.len() as f64,
            boundary_frames: series
                .features
                .iter()
                .filter(|f| f.touches_boundary)
                .count(),
        })
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    input: PathBuf,
    frames: usize,
    decoded_frames: usize,
    width: u32,
    height: u32,
    objects: Vec<ObjectSummary>,
    warnings: Vec<String>,
}

/// Load and extract a mask directory without filtering, then describe every object.
pub fn cmd_inspect(
    input: PathBuf,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    json_output: bool,
) -> Result<(), String> {
    let config = resolve_config(config_path.as_deref(), &overrides)?;
    let cancel = CancelToken::new();

    let sequence = load_mask_sequence(&input, &config.input, &NullSink, &cancel)
        .map_err(|e| format!("Failed to load masks: {}", e))?;
    let extracted = extract_features(sequence, config.acquisition, &NullSink, &cancel)
        .map_err(|e| format!("Feature extraction failed: {}", e))?;

    let (width, height) = extracted.sequence.dimensions().unwrap_or((0, 0));
    let report = InspectReport {
        input: input.clone(),
        frames: extracted.frame_count(),
        decoded_frames: extracted.sequence.decoded_count(),
        width,
        height,
        objects: extracted
            .series
            .values()
            .filter_map(ObjectSummary::from_series)
            .collect(),
        warnings: extracted
            .sequence
            .warnings
            .iter()
            .map(|w| format!("frame {}: {}", w.frame_index + 1, w.message))
            .collect(),
    };

    if json_output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize inspection: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Inspecting: {}\n", input.display());
    println!(
        "Frames: {} ({} decoded), {}x{} px",
        report.frames, report.decoded_frames, width, height
    );
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    println!("\nObjects: {}", report.objects.len());
    if report.objects.is_empty() {
        return Ok(());
    }

    println!(
        "  {:>6}  {:>6}  {:>6}  {:>6}  {:>12}  {:>8}",
        "id", "frames", "first", "last", "mean area", "boundary"
    );
    for o in &report.objects {
        println!(
            "  {:>6}  {:>6}  {:>6}  {:>6}  {:>12.2}  {:>8}",
            o.id,
            o.frames,
            o.first_frame + 1,
            o.last_frame + 1,
            o.mean_area_um2,
            o.boundary_frames
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtrack_core::models::{FrameFeature, ObjectId, Point2};

    fn feature(frame_index: usize, area_um2: f64, touches_boundary: bool) -> FrameFeature {
        FrameFeature {
            frame_index,
            time: frame_index as f64,
            area_um2,
            center_px: Point2::new(0.0, 0.0),
            center_um: Point2::new(0.0, 0.0),
            ellipse: None,
            touches_boundary,
            contour: None,
        }
    }

    #[test]
    fn test_object_summary() {
        let series = ObjectFeatureSeries {
            id: ObjectId(4),
            features: vec![
                feature(2, 10.0, false),
                feature(3, 20.0, true),
                feature(6, 30.0, false),
            ],
        };
        let summary = ObjectSummary::from_series(&series).unwrap();
        assert_eq!(summary.id, 4);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.first_frame, 2);
        assert_eq!(summary.last_frame, 6);
        assert!((summary.mean_area_um2 - 20.0).abs() < 1e-9);
        assert_eq!(summary.boundary_frames, 1);

        assert!(ObjectSummary::from_series(&ObjectFeatureSeries::new(ObjectId(1))).is_none());
    }
}
