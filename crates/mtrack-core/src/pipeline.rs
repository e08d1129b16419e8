//! The synchronous load -> extract -> filter -> render pipeline.

use std::path::PathBuf;

use crate::error::Result;
use crate::exporters::{infer_dataset_name, summary_lines, FilterReport};
use crate::features::{extract_features, ExtractedSequence};
use crate::filter::FilterResult;
use crate::loader::{load_mask_sequence, InputOptions};
use crate::models::{AcquisitionParams, FilterConfig};
use crate::progress::{CancelToken, ProgressSink};
use crate::render::{render_sequence, RenderOptions, VisualizationFrame};

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub input_dir: PathBuf,
    pub input: InputOptions,
    pub params: AcquisitionParams,
    pub filters: FilterConfig,
    pub render: RenderOptions,
    /// Skip the render stage entirely when false.
    pub visualize: bool,
}

impl PipelineRequest {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            input: InputOptions::default(),
            params: AcquisitionParams::default(),
            filters: FilterConfig::default(),
            render: RenderOptions::default(),
            visualize: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.filters.validate()
    }

    pub fn dataset_name(&self) -> String {
        infer_dataset_name(&self.input_dir)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub extracted: ExtractedSequence,
    pub result: FilterResult,
    /// Empty when visualization was disabled.
    pub visualization: Vec<VisualizationFrame>,
    pub report: FilterReport,
}

/// Run every stage in order on the calling thread.
pub fn run_pipeline(
    request: &PipelineRequest,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<PipelineOutput> {
    request.validate()?;

    let sequence = load_mask_sequence(&request.input_dir, &request.input, sink, cancel)?;
    let extracted = extract_features(sequence, request.params, sink, cancel)?;

    sink.status("Applying filters...");
    for line in request.filters.describe_active() {
        sink.status(&format!("  {}", line));
    }
    let result = extracted.refilter(&request.filters, cancel)?;
    sink.stats(result.summary.total_objects, result.summary.passed_objects());

    let visualization = if request.visualize {
        render_sequence(&extracted, &result.trajectories, &request.render, sink, cancel)?
    } else {
        Vec::new()
    };

    let report = FilterReport::new(request.dataset_name(), &extracted, &request.filters, &result);
    for line in summary_lines(&report) {
        sink.status(&line);
    }
    sink.percent(100);

    Ok(PipelineOutput {
        extracted,
        result,
        visualization,
        report,
    })
}
