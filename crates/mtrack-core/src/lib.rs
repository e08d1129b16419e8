//! mtrack Core Library
//!
//! Trajectory extraction and filtering for per-frame object label images:
//! load a mask sequence, measure every object in every frame, decide which
//! part of each trajectory is valid, and render or export the result.

pub mod config;
pub mod decoders;
pub mod error;
pub mod exporters;
pub mod features;
pub mod filter;
pub mod geometry;
pub mod job;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod render;

// Re-export commonly used types
pub use error::{Result, TrackError};
pub use features::{extract_features, ExtractedSequence};
pub use filter::{apply_filters, FilterResult};
pub use job::{FilterJob, JobEvent, JobHandle, JobOutput};
pub use loader::{load_mask_sequence, InputOptions, MaskSequence};
pub use models::{
    AcquisitionParams, FilterConfig, FilterOutcome, FilterReason, FilterStatus, FilterSummary,
    FilteredTrajectory, FrameFeature, ObjectFeatureSeries, ObjectId,
};
pub use pipeline::{run_pipeline, PipelineOutput, PipelineRequest};
pub use progress::{CancelToken, NullSink, ProgressSink};
pub use render::{RenderOptions, VisualizationFrame};
