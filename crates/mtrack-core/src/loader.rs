//! Mask sequence loading.
//!
//! Enumerates per-frame label images in a directory, decodes them in
//! lexicographic (= chronological, given zero-padded names) order and collects
//! the set of object ids seen anywhere in the sequence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decoders::{decode_label_image, LabelFrame, SUPPORTED_EXTENSIONS};
use crate::error::{Result, TrackError};
use crate::models::ObjectId;
use crate::progress::{should_report, CancelToken, ProgressSink, Stage};

/// Naming convention for per-frame mask files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    /// Required file name prefix, e.g. `frame_` for `frame_0001.png`.
    pub file_prefix: String,
    /// Accepted extensions (case-insensitive).
    pub extensions: Vec<String>,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            file_prefix: "frame_".to_string(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl InputOptions {
    fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        name.starts_with(&self.file_prefix)
            && self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }
}

/// A frame that exists on disk but could not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeWarning {
    pub frame_index: usize,
    pub path: PathBuf,
    pub message: String,
}

/// Loaded label frames, in frame order. Undecodable frames are kept as gaps.
#[derive(Debug, Clone)]
pub struct MaskSequence {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub frames: Vec<Option<LabelFrame>>,
    pub object_ids: BTreeSet<ObjectId>,
    pub warnings: Vec<DecodeWarning>,
}

impl MaskSequence {
    /// Build a sequence from frames already in memory.
    pub fn from_frames(frames: Vec<Option<LabelFrame>>) -> Self {
        let object_ids = frames
            .iter()
            .flatten()
            .flat_map(|frame| frame.object_ids())
            .collect();
        Self {
            dir: PathBuf::new(),
            files: Vec::new(),
            frames,
            object_ids,
            warnings: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&LabelFrame> {
        self.frames.get(index).and_then(Option::as_ref)
    }

    pub fn decoded_count(&self) -> usize {
        self.frames.iter().flatten().count()
    }

    /// Dimensions of the first decoded frame, used for gap frames.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames
            .iter()
            .flatten()
            .next()
            .map(|frame| (frame.width, frame.height))
    }
}

/// List matching mask files, sorted lexicographically by file name.
pub fn list_mask_files(dir: &Path, options: &InputOptions) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| TrackError::load(dir, format!("failed to read directory: {}", e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| TrackError::load(dir, format!("error reading entry: {}", e)))?;
        let path = entry.path();
        if path.is_file() && options.matches(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(TrackError::load(
            dir,
            format!(
                "no mask images named {}*.{{{}}} found",
                options.file_prefix,
                options.extensions.join(",")
            ),
        ));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every mask image in `dir`.
///
/// Fails only when no matching files exist (or none decodes). Individual
/// undecodable files are logged, recorded as [`DecodeWarning`]s and left as
/// gaps so frame indices keep matching file positions.
pub fn load_mask_sequence(
    dir: &Path,
    options: &InputOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<MaskSequence> {
    sink.status("Loading mask images...");
    sink.percent(Stage::Load.percent(0, 1));

    let files = list_mask_files(dir, options)?;
    let total = files.len();
    sink.status(&format!("Found {} mask images", total));

    let mut frames = Vec::with_capacity(total);
    let mut object_ids = BTreeSet::new();
    let mut warnings = Vec::new();

    for (index, path) in files.iter().enumerate() {
        cancel.check()?;
        sink.percent(Stage::Load.percent(index, total));

        match decode_label_image(path) {
            Ok(frame) => {
                object_ids.extend(frame.object_ids());
                frames.push(Some(frame));
            }
            Err(err) => {
                log::warn!("skipping frame {}: {}", index, err);
                sink.status(&format!(
                    "Warning: could not read mask file {}",
                    path.display()
                ));
                warnings.push(DecodeWarning {
                    frame_index: index,
                    path: path.clone(),
                    message: err.to_string(),
                });
                frames.push(None);
            }
        }

        if should_report(index, total) {
            sink.status(&format!("Loaded {}/{} mask images", index + 1, total));
        }
    }

    if frames.iter().all(Option::is_none) {
        return Err(TrackError::load(dir, "none of the mask images could be decoded"));
    }

    sink.percent(Stage::Load.end());
    sink.status(&format!("Detected {} objects", object_ids.len()));
    log::info!(
        "loaded {} frames ({} skipped) with {} objects from {}",
        total,
        warnings.len(),
        object_ids.len(),
        dir.display()
    );

    Ok(MaskSequence {
        dir: dir.to_path_buf(),
        files,
        frames,
        object_ids,
        warnings,
    })
}
