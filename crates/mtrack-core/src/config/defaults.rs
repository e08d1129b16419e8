//! Configuration file structure, defaults and sanitization.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::InputOptions;
use crate::models::{AcquisitionParams, FilterConfig};
use crate::render::RenderOptions;

/// Complete configuration file structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub acquisition: AcquisitionParams,
    pub input: InputOptions,
    pub filters: FilterConfig,
    pub render: RenderOptions,
}

impl TrackConfig {
    /// Clamp rendering knobs into usable ranges. Numeric filter thresholds are
    /// left alone; those go through [`TrackConfig::validate`].
    pub(crate) fn sanitize(mut self) -> Self {
        self.render.line_thickness = self.render.line_thickness.clamp(1, 16);
        self.render.label_scale = self.render.label_scale.clamp(1, 16);
        self.render.preview_interval = self.render.preview_interval.max(1);
        if self.input.extensions.is_empty() {
            self.input.extensions = InputOptions::default().extensions;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.acquisition.validate()?;
        self.filters.validate()
    }
}

/// Commented configuration written by `mtrack init`. Parses to [`TrackConfig::default`].
pub const DEFAULT_CONFIG_YAML: &str = r#"# mtrack configuration
#
# Searched in order: --config, $MTRACK_CONFIG, ./config/mtrack.yml,
# ./mtrack.yml, ~/mtrack/mtrack.yml. Command-line flags override these values.

acquisition:
  fps: 1.0            # frames per second of the recording
  um_per_pixel: 1.0   # physical edge length of one pixel

input:
  file_prefix: "frame_"
  extensions: [png, tif, tiff]

filters:
  # Object ids as exported (pixel value - 1).
  exclude_ids: []
  area_filter:
    enabled: false
    min: 0.0          # µm²
    max: .inf
  area_change_filter:
    enabled: false
    threshold: 0.5    # min(a, b) / max(a, b) between consecutive frames
  velocity_filter:
    enabled: false
    min: 0.0          # µm/s
    max: .inf
  displacement_filter:
    enabled: false
    min: 0.0          # µm, first to last valid frame
    max: .inf
  boundary_filter:
    enabled: false
  min_distance_filter:
    enabled: false
    threshold: 10.0   # µm

render:
  palette_seed: 42
  line_thickness: 2
  label_scale: 2
  preview_interval: 10
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_matches_defaults() {
        let parsed: TrackConfig = serde_yaml::from_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(parsed, TrackConfig::default());
    }

    #[test]
    fn test_sanitize_clamps_render_options() {
        let mut config = TrackConfig::default();
        config.render.line_thickness = 0;
        config.render.label_scale = 100;
        config.render.preview_interval = 0;
        config.input.extensions.clear();

        let config = config.sanitize();
        assert_eq!(config.render.line_thickness, 1);
        assert_eq!(config.render.label_scale, 16);
        assert_eq!(config.render.preview_interval, 1);
        assert_eq!(config.input.extensions, InputOptions::default().extensions);
    }
}
