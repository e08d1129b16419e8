//! Command-line overrides for configuration file values.

use mtrack_core::config::TrackConfig;
use mtrack_core::models::{AreaChangeFilter, BoundaryFilter, DistanceFilter, RangeFilter};

use crate::parsers::{parse_id_list, parse_range};

/// Filter and acquisition flags shared by `filter` and `inspect`.
/// Every field left `None`/`false` keeps the config file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub fps: Option<f64>,
    pub um_per_pixel: Option<f64>,
    pub exclude: Option<String>,
    pub area: Option<String>,
    pub area_change: Option<f64>,
    pub velocity: Option<String>,
    pub displacement: Option<String>,
    pub boundary: bool,
    pub min_distance: Option<f64>,
}

impl Overrides {
    /// Apply the flags on top of `config`. Enabling a filter from the command line
    /// also switches it on.
    pub fn apply(&self, config: &mut TrackConfig) -> Result<(), String> {
        if let Some(fps) = self.fps {
            config.acquisition.fps = fps;
        }
        if let Some(um) = self.um_per_pixel {
            config.acquisition.um_per_pixel = um;
        }

        let filters = &mut config.filters;
        if let Some(ids) = &self.exclude {
            filters.exclude_ids.extend(parse_id_list(ids)?);
        }
        if let Some(range) = &self.area {
            let (min, max) = parse_range(range)?;
            filters.area_filter = RangeFilter::enabled(min, max);
        }
        if let Some(threshold) = self.area_change {
            filters.area_change_filter = AreaChangeFilter {
                enabled: true,
                threshold,
            };
        }
        if let Some(range) = &self.velocity {
            let (min, max) = parse_range(range)?;
            filters.velocity_filter = RangeFilter::enabled(min, max);
        }
        if let Some(range) = &self.displacement {
            let (min, max) = parse_range(range)?;
            filters.displacement_filter = RangeFilter::enabled(min, max);
        }
        if self.boundary {
            filters.boundary_filter = BoundaryFilter { enabled: true };
        }
        if let Some(threshold) = self.min_distance {
            filters.min_distance_filter = DistanceFilter {
                enabled: true,
                threshold,
            };
        }

        config.validate().map_err(|e| e.to_string())
    }
}
