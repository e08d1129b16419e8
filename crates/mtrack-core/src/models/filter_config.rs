//! Filter configuration: which rules run and with which thresholds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ObjectId;
use crate::error::{Result, TrackError};

/// A `[min, max]` acceptance window that can be switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeFilter {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

impl RangeFilter {
    pub fn enabled(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.min.is_nan() || self.max.is_nan() {
            return Err(TrackError::Config(format!("{name}: bounds must be numbers")));
        }
        if self.min > self.max {
            return Err(TrackError::Config(format!(
                "{name}: min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Consecutive-area ratio threshold in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaChangeFilter {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for AreaChangeFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryFilter {
    pub enabled: bool,
}

/// Minimum contour-to-contour distance to any other object, in µm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceFilter {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for DistanceFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 10.0,
        }
    }
}

/// Complete rule configuration. Everything is disabled by default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub exclude_ids: BTreeSet<ObjectId>,
    pub area_filter: RangeFilter,
    pub area_change_filter: AreaChangeFilter,
    pub velocity_filter: RangeFilter,
    pub displacement_filter: RangeFilter,
    pub boundary_filter: BoundaryFilter,
    pub min_distance_filter: DistanceFilter,
}

impl FilterConfig {
    /// Check thresholds before handing the config to the engine, which assumes valid input.
    pub fn validate(&self) -> Result<()> {
        self.area_filter.validate("area_filter")?;
        self.velocity_filter.validate("velocity_filter")?;
        self.displacement_filter.validate("displacement_filter")?;

        let change = &self.area_change_filter;
        if change.enabled && !(0.0..=1.0).contains(&change.threshold) {
            return Err(TrackError::Config(format!(
                "area_change_filter: threshold must be within [0, 1], got {}",
                change.threshold
            )));
        }

        let distance = &self.min_distance_filter;
        if distance.enabled && !(distance.threshold >= 0.0) {
            return Err(TrackError::Config(format!(
                "min_distance_filter: threshold must be non-negative, got {}",
                distance.threshold
            )));
        }
        Ok(())
    }

    /// Human-readable list of the enabled rules, for logs and status lines.
    pub fn describe_active(&self) -> Vec<String> {
        let mut active = Vec::new();
        if !self.exclude_ids.is_empty() {
            let ids: Vec<String> = self.exclude_ids.iter().map(|id| id.to_string()).collect();
            active.push(format!("excluded ids: {}", ids.join(", ")));
        }
        if self.area_filter.enabled {
            active.push(format!(
                "area range: {} - {} µm²",
                self.area_filter.min, self.area_filter.max
            ));
        }
        if self.area_change_filter.enabled {
            active.push(format!(
                "area change threshold: {}",
                self.area_change_filter.threshold
            ));
        }
        if self.velocity_filter.enabled {
            active.push(format!(
                "velocity range: {} - {} µm/s",
                self.velocity_filter.min, self.velocity_filter.max
            ));
        }
        if self.displacement_filter.enabled {
            active.push(format!(
                "displacement range: {} - {} µm",
                self.displacement_filter.min, self.displacement_filter.max
            ));
        }
        if self.boundary_filter.enabled {
            active.push("boundary contact truncation".to_string());
        }
        if self.min_distance_filter.enabled {
            active.push(format!(
                "minimum distance threshold: {} µm",
                self.min_distance_filter.threshold
            ));
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_and_inactive() {
        let config = FilterConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.describe_active().is_empty());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = FilterConfig {
            velocity_filter: RangeFilter::enabled(10.0, 1.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_range_not_validated() {
        let config = FilterConfig {
            velocity_filter: RangeFilter {
                enabled: false,
                min: 10.0,
                max: 1.0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_area_change_threshold_bounds() {
        let mut config = FilterConfig::default();
        config.area_change_filter = AreaChangeFilter {
            enabled: true,
            threshold: 1.5,
        };
        assert!(config.validate().is_err());
        config.area_change_filter.threshold = 0.7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = "exclude_ids: [2, 7]\narea_filter:\n  enabled: true\n  min: 50\n";
        let config: FilterConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.exclude_ids.contains(&ObjectId(7)));
        assert!(config.area_filter.enabled);
        assert_eq!(config.area_filter.min, 50.0);
        assert_eq!(config.area_filter.max, f64::INFINITY);
    }
}
