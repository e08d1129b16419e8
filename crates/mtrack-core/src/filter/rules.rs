use std::ops::ControlFlow;

use super::{RuleInput, Window};
use crate::geometry::approx_contour_distance;
use crate::models::{FilterReason, FrameFeature, ObjectId};

/// One step of the filter fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    ExcludeId,
    AreaRange,
    AreaChange,
    Velocity,
    Displacement,
    Boundary,
    MinDistance,
}

type Step = ControlFlow<FilterReason, Window>;

impl Rule {
    /// Fixed evaluation order. Later rules only see what earlier rules kept.
    pub const ORDER: [Rule; 7] = [
        Rule::ExcludeId,
        Rule::AreaRange,
        Rule::AreaChange,
        Rule::Velocity,
        Rule::Displacement,
        Rule::Boundary,
        Rule::MinDistance,
    ];

    /// Whether the rule does anything under the given config.
    pub fn is_enabled(self, input: &RuleInput<'_>) -> bool {
        let config = input.config;
        match self {
            Rule::ExcludeId => true,
            Rule::AreaRange => config.area_filter.enabled,
            Rule::AreaChange => config.area_change_filter.enabled,
            Rule::Velocity => config.velocity_filter.enabled,
            Rule::Displacement => config.displacement_filter.enabled,
            Rule::Boundary => config.boundary_filter.enabled,
            Rule::MinDistance => config.min_distance_filter.enabled,
        }
    }

    pub fn apply(self, window: Window, input: &RuleInput<'_>) -> Step {
        if !self.is_enabled(input) {
            return ControlFlow::Continue(window);
        }
        match self {
            Rule::ExcludeId => exclude_id(window, input),
            Rule::AreaRange => area_range(window, input),
            Rule::AreaChange => area_change(window, input),
            Rule::Velocity => velocity(window, input),
            Rule::Displacement => displacement(window, input),
            Rule::Boundary => boundary(window, input),
            Rule::MinDistance => min_distance(window, input),
        }
    }
}

fn feature<'a>(input: &RuleInput<'a>, position: usize) -> &'a FrameFeature {
    &input.series.features[position]
}

fn exclude_id(window: Window, input: &RuleInput<'_>) -> Step {
    if input.config.exclude_ids.contains(&input.series.id) {
        return ControlFlow::Break(FilterReason::UserExcluded);
    }
    if input.series.is_empty() {
        return ControlFlow::Break(FilterReason::NoFeatureData);
    }
    ControlFlow::Continue(window)
}

fn area_range(window: Window, input: &RuleInput<'_>) -> Step {
    let range = &input.config.area_filter;
    let mut invalid = window
        .valid
        .clone()
        .filter(|&pos| !range.contains(feature(input, pos).area_um2));

    let Some(first) = invalid.next() else {
        return ControlFlow::Continue(window);
    };
    let invalid_count = 1 + invalid.count();
    if invalid_count == window.len() {
        return ControlFlow::Break(FilterReason::AreaOutOfRange {
            min: range.min,
            max: range.max,
        });
    }

    let f = feature(input, first);
    let reason = FilterReason::AreaRangeTruncated {
        area_um2: f.area_um2,
        min: range.min,
        max: range.max,
        frame_index: f.frame_index,
        time: f.time,
    };
    ControlFlow::Continue(window.truncate_before(first, reason))
}

fn area_change(window: Window, input: &RuleInput<'_>) -> Step {
    let threshold = input.config.area_change_filter.threshold;
    for pos in window.valid.clone().skip(1) {
        let a = feature(input, pos - 1).area_um2;
        let b = feature(input, pos);
        // A zero area carries no ratio information.
        if a <= 0.0 || b.area_um2 <= 0.0 {
            continue;
        }
        let ratio = a.min(b.area_um2) / a.max(b.area_um2);
        if ratio < threshold {
            let reason = FilterReason::AreaChange {
                ratio,
                threshold,
                frame_index: b.frame_index,
                time: b.time,
            };
            return ControlFlow::Continue(window.truncate_before(pos, reason));
        }
    }
    ControlFlow::Continue(window)
}

fn velocity(window: Window, input: &RuleInput<'_>) -> Step {
    let range = &input.config.velocity_filter;
    for pos in window.valid.clone().skip(1) {
        let prev = feature(input, pos - 1);
        let cur = feature(input, pos);
        let dt = (cur.frame_index as f64 - prev.frame_index as f64) / input.params.fps;
        if !(dt > 0.0) {
            continue;
        }
        let speed = prev.center_um.distance(cur.center_um) / dt;
        if !range.contains(speed) {
            let reason = FilterReason::Velocity {
                velocity: speed,
                min: range.min,
                max: range.max,
                frame_index: cur.frame_index,
                time: cur.time,
            };
            return ControlFlow::Continue(window.truncate_before(pos, reason));
        }
    }
    ControlFlow::Continue(window)
}

fn displacement(window: Window, input: &RuleInput<'_>) -> Step {
    if window.len() < 2 {
        return ControlFlow::Continue(window);
    }
    let range = &input.config.displacement_filter;
    let first = feature(input, window.valid.start);
    let last = feature(input, window.valid.end - 1);
    let total = first.center_um.distance(last.center_um);
    if range.contains(total) {
        ControlFlow::Continue(window)
    } else {
        ControlFlow::Break(FilterReason::Displacement {
            displacement: total,
            min: range.min,
            max: range.max,
        })
    }
}

fn boundary(window: Window, input: &RuleInput<'_>) -> Step {
    let hit = window
        .valid
        .clone()
        .find(|&pos| feature(input, pos).touches_boundary);
    match hit {
        Some(pos) => {
            let f = feature(input, pos);
            let reason = FilterReason::BoundaryContact {
                frame_index: f.frame_index,
                time: f.time,
            };
            ControlFlow::Continue(window.truncate_before(pos, reason))
        }
        None => ControlFlow::Continue(window),
    }
}

/// Closest other object in the same frame, if any comes within `threshold` µm.
fn closest_neighbor(
    input: &RuleInput<'_>,
    f: &FrameFeature,
    threshold: f64,
) -> Option<(ObjectId, f64)> {
    let contour = f.contour.as_ref()?;
    input
        .lookup
        .others(f.frame_index, input.series.id)
        .filter_map(|(other, g)| {
            let distance = approx_contour_distance(contour, g.contour.as_ref()?);
            Some((other, distance * input.params.um_per_pixel))
        })
        .filter(|(_, distance_um)| *distance_um < threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn min_distance(window: Window, input: &RuleInput<'_>) -> Step {
    let threshold = input.config.min_distance_filter.threshold;
    for pos in window.valid.clone() {
        let f = feature(input, pos);
        if let Some((neighbor, distance_um)) = closest_neighbor(input, f, threshold) {
            let reason = FilterReason::TooClose {
                neighbor,
                distance_um,
                threshold,
                frame_index: f.frame_index,
                time: f.time,
            };
            return ControlFlow::Continue(window.truncate_before(pos, reason));
        }
    }
    ControlFlow::Continue(window)
}
