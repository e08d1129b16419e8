//! Filter engine.
//!
//! Every object starts with its whole feature series as the valid window.
//! [`Rule::ORDER`] is folded over that window: a rule either narrows it to a
//! shorter prefix (truncation) or breaks out of the fold with an exclusion
//! reason. Whatever survives with at least two frames becomes a
//! [`FilteredTrajectory`].

mod rules;


use std::collections::BTreeMap;
use std::ops::{ControlFlow, Range};

pub use rules::Rule;

use crate::error::Result;
use crate::models::{
    AcquisitionParams, FilterConfig, FilterOutcome, FilterReason, FilterSummary,
    FilteredTrajectory, FrameFeature, ObjectFeatureSeries, ObjectId,
};
use crate::progress::CancelToken;

/// Trajectories need at least this many frames to be usable.
pub const MIN_VALID_FRAMES: usize = 2;

/// Raw (unfiltered) detections of every object, grouped by physical frame.
#[derive(Debug, Default)]
pub struct FrameLookup<'a> {
    frames: BTreeMap<usize, Vec<(ObjectId, &'a FrameFeature)>>,
}

impl<'a> FrameLookup<'a> {
    pub fn new(series: &'a BTreeMap<ObjectId, ObjectFeatureSeries>) -> Self {
        let mut frames: BTreeMap<usize, Vec<(ObjectId, &FrameFeature)>> = BTreeMap::new();
        for (id, s) in series {
            for feature in &s.features {
                frames
                    .entry(feature.frame_index)
                    .or_default()
                    .push((*id, feature));
            }
        }
        Self { frames }
    }

    /// Every object other than `id` detected in `frame_index`.
    pub fn others(
        &self,
        frame_index: usize,
        id: ObjectId,
    ) -> impl Iterator<Item = (ObjectId, &'a FrameFeature)> + '_ {
        self.frames
            .get(&frame_index)
            .into_iter()
            .flatten()
            .filter(move |(other, _)| *other != id)
            .copied()
    }
}

/// The state threaded through the rule fold.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Positions into the object's own series. Always a prefix.
    pub valid: Range<usize>,
    /// Reason of the latest truncation, if any rule shortened the window.
    pub truncation: Option<FilterReason>,
}

impl Window {
    fn full(len: usize) -> Self {
        Self {
            valid: 0..len,
            truncation: None,
        }
    }

    /// Keep only positions before `position`.
    fn truncate_before(self, position: usize, reason: FilterReason) -> Self {
        Self {
            valid: self.valid.start..position.min(self.valid.end),
            truncation: Some(reason),
        }
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }
}

/// Everything a rule may look at for one object.
pub struct RuleInput<'a> {
    pub series: &'a ObjectFeatureSeries,
    pub config: &'a FilterConfig,
    pub params: &'a AcquisitionParams,
    pub lookup: &'a FrameLookup<'a>,
}

/// Outcome of filtering every object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResult {
    pub outcomes: BTreeMap<ObjectId, FilterOutcome>,
    pub trajectories: BTreeMap<ObjectId, FilteredTrajectory>,
    pub summary: FilterSummary,
}

/// Apply `config` to every object series.
///
/// Pure apart from cancellation: the same inputs always produce the same result.
pub fn apply_filters(
    series: &BTreeMap<ObjectId, ObjectFeatureSeries>,
    config: &FilterConfig,
    params: &AcquisitionParams,
    cancel: &CancelToken,
) -> Result<FilterResult> {
    let lookup = FrameLookup::new(series);
    let mut outcomes = BTreeMap::new();
    let mut trajectories = BTreeMap::new();

    for (id, object) in series {
        cancel.check()?;
        let (outcome, trajectory) = evaluate_object(object, config, params, &lookup);
        log::debug!("object {}: {} ({})", id, outcome.status, outcome.reason);
        if let Some(trajectory) = trajectory {
            trajectories.insert(*id, trajectory);
        }
        outcomes.insert(*id, outcome);
    }

    let summary = FilterSummary::from_outcomes(outcomes.values());
    log::info!(
        "filtered {} objects: {} passed, {} truncated, {} excluded",
        summary.total_objects,
        summary.passed,
        summary.truncated,
        summary.filtered
    );

    Ok(FilterResult {
        outcomes,
        trajectories,
        summary,
    })
}

/// Run every rule, in order, against one object.
pub fn evaluate_object(
    series: &ObjectFeatureSeries,
    config: &FilterConfig,
    params: &AcquisitionParams,
    lookup: &FrameLookup<'_>,
) -> (FilterOutcome, Option<FilteredTrajectory>) {
    let id = series.id;
    let original = series.len();
    let input = RuleInput {
        series,
        config,
        params,
        lookup,
    };

    let folded = Rule::ORDER
        .iter()
        .try_fold(Window::full(original), |window, rule| {
            rule.apply(window, &input)
        });

    let window = match folded {
        ControlFlow::Continue(window) => window,
        ControlFlow::Break(reason) => {
            return (FilterOutcome::filtered(id, reason, original), None);
        }
    };

    if window.len() < MIN_VALID_FRAMES {
        let reason = FilterReason::InsufficientFrames {
            valid_frames: window.len(),
        };
        return (FilterOutcome::filtered(id, reason, original), None);
    }

    let trajectory = FilteredTrajectory {
        id,
        features: series.features[window.valid.clone()].to_vec(),
    };
    let valid_len = window.len();
    let outcome = match window.truncation {
        Some(reason) => FilterOutcome::truncated(id, reason, original, valid_len),
        None => FilterOutcome::passed(id, original),
    };
    (outcome, Some(trajectory))
}
