//! Progress reporting and cooperative cancellation for long-running stages.
//!
//! Every stage receives a [`ProgressSink`] and a [`CancelToken`] instead of
//! touching shared state. Stages own a slice of the overall percentage range
//! (see [`Stage`]) and report within it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TrackError};
use crate::render::VisualizationFrame;

/// Receiver of progress updates. All methods default to no-ops.
pub trait ProgressSink: Send + Sync {
    /// Overall job percentage, `0..=100`.
    fn percent(&self, _percent: u8) {}

    /// Human-readable status line.
    fn status(&self, _message: &str) {}

    /// Most recently rendered frame, for live preview.
    fn preview(&self, _frame: &VisualizationFrame, _index: usize, _total: usize) {}

    /// Object counts once filtering has finished.
    fn stats(&self, _total_objects: usize, _passed_objects: usize) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Shared "keep running" flag, checked inside every per-frame and per-object loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TrackError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Percentage allocation of each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 0% - 30%
    Load,
    /// 30% - 60%
    Extract,
    /// 60% - 100%
    Render,
}

impl Stage {
    fn span(self) -> (u8, u8) {
        match self {
            Stage::Load => (0, 30),
            Stage::Extract => (30, 60),
            Stage::Render => (60, 100),
        }
    }

    /// Overall percentage after `done` of `total` items of this stage.
    pub fn percent(self, done: usize, total: usize) -> u8 {
        let (start, end) = self.span();
        if total == 0 {
            return start;
        }
        let width = (end - start) as usize;
        start + (done.min(total) * width / total) as u8
    }

    pub fn end(self) -> u8 {
        self.span().1
    }
}

/// Status lines are emitted every this many items, plus on the last one.
pub const STATUS_INTERVAL: usize = 10;

pub(crate) fn should_report(index: usize, total: usize) -> bool {
    index % STATUS_INTERVAL == 0 || index + 1 == total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percent_ranges() {
        assert_eq!(Stage::Load.percent(0, 10), 0);
        assert_eq!(Stage::Load.percent(5, 10), 15);
        assert_eq!(Stage::Extract.percent(0, 10), 30);
        assert_eq!(Stage::Extract.percent(10, 10), 60);
        assert_eq!(Stage::Render.percent(9, 10), 96);
        assert_eq!(Stage::Render.percent(0, 0), 60);
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(TrackError::Cancelled)));
    }

    #[test]
    fn test_status_interval() {
        assert!(should_report(0, 25));
        assert!(!should_report(5, 25));
        assert!(should_report(10, 25));
        assert!(should_report(24, 25));
    }
}
