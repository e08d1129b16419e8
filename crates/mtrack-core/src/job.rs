//! Background execution of the pipeline.
//!
//! [`FilterJob::spawn`] runs [`run_pipeline`] on its own thread and reports
//! through a channel of [`JobEvent`]s. The last event is always
//! [`JobEvent::Finished`]; results are collected with [`JobHandle::join`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::error::{Result, TrackError};
use crate::pipeline::{run_pipeline, PipelineOutput, PipelineRequest};
use crate::progress::{CancelToken, ProgressSink};
use crate::render::VisualizationFrame;

pub type JobOutput = PipelineOutput;

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(u8),
    Status(String),
    Preview {
        frame: VisualizationFrame,
        index: usize,
        total: usize,
    },
    Stats {
        total_objects: usize,
        passed_objects: usize,
    },
    Finished {
        success: bool,
        message: String,
    },
}

/// Forwards progress to a channel. A dropped receiver is not an error.
struct ChannelSink {
    tx: Sender<JobEvent>,
}

impl ChannelSink {
    fn send(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn percent(&self, percent: u8) {
        self.send(JobEvent::Progress(percent));
    }

    fn status(&self, message: &str) {
        self.send(JobEvent::Status(message.to_string()));
    }

    fn preview(&self, frame: &VisualizationFrame, index: usize, total: usize) {
        self.send(JobEvent::Preview {
            frame: frame.clone(),
            index,
            total,
        });
    }

    fn stats(&self, total_objects: usize, passed_objects: usize) {
        self.send(JobEvent::Stats {
            total_objects,
            passed_objects,
        });
    }
}

pub struct FilterJob;

impl FilterJob {
    /// Start the pipeline on a background thread.
    pub fn spawn(request: PipelineRequest) -> Result<JobHandle> {
        let (tx, events) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let thread = thread::Builder::new()
            .name("mtrack-job".to_string())
            .spawn(move || {
                let sink = ChannelSink { tx };
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_pipeline(&request, &sink, &token)
                }))
                .unwrap_or_else(|payload| Err(TrackError::Unexpected(panic_message(payload))));

                let finished = match &outcome {
                    Ok(output) => JobEvent::Finished {
                        success: true,
                        message: format!(
                            "Processing complete: {} of {} objects usable",
                            output.result.summary.passed_objects(),
                            output.result.summary.total_objects
                        ),
                    },
                    Err(err) => {
                        log::error!("job failed: {}", err);
                        JobEvent::Finished {
                            success: false,
                            message: err.to_string(),
                        }
                    }
                };
                sink.send(finished);
                outcome
            })?;

        Ok(JobHandle {
            events,
            cancel,
            thread,
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Handle to a running [`FilterJob`].
pub struct JobHandle {
    events: Receiver<JobEvent>,
    cancel: CancelToken,
    thread: JoinHandle<Result<JobOutput>>,
}

impl JobHandle {
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Ask the job to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the job and take its result.
    pub fn join(self) -> Result<JobOutput> {
        self.thread
            .join()
            .unwrap_or_else(|payload| Err(TrackError::Unexpected(panic_message(payload))))
    }
}
