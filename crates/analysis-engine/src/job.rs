//! Background analysis lanes.
//!
//! Each lane runs at most one job at a time on its own thread. Starting a
//! new job supersedes the running one: its cancellation flag is raised and
//! anything it still sends is dropped, because every message carries the
//! generation of the job that produced it.
//!
//! Where threads are unavailable (`wasm32`), the job runs elsewhere and its
//! envelopes are fed back with `ingest`; the same generation filter applies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::progress::ProgressSink;
use crate::types::{AnalysisError, ProgressEvent};

/// Independent analysis pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// One source point against the visible targets.
    Point,
    /// Mutual visibility between the source and target sets.
    Volume,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Point => "point",
            Lane::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// What a worker sends back to its lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage<R> {
    Progress(ProgressEvent),
    Result(R),
    Failed { reason: String },
}

impl<R> WorkerMessage<R> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress(_))
    }
}

/// A worker message tagged with the generation of the job that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<R> {
    pub generation: u64,
    pub message: WorkerMessage<R>,
}

/// Handed to a running job: forwards progress and exposes the cancellation
/// flag.
pub struct WorkerContext<R> {
    generation: u64,
    sender: Sender<Envelope<R>>,
    cancelled: Arc<AtomicBool>,
}

impl<R> WorkerContext<R> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn send(&self, message: WorkerMessage<R>) {
        let envelope = Envelope {
            generation: self.generation,
            message,
        };
        if self.sender.send(envelope).is_err() {
            debug!(generation = self.generation, "lane controller gone, message dropped");
        }
    }
}

impl<R> ProgressSink for WorkerContext<R> {
    fn progress(&mut self, event: ProgressEvent) {
        self.send(WorkerMessage::Progress(event));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

struct JobHandle {
    generation: u64,
    cancelled: Arc<AtomicBool>,
    // Detached on drop; a cancelled job exits at its next cancellation check.
    // `None` for jobs run outside the controller.
    _thread: Option<JoinHandle<()>>,
}

/// Owns the current job of one lane and filters its message stream.
pub struct LaneController<R> {
    lane: Lane,
    state: LaneState,
    last_generation: u64,
    current: Option<JobHandle>,
    sender: Sender<Envelope<R>>,
    receiver: Receiver<Envelope<R>>,
    last_progress: Option<ProgressEvent>,
}

impl<R: Send + 'static> LaneController<R> {
    pub fn new(lane: Lane) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            lane,
            state: LaneState::Idle,
            last_generation: 0,
            current: None,
            sender,
            receiver,
            last_progress: None,
        }
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn state(&self) -> LaneState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Generation of the running job, if any.
    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|job| job.generation)
    }

    pub fn last_progress(&self) -> Option<ProgressEvent> {
        self.last_progress
    }

    /// Cancel whatever is running and start `job` on a fresh thread.
    /// Returns the new job's generation.
    #[instrument(skip(self, job), fields(lane = self.lane.as_str()))]
    pub fn start<F>(&mut self, job: F) -> Result<u64, AnalysisError>
    where
        F: FnOnce(&mut WorkerContext<R>) -> Result<R, AnalysisError> + Send + 'static,
    {
        self.cancel();

        let generation = self.next_generation();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut ctx = WorkerContext {
            generation,
            sender: self.sender.clone(),
            cancelled: Arc::clone(&cancelled),
        };

        let thread = thread::Builder::new()
            .name(format!("{}-analysis-{}", self.lane.as_str(), generation))
            .spawn(move || match job(&mut ctx) {
                Ok(result) => ctx.send(WorkerMessage::Result(result)),
                Err(AnalysisError::Cancelled) => {
                    debug!(generation, "analysis stopped after cancellation");
                }
                Err(e) => {
                    warn!(generation, error = %e, "analysis failed");
                    ctx.send(WorkerMessage::Failed {
                        reason: e.to_string(),
                    });
                }
            })?;

        self.current = Some(JobHandle {
            generation,
            cancelled,
            _thread: Some(thread),
        });
        self.state = LaneState::Running;
        self.last_progress = None;
        info!(generation, "analysis started");
        Ok(generation)
    }

    /// Cancel whatever is running and reserve a generation for a job that
    /// runs elsewhere, e.g. in a Web Worker. Its messages come back through
    /// [`LaneController::ingest`].
    #[instrument(skip(self), fields(lane = self.lane.as_str()))]
    pub fn begin_external(&mut self) -> u64 {
        self.cancel();

        let generation = self.next_generation();
        self.current = Some(JobHandle {
            generation,
            cancelled: Arc::new(AtomicBool::new(false)),
            _thread: None,
        });
        self.state = LaneState::Running;
        self.last_progress = None;
        info!(generation, "external analysis started");
        generation
    }

    /// Accept an envelope produced outside the lane's own threads. Returns
    /// `None` when it belongs to a superseded or unknown job.
    pub fn ingest(&mut self, envelope: Envelope<R>) -> Option<WorkerMessage<R>> {
        self.accept(envelope)
    }

    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Raise the running job's cancellation flag and forget it. Returns
    /// whether a job was running.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(job) => {
                job.cancelled.store(true, Ordering::Relaxed);
                self.state = LaneState::Cancelled;
                debug!(lane = self.lane.as_str(), generation = job.generation, "analysis cancelled");
                true
            }
            None => false,
        }
    }

    fn accept(&mut self, envelope: Envelope<R>) -> Option<WorkerMessage<R>> {
        let current = self.current_generation();
        if current != Some(envelope.generation) {
            debug!(
                lane = self.lane.as_str(),
                generation = envelope.generation,
                "dropping message from superseded job"
            );
            return None;
        }
        match &envelope.message {
            WorkerMessage::Progress(event) => self.last_progress = Some(*event),
            WorkerMessage::Result(_) => {
                self.state = LaneState::Completed;
                self.current = None;
            }
            WorkerMessage::Failed { .. } => {
                self.state = LaneState::Failed;
                self.current = None;
            }
        }
        Some(envelope.message)
    }

    /// Drain pending messages of the current job without blocking.
    pub fn poll(&mut self) -> Vec<WorkerMessage<R>> {
        let mut out = Vec::new();
        while let Ok(envelope) = self.receiver.try_recv() {
            if let Some(message) = self.accept(envelope) {
                out.push(message);
            }
        }
        out
    }

    /// Block until the current job finishes or `timeout` elapses, returning
    /// its messages in arrival order.
    pub fn wait(&mut self, timeout: Duration) -> Vec<WorkerMessage<R>> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.current.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(envelope) => {
                    if let Some(message) = self.accept(envelope) {
                        out.push(message);
                    }
                }
                Err(_) => break,
            }
        }
        out
    }
}

impl<R> Drop for LaneController<R> {
    fn drop(&mut self) {
        if let Some(job) = self.current.take() {
            job.cancelled.store(true, Ordering::Relaxed);
        }
    }
}
