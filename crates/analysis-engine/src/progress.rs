//! Progress reporting and cooperative cancellation for long analyses.

use crate::types::{AnalysisError, ProgressBand, ProgressEvent};

/// Receiver of progress events. Also the cancellation hook: analyses poll
/// `is_cancelled` between items and stop early when it returns true.
pub trait ProgressSink {
    fn progress(&mut self, event: ProgressEvent);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Discards progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _event: ProgressEvent) {}
}

impl ProgressSink for Vec<ProgressEvent> {
    fn progress(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Wraps a sink so that the forwarded stream never repeats or decreases.
pub struct ProgressTracker<'a, P: ProgressSink + ?Sized> {
    sink: &'a mut P,
    last: Option<u8>,
}

impl<'a, P: ProgressSink + ?Sized> ProgressTracker<'a, P> {
    pub fn new(sink: &'a mut P) -> Self {
        Self { sink, last: None }
    }

    pub fn report(&mut self, percent: u8) {
        let event = ProgressEvent::new(percent);
        if self.last.map_or(true, |last| event.percent > last) {
            self.last = Some(event.percent);
            self.sink.progress(event);
        }
    }

    pub fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.sink.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn last_reported(&self) -> Option<u8> {
        self.last
    }

    /// Report progress after finishing item `index` of a phase.
    pub fn item_done(&mut self, phase: &PhaseProgress, index: usize) {
        if let Some(percent) = phase.percent_after(index) {
            self.report(percent);
        }
    }
}

/// Maps item indices of one phase onto its progress band.
#[derive(Debug, Clone, Copy)]
pub struct PhaseProgress {
    band: ProgressBand,
    interval: usize,
}

impl PhaseProgress {
    /// Report every `max(items / width, 1)` items.
    pub fn new(band: ProgressBand, items: usize) -> Self {
        let width = band.width().max(1);
        Self {
            band,
            interval: (items / width).max(1),
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn percent_after(&self, index: usize) -> Option<u8> {
        if index % self.interval != 0 {
            return None;
        }
        let step = index / self.interval;
        let percent = usize::from(self.band.start)
            .saturating_add(step)
            .min(usize::from(self.band.end));
        u8::try_from(percent).ok()
    }
}
