use std::cell::{Cell, RefCell};

use crate::frame::Frame;
use crate::job::{Job, Phase};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameSummary {
    pub layout_jobs: usize,
    pub paint_jobs: usize,
}

/// Queue of one-shot jobs flushed once per host frame.
///
/// The scheduler is shared by reference (`&self`) so callbacks running inside
/// a job may queue more work; such work lands in the next frame.
#[derive(Debug, Default)]
pub struct PhaseScheduler {
    next_order: Cell<u64>,
    pending: RefCell<Vec<(u64, Job)>>,
}

impl PhaseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, job: Job) {
        let order = self.next_order.get();
        self.next_order.set(order.wrapping_add(1));
        self.pending.borrow_mut().push((order, job));
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Runs every job queued before this call.
    ///
    /// Ordering is deterministic: `(phase, priority, insertion_order)`.
    pub fn run_frame(&self, frame: Frame) -> FrameSummary {
        let mut jobs = std::mem::take(&mut *self.pending.borrow_mut());
        jobs.sort_by(|(oa, a), (ob, b)| {
            a.phase
                .cmp(&b.phase)
                .then_with(|| a.priority.cmp(&b.priority))
                .then_with(|| oa.cmp(ob))
        });

        let mut summary = FrameSummary::default();
        for (_order, job) in jobs {
            match job.phase {
                Phase::Layout => summary.layout_jobs += 1,
                Phase::Paint => summary.paint_jobs += 1,
            }
            (job.run)(frame);
        }
        summary
    }
}
