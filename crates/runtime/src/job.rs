use crate::frame::Frame;

/// Render phase a job is attached to.
///
/// Layout jobs of a frame always run before its paint jobs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Layout,
    Paint,
}

/// One-shot unit of work executed by the [`PhaseScheduler`](crate::PhaseScheduler).
pub struct Job {
    pub id: &'static str,
    pub phase: Phase,
    /// Smaller values run earlier within a phase.
    pub priority: i32,
    pub run: Box<dyn FnOnce(Frame)>,
}

impl Job {
    pub fn new(id: &'static str, phase: Phase, run: impl FnOnce(Frame) + 'static) -> Self {
        Self {
            id,
            phase,
            priority: 0,
            run: Box::new(run),
        }
    }

    pub fn layout(id: &'static str, run: impl FnOnce(Frame) + 'static) -> Self {
        Self::new(id, Phase::Layout, run)
    }

    pub fn paint(id: &'static str, run: impl FnOnce(Frame) + 'static) -> Self {
        Self::new(id, Phase::Paint, run)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
