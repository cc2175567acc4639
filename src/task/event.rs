use crate::task::{TaskIndex, WorkerId};

/// Progress notifications emitted by a [`BoundedRunner`] that has an event sender attached.
///
/// [`BoundedRunner`]: crate::task::BoundedRunner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// A worker claimed the task at `index` and is about to run it.
    Claimed { index: TaskIndex, worker: WorkerId },
    /// The task at `index` produced its value.
    Finished { index: TaskIndex, worker: WorkerId },
}

impl RunEvent {
    pub fn index(&self) -> TaskIndex {
        match self {
            Self::Claimed { index, .. } | Self::Finished { index, .. } => *index,
        }
    }
}
