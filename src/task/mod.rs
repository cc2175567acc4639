pub mod event;
pub mod outcome;
pub mod pool;
pub mod runner;

pub type WorkerId = usize;
pub type TaskIndex = usize;

pub use event::RunEvent;
pub use outcome::Outcome;
pub use pool::{BoundedRunner, run_bounded};
pub use runner::{BoxError, TaskRunner};
