pub mod frame;
pub mod job;
pub mod scheduler;

pub use frame::*;
pub use job::*;
pub use scheduler::*;
