// Player module
// Queueing, scheduling, gating and visualization for one streaming session

pub mod gate;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod visualizer;

pub use queue::FrameQueue;
pub use scheduler::{PlaybackScheduler, TickOutcome};
pub use session::{PlaybackState, Session};
