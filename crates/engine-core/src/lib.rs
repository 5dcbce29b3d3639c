pub mod error;
pub mod keys;
pub mod metrics;
pub mod progress;
pub mod queue;
pub mod state;
