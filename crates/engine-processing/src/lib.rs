pub mod control;
pub mod engine;
pub mod error;
pub mod gate;
pub mod state_manager;
pub mod transform;
