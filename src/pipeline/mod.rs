pub mod context;
pub mod controller;
pub mod pump;

pub use context::SessionContext;
pub use controller::{FramePipeline, PipelineState, TickOutcome, TickReport};
pub use pump::{FramePump, RateCounter};
