pub mod config;
pub mod error;
pub mod hand;
pub mod pipeline;
pub mod projection;
pub mod render;
pub mod sensor;
pub mod trace;
