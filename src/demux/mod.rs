pub mod channels;
pub mod core;
pub mod discover;
pub mod summary;

pub use channels::OutputChannelPool;
pub use core::{DemuxConfig, DemuxStreams, RunCounters};
pub use discover::InputStreamSet;
pub use summary::RunSummary;
