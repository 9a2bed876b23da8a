//! Background frame cache module
//!
//! Decodes and processes every frame of a capture on a dedicated thread and
//! serves blocking lookups by index while the fill is in progress.

mod frame_cache;
mod sink;

#[cfg(test)]
mod tests;

pub use frame_cache::{FrameCache, wrap_frame_index};
pub use sink::{FrameSink, NoopSink};
