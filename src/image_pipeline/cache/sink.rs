use crate::image_pipeline::processing::DisplayFrame;

/// Receives progress from a [`FrameCache`](super::FrameCache) loader thread.
///
/// Callbacks run on the loader thread, in ascending frame order.
pub trait FrameSink: Send + Sync {
    fn frame_loaded(&self, _index: usize, _total: usize, _frame: &DisplayFrame) {}

    /// Called once when the loader exits. `loaded < total` when decoding stopped early.
    fn loading_done(&self, _loaded: usize, _total: usize) {}
}

pub struct NoopSink;

impl FrameSink for NoopSink {}
