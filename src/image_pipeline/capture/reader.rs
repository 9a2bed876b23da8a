use crate::image_pipeline::capture::info::CaptureInfo;
use crate::image_pipeline::capture::types::RawFrame;
use crate::image_pipeline::common::error::Result;

/// Random access to the frame records of one capture.
pub trait FrameReader: Send {
    fn info(&self) -> &CaptureInfo;
    fn read_frame(&mut self, index: usize) -> Result<RawFrame>;

    fn frames_in_file(&self) -> usize {
        self.info().frames_in_file()
    }
}
