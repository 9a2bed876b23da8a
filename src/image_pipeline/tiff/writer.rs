use crate::image_pipeline::capture::RawSamples;
use crate::image_pipeline::common::error::Result;

/// One container page: the frame's samples plus its text tags.
pub struct TiffPage<'a> {
    pub width: usize,
    pub height: usize,
    pub samples: &'a RawSamples,
    /// `YYYY:MM:DD HH:MM:SS`
    pub datetime: &'a str,
    pub description: &'a str,
    /// JSON-serialized frame header
    pub frame_header_json: &'a str,
}

pub trait PageWriter {
    fn write_page(&mut self, page: &TiffPage<'_>) -> Result<()>;
    fn pages_written(&self) -> usize;
}
