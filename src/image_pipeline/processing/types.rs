//! Display frame types and processing configuration

use crate::image_pipeline::capture::FrameHeader;

/// Output height every display frame is scaled to.
pub const DEFAULT_TARGET_HEIGHT: usize = 1080;

/// Demosaiced, rescaled frame ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    /// Header of the frame this image was produced from
    pub header: FrameHeader,
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// RGB pixel data interleaved [R, G, B, R, G, B, ...]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Height of the output image; width follows the source aspect ratio
    pub target_height: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
        }
    }
}

impl ProcessorConfig {
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ProcessorConfigBuilder {
    target_height: Option<usize>,
}

impl ProcessorConfigBuilder {
    pub fn target_height(mut self, height: usize) -> Self {
        self.target_height = Some(height);
        self
    }

    pub fn build(self) -> ProcessorConfig {
        let default = ProcessorConfig::default();
        ProcessorConfig {
            target_height: self.target_height.unwrap_or(default.target_height),
        }
    }
}
