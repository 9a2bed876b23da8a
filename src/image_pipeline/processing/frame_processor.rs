use fast_image_resize as fr;
use fr::images::Image;
use tracing::trace;

use crate::image_pipeline::capture::{RawFrame, RawSamples};
use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::debayer::{CpuDebayer, RgbImageData};
use crate::image_pipeline::processing::types::{DisplayFrame, ProcessorConfig};

/// Reduces sensor samples to 8 bits. 16-bit samples keep their high byte.
pub fn narrow_to_8_bit(samples: &RawSamples) -> Vec<u8> {
    match samples {
        RawSamples::Mono8(data) => data.clone(),
        RawSamples::Mono16(data) => data.iter().map(|&v| (v >> 8) as u8).collect(),
    }
}

/// Narrow, demosaic and rescale a raw frame for display.
pub struct FrameProcessor {
    debayer: CpuDebayer,
    config: ProcessorConfig,
}

impl FrameProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            debayer: CpuDebayer::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn process(&self, raw: &RawFrame) -> Result<DisplayFrame> {
        let mosaic = narrow_to_8_bit(&raw.samples);
        let rgb = self.debayer.process(&mosaic, raw.width, raw.height)?;
        let (width, height) = self.output_size(raw.width, raw.height)?;
        let data = resize_area(rgb, width, height)?;

        trace!(
            frame_number = raw.header.frame_number,
            "Processed {}x{} -> {}x{}",
            raw.width,
            raw.height,
            width,
            height
        );

        Ok(DisplayFrame {
            header: raw.header,
            width,
            height,
            data,
        })
    }

    /// Output dimensions: fixed target height, width scaled by the same factor and rounded.
    pub fn output_size(&self, width: usize, height: usize) -> Result<(usize, usize)> {
        if width == 0 || height == 0 || self.config.target_height == 0 {
            return Err(CaptureError::Resize(format!(
                "cannot scale {}x{} to height {}",
                width, height, self.config.target_height
            )));
        }
        let scale = self.config.target_height as f64 / height as f64;
        let scaled_width = ((width as f64 * scale).round() as usize).max(1);
        Ok((scaled_width, self.config.target_height))
    }
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new(ProcessorConfig::default())
    }
}

/// Box-filter resampling, which averages the source area under each output pixel.
fn resize_area(rgb: RgbImageData, width: usize, height: usize) -> Result<Vec<u8>> {
    let src = Image::from_vec_u8(
        rgb.width as u32,
        rgb.height as u32,
        rgb.data,
        fr::PixelType::U8x3,
    )
    .map_err(|e| CaptureError::Resize(e.to_string()))?;
    let mut dst = Image::new(width as u32, height as u32, fr::PixelType::U8x3);

    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Box));
    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|e| CaptureError::Resize(e.to_string()))?;

    Ok(dst.into_vec())
}
