use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use tracing::debug;

use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::debayer::types::RgbImageData;

/// Colour filter layout of the BUMP sensor, top-left 2x2 block.
const SENSOR_CFA: CFA = CFA::RGGB;

pub struct CpuDebayer;

impl CpuDebayer {
    pub fn new() -> Self {
        Self
    }

    /// Reconstructs RGB from an 8-bit single-channel RGGB mosaic.
    pub fn process(&self, mosaic: &[u8], width: usize, height: usize) -> Result<RgbImageData> {
        if mosaic.len() != width * height {
            return Err(CaptureError::Demosaic(format!(
                "expected {} samples for {}x{}, got {}",
                width * height,
                width,
                height,
                mosaic.len()
            )));
        }

        debug!("Running demosaic {}x{}, CFA=RGGB, algo=Linear", width, height);

        let mut output_buf = vec![0u8; width * height * 3];
        let mut cursor = Cursor::new(mosaic);
        let mut output_raster = RasterMut::new(width, height, RasterDepth::Depth8, &mut output_buf);

        bayer::run_demosaic(
            &mut cursor,
            BayerDepth::Depth8,
            SENSOR_CFA,
            Demosaic::Linear,
            &mut output_raster,
        )
        .map_err(|e| CaptureError::Demosaic(format!("{:?}", e)))?;

        Ok(RgbImageData {
            width,
            height,
            data: output_buf,
        })
    }
}

impl Default for CpuDebayer {
    fn default() -> Self {
        Self::new()
    }
}
