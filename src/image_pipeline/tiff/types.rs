//! TIFF export configuration types

use std::path::PathBuf;

use crate::image_pipeline::capture::DecoderConfig;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}

/// Configuration for capture to TIFF export
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory for the `.tiff` and `.json` outputs. `None` writes beside the capture.
    pub output_dir: Option<PathBuf>,
    /// Compression method to use
    pub compression: TiffCompression,
    pub decoder: DecoderConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            compression: TiffCompression::None,
            decoder: DecoderConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }
}

/// Builder for ExportConfig
#[derive(Default)]
pub struct ExportConfigBuilder {
    output_dir: Option<Option<PathBuf>>,
    compression: Option<TiffCompression>,
    decoder: Option<DecoderConfig>,
}

impl ExportConfigBuilder {
    pub fn output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn build(self) -> ExportConfig {
        let default = ExportConfig::default();
        ExportConfig {
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            compression: self.compression.unwrap_or(default.compression),
            decoder: self.decoder.unwrap_or(default.decoder),
        }
    }
}
