//! On-disk record types for BUMP `.bin` captures.
//!
//! A capture is one little-endian [`FileHeader`] followed by fixed-size frame
//! records, each a [`FrameHeader`] and `image_width * image_height` sensor samples.

use serde::{Deserialize, Deserializer, Serialize};

use crate::image_pipeline::common::error::{CaptureError, Result};

/// Size in bytes of the file header layout this decoder understands.
pub const FILE_HEADER_SIZE: usize = 64;

/// Size in bytes of every per-frame header.
pub const FRAME_HEADER_SIZE: usize = 36;

fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le_i32(b: &[u8], at: usize) -> i32 {
    le_u32(b, at) as i32
}

fn le_f32(b: &[u8], at: usize) -> f32 {
    f32::from_bits(le_u32(b, at))
}

fn le_u64(b: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&b[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// JSON writes non-finite floats as `null`; read them back as NaN.
fn f32_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
}

/// Camera settings written once at the start of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Total header length in bytes, including this field
    pub length: u16,
    pub format: u16,
    pub camera_id: i32,
    /// Raw pixel format code, see [`PixelFormat`]
    pub pixel_format: u16,
    pub illumination_type: u16,
    #[serde(deserialize_with = "f32_or_nan")]
    pub flash_duration: f32,
    #[serde(deserialize_with = "f32_or_nan")]
    pub flash_delay: f32,
    #[serde(deserialize_with = "f32_or_nan")]
    pub exposure_time: f32,
    #[serde(deserialize_with = "f32_or_nan")]
    pub gain: f32,
    #[serde(deserialize_with = "f32_or_nan")]
    pub red_gain: f32,
    #[serde(deserialize_with = "f32_or_nan")]
    pub blue_gain: f32,
    pub vert_offset: u16,
    pub horz_offset: u16,
    pub vert_binning: u8,
    pub horz_binning: u8,
    pub binning_mode: u16,
    pub raw_image_height: u16,
    pub raw_image_width: u16,
    pub unused1: i32,
    pub unused2: i32,
    pub unused3: i32,
    pub unused4: i32,
}

impl FileHeader {
    /// Unpacks the fixed field layout from the first [`FILE_HEADER_SIZE`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(CaptureError::CorruptHeader(format!(
                "header needs {} bytes, got {}",
                FILE_HEADER_SIZE,
                bytes.len()
            )));
        }

        Ok(Self {
            length: le_u16(bytes, 0),
            format: le_u16(bytes, 2),
            camera_id: le_i32(bytes, 4),
            pixel_format: le_u16(bytes, 8),
            illumination_type: le_u16(bytes, 10),
            flash_duration: le_f32(bytes, 12),
            flash_delay: le_f32(bytes, 16),
            exposure_time: le_f32(bytes, 20),
            gain: le_f32(bytes, 24),
            red_gain: le_f32(bytes, 28),
            blue_gain: le_f32(bytes, 32),
            vert_offset: le_u16(bytes, 36),
            horz_offset: le_u16(bytes, 38),
            vert_binning: bytes[40],
            horz_binning: bytes[41],
            binning_mode: le_u16(bytes, 42),
            raw_image_height: le_u16(bytes, 44),
            raw_image_width: le_u16(bytes, 46),
            unused1: le_i32(bytes, 48),
            unused2: le_i32(bytes, 52),
            unused3: le_i32(bytes, 56),
            unused4: le_i32(bytes, 60),
        })
    }

    /// Packs the header back into its on-disk layout.
    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut out = [0u8; FILE_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.length.to_le_bytes());
        out[2..4].copy_from_slice(&self.format.to_le_bytes());
        out[4..8].copy_from_slice(&self.camera_id.to_le_bytes());
        out[8..10].copy_from_slice(&self.pixel_format.to_le_bytes());
        out[10..12].copy_from_slice(&self.illumination_type.to_le_bytes());
        out[12..16].copy_from_slice(&self.flash_duration.to_le_bytes());
        out[16..20].copy_from_slice(&self.flash_delay.to_le_bytes());
        out[20..24].copy_from_slice(&self.exposure_time.to_le_bytes());
        out[24..28].copy_from_slice(&self.gain.to_le_bytes());
        out[28..32].copy_from_slice(&self.red_gain.to_le_bytes());
        out[32..36].copy_from_slice(&self.blue_gain.to_le_bytes());
        out[36..38].copy_from_slice(&self.vert_offset.to_le_bytes());
        out[38..40].copy_from_slice(&self.horz_offset.to_le_bytes());
        out[40] = self.vert_binning;
        out[41] = self.horz_binning;
        out[42..44].copy_from_slice(&self.binning_mode.to_le_bytes());
        out[44..46].copy_from_slice(&self.raw_image_height.to_le_bytes());
        out[46..48].copy_from_slice(&self.raw_image_width.to_le_bytes());
        out[48..52].copy_from_slice(&self.unused1.to_le_bytes());
        out[52..56].copy_from_slice(&self.unused2.to_le_bytes());
        out[56..60].copy_from_slice(&self.unused3.to_le_bytes());
        out[60..64].copy_from_slice(&self.unused4.to_le_bytes());
        out
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            length: FILE_HEADER_SIZE as u16,
            format: 0,
            camera_id: 0,
            pixel_format: PixelFormat::Mono8 as u16,
            illumination_type: 0,
            flash_duration: 0.0,
            flash_delay: 0.0,
            exposure_time: 0.0,
            gain: 0.0,
            red_gain: 0.0,
            blue_gain: 0.0,
            vert_offset: 0,
            horz_offset: 0,
            vert_binning: 1,
            horz_binning: 1,
            binning_mode: 0,
            raw_image_height: 0,
            raw_image_width: 0,
            unused1: 0,
            unused2: 0,
            unused3: 0,
            unused4: 0,
        }
    }
}

/// Per-frame timing and geometry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    pub unixtime: u64,
    pub system_micros: u64,
    pub camera_micros: u64,
    pub frame_number: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8; FRAME_HEADER_SIZE]) -> Self {
        Self {
            unixtime: le_u64(bytes, 0),
            system_micros: le_u64(bytes, 8),
            camera_micros: le_u64(bytes, 16),
            frame_number: le_u32(bytes, 24),
            width: le_u32(bytes, 28),
            height: le_u32(bytes, 32),
        }
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut out = [0u8; FRAME_HEADER_SIZE];
        out[0..8].copy_from_slice(&self.unixtime.to_le_bytes());
        out[8..16].copy_from_slice(&self.system_micros.to_le_bytes());
        out[16..24].copy_from_slice(&self.camera_micros.to_le_bytes());
        out[24..28].copy_from_slice(&self.frame_number.to_le_bytes());
        out[28..32].copy_from_slice(&self.width.to_le_bytes());
        out[32..36].copy_from_slice(&self.height.to_le_bytes());
        out
    }
}

/// Sample encoding selected by the header's `pixel_format` code.
///
/// The code doubles as the number of bytes per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PixelFormat {
    /// One byte per sample
    Mono8 = 1,
    /// Two little-endian bytes per sample
    Mono16 = 2,
}

impl PixelFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Mono16 => 2,
        }
    }

    pub fn bits_per_sample(self) -> u32 {
        match self {
            PixelFormat::Mono8 => 8,
            PixelFormat::Mono16 => 16,
        }
    }
}

impl TryFrom<u16> for PixelFormat {
    type Error = CaptureError;

    fn try_from(code: u16) -> Result<Self> {
        match code {
            1 => Ok(PixelFormat::Mono8),
            2 => Ok(PixelFormat::Mono16),
            other => Err(CaptureError::CorruptHeader(format!(
                "unsupported pixel format {}",
                other
            ))),
        }
    }
}

/// Single-channel Bayer sensor samples, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    Mono8(Vec<u8>),
    Mono16(Vec<u16>),
}

impl RawSamples {
    pub fn len(&self) -> usize {
        match self {
            RawSamples::Mono8(data) => data.len(),
            RawSamples::Mono16(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            RawSamples::Mono8(_) => PixelFormat::Mono8,
            RawSamples::Mono16(_) => PixelFormat::Mono16,
        }
    }
}

/// One decoded frame record before any processing.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub header: FrameHeader,
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    pub samples: RawSamples,
}

/// Options for opening a capture.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Reject headers whose declared length differs from [`FILE_HEADER_SIZE`].
    /// When disabled, longer headers are accepted and the extra bytes skipped.
    pub strict_header_length: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            strict_header_length: true,
        }
    }
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct DecoderConfigBuilder {
    strict_header_length: Option<bool>,
}

impl DecoderConfigBuilder {
    pub fn strict_header_length(mut self, strict: bool) -> Self {
        self.strict_header_length = Some(strict);
        self
    }

    pub fn build(self) -> DecoderConfig {
        let default = DecoderConfig::default();
        DecoderConfig {
            strict_header_length: self
                .strict_header_length
                .unwrap_or(default.strict_header_length),
        }
    }
}
