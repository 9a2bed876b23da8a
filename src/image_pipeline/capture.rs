//! Capture decoding module
//!
//! This module parses BUMP `.bin` capture files: the self-describing file header,
//! the derived frame geometry, and the fixed-size frame records.

mod decoder;
mod info;
mod reader;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;


pub use decoder::CaptureDecoder;
pub use info::CaptureInfo;
pub use reader::FrameReader;
pub use types::{
    DecoderConfig, DecoderConfigBuilder, FILE_HEADER_SIZE, FRAME_HEADER_SIZE, FileHeader,
    FrameHeader, PixelFormat, RawFrame, RawSamples,
};
