//! Decoding, viewing and TIFF export of BUMP underwater camera `.bin` captures.

pub mod image_pipeline;
pub mod logger;
