//! Image processing pipeline module
//!
//! This module decodes BUMP camera captures, prepares frames for display,
//! caches them in the background, and exports whole captures to TIFF.

pub mod cache;
pub mod capture;
pub mod common;
pub mod conversions;
pub mod debayer;
pub mod processing;
pub mod tiff;

pub use common::{
    CaptureError,
    Result,
};

pub use capture::{
    CaptureDecoder,
    CaptureInfo,
    DecoderConfig,
    FileHeader,
    FrameHeader,
    FrameReader,
    PixelFormat,
    RawFrame,
    RawSamples,
};

pub use processing::{
    DisplayFrame,
    FrameProcessor,
    ProcessorConfig,
};

pub use cache::{
    FrameCache,
    FrameSink,
    NoopSink,
    wrap_frame_index,
};

pub use self::tiff::{
    ExportConfig,
    ExportConfigBuilder,
    TiffCompression,
};

pub use conversions::{
    BatchReport,
    CaptureExporter,
    CaptureMetadata,
    ExportHandle,
    ExportSummary,
    discover_captures,
    export_all,
};
