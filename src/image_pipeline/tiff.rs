//! TIFF writing module
//!
//! This module writes multi-page TIFF containers, one page per capture frame.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::{PageWriter, TiffPage};
pub use standard_tiff_writer::{FRAME_HEADER_TAG, MultiPageTiffWriter};
pub use types::{ExportConfig, ExportConfigBuilder, TiffCompression};
