//! Pipeline conversions module
//!
//! This module contains orchestration logic for exporting captures to TIFF.

mod batch;
mod capture_to_tiff;

pub use batch::{BatchReport, discover_captures, export_all};
pub use capture_to_tiff::{
    CaptureExporter, CaptureMetadata, ExportHandle, ExportSummary, page_datetime,
};
