//! Geometry derived from a parsed file header.

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::image_pipeline::capture::types::{FRAME_HEADER_SIZE, FileHeader, PixelFormat};
use crate::image_pipeline::common::error::{CaptureError, Result};

/// Immutable description of an opened capture file.
#[derive(Debug, Clone)]
pub struct CaptureInfo {
    path: PathBuf,
    file_size: u64,
    file_header: FileHeader,
    pixel_format: PixelFormat,
    image_width: usize,
    image_height: usize,
}

impl CaptureInfo {
    /// Validates `file_header` and derives the frame geometry for a file of `file_size` bytes.
    pub fn new(path: impl Into<PathBuf>, file_size: u64, file_header: FileHeader) -> Result<Self> {
        let pixel_format = PixelFormat::try_from(file_header.pixel_format)?;

        if file_header.vert_binning == 0 || file_header.horz_binning == 0 {
            return Err(CaptureError::CorruptHeader(format!(
                "binning factors must be non-zero (vertical={}, horizontal={})",
                file_header.vert_binning, file_header.horz_binning
            )));
        }

        // Binning is assumed to divide the raw dimensions evenly.
        let image_height = file_header.raw_image_height as usize / file_header.vert_binning as usize;
        let image_width = file_header.raw_image_width as usize / file_header.horz_binning as usize;

        Ok(Self {
            path: path.into(),
            file_size,
            file_header,
            pixel_format,
            image_width,
            image_height,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// Bytes consumed by the file header, as declared by its own first field.
    pub fn file_header_length(&self) -> u64 {
        self.file_header.length as u64
    }

    pub fn frame_header_size(&self) -> usize {
        FRAME_HEADER_SIZE
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn image_width(&self) -> usize {
        self.image_width
    }

    pub fn image_height(&self) -> usize {
        self.image_height
    }

    pub fn frame_pixels(&self) -> usize {
        self.image_width * self.image_height
    }

    pub fn frame_size_bytes(&self) -> u64 {
        (FRAME_HEADER_SIZE + self.pixel_format.bytes_per_sample() * self.frame_pixels()) as u64
    }

    /// Number of complete frame records; trailing partial bytes are ignored.
    pub fn frames_in_file(&self) -> usize {
        self.file_size
            .checked_sub(self.file_header_length())
            .map_or(0, |payload| (payload / self.frame_size_bytes()) as usize)
    }

    pub fn frame_offset(&self, index: usize) -> u64 {
        self.file_header_length() + index as u64 * self.frame_size_bytes()
    }

    /// Byte range occupied by frame `index`, header included.
    pub fn frame_byte_range(&self, index: usize) -> Range<u64> {
        let start = self.frame_offset(index);
        start..start + self.frame_size_bytes()
    }

    pub fn check_index(&self, index: usize) -> Result<()> {
        let frames = self.frames_in_file();
        if index < frames {
            Ok(())
        } else {
            Err(CaptureError::IndexOutOfRange { index, frames })
        }
    }
}
