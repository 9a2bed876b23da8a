//! Synthetic capture files for unit tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::image_pipeline::capture::types::{FileHeader, FrameHeader, PixelFormat};

pub(crate) fn file_header(format: PixelFormat, height: u16, width: u16) -> FileHeader {
    FileHeader {
        pixel_format: format as u16,
        raw_image_height: height,
        raw_image_width: width,
        camera_id: 7,
        exposure_time: 1.5,
        ..FileHeader::default()
    }
}

pub(crate) fn frame_header(index: usize, height: u16, width: u16) -> FrameHeader {
    FrameHeader {
        unixtime: 1_600_000_000 + index as u64,
        system_micros: 1_600_000_000_000_000 + index as u64 * 33_333,
        camera_micros: index as u64 * 33_333,
        frame_number: index as u32,
        width: width as u32,
        height: height as u32,
    }
}

/// Writes a capture with one frame per entry of `frames`, each a list of sample values.
pub(crate) fn write_capture(
    dir: &Path,
    name: &str,
    header: &FileHeader,
    frames: &[Vec<u16>],
) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&header.encode()).unwrap();

    for (index, samples) in frames.iter().enumerate() {
        let fh = frame_header(index, header.raw_image_height, header.raw_image_width);
        file.write_all(&fh.encode()).unwrap();
        for &sample in samples {
            if header.pixel_format == PixelFormat::Mono16 as u16 {
                file.write_all(&sample.to_le_bytes()).unwrap();
            } else {
                file.write_all(&[sample as u8]).unwrap();
            }
        }
    }
    path
}

/// Frames whose samples encode `(frame index, pixel index)` so reads can be checked.
pub(crate) fn patterned_frames(count: usize, pixels: usize) -> Vec<Vec<u16>> {
    (0..count)
        .map(|f| (0..pixels).map(|p| ((f * 31 + p) % 251) as u16).collect())
        .collect()
}
