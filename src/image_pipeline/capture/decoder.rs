//! Reader for BUMP `.bin` capture files.
//!
//! The file starts with a header whose first two bytes declare its own length.
//! Frame records follow back to back, each a 36-byte [`FrameHeader`] and
//! `image_width * image_height` samples of one or two bytes.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::image_pipeline::capture::info::CaptureInfo;
use crate::image_pipeline::capture::reader::FrameReader;
use crate::image_pipeline::capture::types::{
    DecoderConfig, FILE_HEADER_SIZE, FRAME_HEADER_SIZE, FileHeader, FrameHeader, PixelFormat,
    RawFrame, RawSamples,
};
use crate::image_pipeline::common::error::{CaptureError, Result};

pub struct CaptureDecoder {
    file: File,
    info: CaptureInfo,
}

impl CaptureDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &DecoderConfig::default())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CaptureError::NotFound(path.to_path_buf()),
            _ => CaptureError::Io(e),
        })?;
        let file_size = file.metadata()?.len();

        let file_header = parse_file_header(&mut file, config)?;
        let info = CaptureInfo::new(path, file_size, file_header)?;

        info!(
            frames = info.frames_in_file(),
            width = info.image_width(),
            height = info.image_height(),
            bits_per_sample = info.pixel_format().bits_per_sample(),
            "Found {} frames in {}",
            info.frames_in_file(),
            path.display()
        );

        Ok(Self { file, info })
    }

    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    pub fn file_header(&self) -> &FileHeader {
        self.info.file_header()
    }

    pub fn frame_size_bytes(&self) -> u64 {
        self.info.frame_size_bytes()
    }

    pub fn frames_in_file(&self) -> usize {
        self.info.frames_in_file()
    }

    pub fn read_frame(&mut self, index: usize) -> Result<RawFrame> {
        self.info.check_index(index)?;

        let offset = self.info.frame_offset(index);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        let got = read_up_to(&mut self.file, &mut header_bytes)?;
        if got < FRAME_HEADER_SIZE {
            return Err(CaptureError::TruncatedFrame {
                index,
                expected: FRAME_HEADER_SIZE,
                actual: got,
            });
        }
        let header = FrameHeader::parse(&header_bytes);

        let pixels = self.info.frame_pixels();
        let format = self.info.pixel_format();
        let mut sample_bytes = vec![0u8; pixels * format.bytes_per_sample()];
        let got = read_up_to(&mut self.file, &mut sample_bytes)?;
        if got < sample_bytes.len() {
            warn!(index, "Error reading frame {} from {}", index, self.info.path().display());
            return Err(CaptureError::TruncatedFrame {
                index,
                expected: sample_bytes.len(),
                actual: got,
            });
        }

        let samples = match format {
            PixelFormat::Mono8 => RawSamples::Mono8(sample_bytes),
            PixelFormat::Mono16 => RawSamples::Mono16(
                sample_bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            ),
        };

        debug!(index, offset, frame_number = header.frame_number, "Read frame");

        Ok(RawFrame {
            header,
            width: self.info.image_width(),
            height: self.info.image_height(),
            samples,
        })
    }
}

impl FrameReader for CaptureDecoder {
    fn info(&self) -> &CaptureInfo {
        &self.info
    }

    fn read_frame(&mut self, index: usize) -> Result<RawFrame> {
        CaptureDecoder::read_frame(self, index)
    }
}

/// Reads the self-describing header at offset 0.
fn parse_file_header(file: &mut File, config: &DecoderConfig) -> Result<FileHeader> {
    file.seek(SeekFrom::Start(0))?;
    let mut length_bytes = [0u8; 2];
    if read_up_to(file, &mut length_bytes)? < 2 {
        return Err(CaptureError::CorruptHeader(
            "file too small to contain a header length".to_string(),
        ));
    }
    let declared = u16::from_le_bytes(length_bytes) as usize;

    if declared < FILE_HEADER_SIZE || (config.strict_header_length && declared != FILE_HEADER_SIZE)
    {
        return Err(CaptureError::CorruptHeader(format!(
            "declared header length {} does not match expected {}",
            declared, FILE_HEADER_SIZE
        )));
    }
    if declared > FILE_HEADER_SIZE {
        debug!(declared, "Skipping {} extra header bytes", declared - FILE_HEADER_SIZE);
    }

    file.seek(SeekFrom::Start(0))?;
    let mut header_bytes = vec![0u8; declared];
    let got = read_up_to(file, &mut header_bytes)?;
    if got < declared {
        return Err(CaptureError::CorruptHeader(format!(
            "header declares {} bytes but file holds {}",
            declared, got
        )));
    }

    FileHeader::parse(&header_bytes)
}

/// Fills as much of `buf` as the file allows, returning the byte count.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
