use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupt file header: {0}")]
    CorruptHeader(String),

    #[error("Frame index {index} is out of bounds [0,{frames})")]
    IndexOutOfRange { index: usize, frames: usize },

    #[error("Frame {index} truncated: expected {expected} bytes, got {actual}")]
    TruncatedFrame {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Background loading stopped before frame {index}")]
    LoadStopped { index: usize },

    #[error("Failed to write export output: {0}")]
    ExportIo(String),

    #[error("Demosaic failed: {0}")]
    Demosaic(String),

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
