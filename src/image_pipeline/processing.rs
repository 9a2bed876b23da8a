//! Frame processing module
//!
//! Turns raw sensor frames into display-ready RGB images.

mod frame_processor;
pub mod types;

pub use frame_processor::{FrameProcessor, narrow_to_8_bit};
pub use types::{DEFAULT_TARGET_HEIGHT, DisplayFrame, ProcessorConfig, ProcessorConfigBuilder};
