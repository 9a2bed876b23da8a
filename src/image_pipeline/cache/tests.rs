use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::image_pipeline::cache::{FrameCache, FrameSink, NoopSink, wrap_frame_index};
use crate::image_pipeline::capture::test_support::{file_header, frame_header, write_capture};
use crate::image_pipeline::capture::{
    CaptureDecoder, CaptureInfo, FrameReader, PixelFormat, RawFrame, RawSamples,
};
use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::processing::{DisplayFrame, FrameProcessor, ProcessorConfig};

struct MockReader {
    info: CaptureInfo,
    reads: Arc<AtomicUsize>,
    fail_at: Option<usize>,
    delay: Duration,
    gate: Option<Receiver<()>>,
}

impl MockReader {
    fn new(frames: usize) -> Self {
        let header = file_header(PixelFormat::Mono8, 4, 4);
        let size = 64 + frames as u64 * 52;
        Self {
            info: CaptureInfo::new("mock.bin", size, header).unwrap(),
            reads: Arc::new(AtomicUsize::new(0)),
            fail_at: None,
            delay: Duration::ZERO,
            gate: None,
        }
    }
}

impl FrameReader for MockReader {
    fn info(&self) -> &CaptureInfo {
        &self.info
    }

    fn read_frame(&mut self, index: usize) -> Result<RawFrame> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        std::thread::sleep(self.delay);
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(index) {
            return Err(CaptureError::TruncatedFrame {
                index,
                expected: 16,
                actual: 3,
            });
        }
        Ok(RawFrame {
            header: frame_header(index, 4, 4),
            width: 4,
            height: 4,
            samples: RawSamples::Mono8(vec![index as u8; 16]),
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    loaded: Mutex<Vec<usize>>,
    done: Mutex<Option<(usize, usize)>>,
}

impl FrameSink for RecordingSink {
    fn frame_loaded(&self, index: usize, _total: usize, _frame: &DisplayFrame) {
        self.loaded.lock().unwrap().push(index);
    }

    fn loading_done(&self, loaded: usize, total: usize) {
        *self.done.lock().unwrap() = Some((loaded, total));
    }
}

fn small_processor() -> FrameProcessor {
    FrameProcessor::new(ProcessorConfig::builder().target_height(4).build())
}

#[test]
fn test_get_frame_returns_header_with_its_image() {
    let cache =
        FrameCache::with_reader(MockReader::new(5), small_processor(), Arc::new(NoopSink)).unwrap();

    for index in [4, 0, 2] {
        let (header, frame) = cache.get_frame(index).unwrap();
        assert_eq!(header, frame_header(index, 4, 4));
        assert_eq!(frame.header, header);
        assert_eq!((frame.width, frame.height), (4, 4));
        assert!(frame.data.iter().all(|&v| v == index as u8));
    }
}

#[test]
fn test_get_frame_blocks_until_slot_is_published() {
    let mut reader = MockReader::new(6);
    reader.delay = Duration::from_millis(15);
    let cache = FrameCache::with_reader(reader, small_processor(), Arc::new(NoopSink)).unwrap();

    let (header, _) = cache.get_frame(5).unwrap();
    assert_eq!(header.frame_number, 5);
    assert_eq!(cache.loaded_count(), 6);
}

#[test]
fn test_out_of_range_performs_no_decode() {
    let (release, gate) = channel();
    let mut reader = MockReader::new(3);
    reader.gate = Some(gate);
    let reads = Arc::clone(&reader.reads);
    let cache = FrameCache::with_reader(reader, small_processor(), Arc::new(NoopSink)).unwrap();

    let result = cache.get_frame(3);
    assert!(matches!(
        result,
        Err(CaptureError::IndexOutOfRange { index: 3, frames: 3 })
    ));
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(cache.loaded_count(), 0);

    for _ in 0..3 {
        release.send(()).unwrap();
    }
    assert_eq!(cache.wait_until_loaded(), 3);
    assert_eq!(reads.load(Ordering::SeqCst), 3);
}

#[test]
fn test_slots_fill_in_ascending_order() {
    let mut reader = MockReader::new(20);
    reader.delay = Duration::from_millis(2);
    let sink = Arc::new(RecordingSink::default());
    let cache = FrameCache::with_reader(reader, small_processor(), sink.clone()).unwrap();

    while !cache.is_complete() {
        let filled = cache.loaded_mask();
        assert_eq!(filled.len(), 20);
        if let Some(last) = filled.iter().rposition(|&f| f) {
            assert!(filled[..=last].iter().all(|&f| f));
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(*sink.loaded.lock().unwrap(), (0..20).collect::<Vec<_>>());
    assert_eq!(*sink.done.lock().unwrap(), Some((20, 20)));
}

#[test]
fn test_decode_failure_stops_fill_and_wakes_waiters() {
    let mut reader = MockReader::new(5);
    reader.fail_at = Some(2);
    let sink = Arc::new(RecordingSink::default());
    let cache = FrameCache::with_reader(reader, small_processor(), sink.clone()).unwrap();

    assert!(matches!(
        cache.get_frame(4),
        Err(CaptureError::LoadStopped { index: 4 })
    ));
    assert!(cache.get_frame(1).is_ok());
    assert!(matches!(
        cache.get_frame(2),
        Err(CaptureError::LoadStopped { index: 2 })
    ));
    assert_eq!(cache.loaded_count(), 2);
    assert_eq!(*sink.done.lock().unwrap(), Some((2, 5)));
}

#[test]
fn test_empty_capture_completes_immediately() {
    let cache =
        FrameCache::with_reader(MockReader::new(0), small_processor(), Arc::new(NoopSink)).unwrap();
    assert_eq!(cache.wait_until_loaded(), 0);
    assert!(matches!(
        cache.get_frame(0),
        Err(CaptureError::IndexOutOfRange { index: 0, frames: 0 })
    ));
}

#[test]
fn test_cache_over_real_capture_file() {
    let dir = tempfile::tempdir().unwrap();
    let header = file_header(PixelFormat::Mono16, 4, 4);
    let path = write_capture(dir.path(), "wide.bin", &header, &[vec![512; 16], vec![1024; 16]]);

    let decoder = CaptureDecoder::open(&path).unwrap();
    let cache = FrameCache::with_reader(decoder, small_processor(), Arc::new(NoopSink)).unwrap();

    let (_, first) = cache.get_frame(0).unwrap();
    let (_, second) = cache.get_frame(1).unwrap();
    assert!(first.data.iter().all(|&v| v == 2));
    assert!(second.data.iter().all(|&v| v == 4));
}

#[test]
fn test_wrap_frame_index() {
    assert_eq!(wrap_frame_index(0, 1, 3), 1);
    assert_eq!(wrap_frame_index(2, 1, 3), 0);
    assert_eq!(wrap_frame_index(0, -1, 3), 2);
    assert_eq!(wrap_frame_index(1, -7, 3), 0);
    assert_eq!(wrap_frame_index(5, 1, 0), 0);
}
