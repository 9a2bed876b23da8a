use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::image_pipeline::cache::sink::{FrameSink, NoopSink};
use crate::image_pipeline::capture::{CaptureDecoder, CaptureInfo, FrameHeader, FrameReader};
use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::processing::{DisplayFrame, FrameProcessor, ProcessorConfig};

struct Slots {
    /// A slot holds the header and the display image together, so both publish at once.
    frames: Vec<Option<Arc<DisplayFrame>>>,
    loaded: usize,
    complete: bool,
}

struct Shared {
    slots: Mutex<Slots>,
    published: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the fill finished and wakes every waiter, even if the loader unwinds.
struct CompletionGuard(Arc<Shared>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.lock().complete = true;
        self.0.published.notify_all();
    }
}

/// Per-capture cache of display frames, filled in index order by one background thread.
///
/// Slot `i` is always published before slot `i + 1` starts decoding. The fill cannot be
/// cancelled; dropping the cache waits for the loader thread to finish.
pub struct FrameCache {
    info: CaptureInfo,
    shared: Arc<Shared>,
    loader: Option<JoinHandle<()>>,
}

impl FrameCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let decoder = CaptureDecoder::open(path)?;
        Self::with_reader(
            decoder,
            FrameProcessor::new(ProcessorConfig::default()),
            Arc::new(NoopSink),
        )
    }

    /// Starts filling from `reader` immediately.
    pub fn with_reader<R>(reader: R, processor: FrameProcessor, sink: Arc<dyn FrameSink>) -> Result<Self>
    where
        R: FrameReader + 'static,
    {
        let info = reader.info().clone();
        let shared = Arc::new(Shared {
            slots: Mutex::new(Slots {
                frames: vec![None; info.frames_in_file()],
                loaded: 0,
                complete: false,
            }),
            published: Condvar::new(),
        });

        let loader = thread::Builder::new()
            .name("frame-loader".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_load_frames(reader, processor, shared, sink)
            })?;

        Ok(Self {
            info,
            shared,
            loader: Some(loader),
        })
    }

    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    pub fn frames_in_file(&self) -> usize {
        self.info.frames_in_file()
    }

    /// Returns frame `index`, blocking until the loader has published it.
    ///
    /// There is no timeout. A high index on a freshly opened capture waits for every
    /// preceding frame to be decoded.
    pub fn get_frame(&self, index: usize) -> Result<(FrameHeader, Arc<DisplayFrame>)> {
        if let Err(e) = self.info.check_index(index) {
            error!("{}", e);
            return Err(e);
        }

        let mut slots = self.shared.lock();
        loop {
            if let Some(frame) = &slots.frames[index] {
                return Ok((frame.header, Arc::clone(frame)));
            }
            if slots.complete {
                warn!(index, loaded = slots.loaded, "Frame {} will never be loaded", index);
                return Err(CaptureError::LoadStopped { index });
            }
            debug!("Waiting for frame: {}...", index);
            slots = self
                .shared
                .published
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of leading slots already published.
    pub fn loaded_count(&self) -> usize {
        self.shared.lock().loaded
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.shared
            .lock()
            .frames
            .get(index)
            .is_some_and(|slot| slot.is_some())
    }

    #[cfg(test)]
    pub(crate) fn loaded_mask(&self) -> Vec<bool> {
        self.shared
            .lock()
            .frames
            .iter()
            .map(Option::is_some)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.shared.lock().complete
    }

    /// Blocks until the loader thread has finished and returns the number of frames loaded.
    pub fn wait_until_loaded(&self) -> usize {
        let mut slots = self.shared.lock();
        while !slots.complete {
            slots = self
                .shared
                .published
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slots.loaded
    }
}

impl Drop for FrameCache {
    fn drop(&mut self) {
        if let Some(loader) = self.loader.take() {
            if loader.join().is_err() {
                error!("Frame loader for {} panicked", self.info.path().display());
            }
        }
    }
}

fn run_load_frames<R: FrameReader>(
    mut reader: R,
    processor: FrameProcessor,
    shared: Arc<Shared>,
    sink: Arc<dyn FrameSink>,
) {
    let _completion = CompletionGuard(Arc::clone(&shared));
    let total = reader.frames_in_file();
    let mut index = 0;

    while index < total {
        if shared.lock().frames[index].is_none() {
            let frame = match reader
                .read_frame(index)
                .and_then(|raw| processor.process(&raw))
            {
                Ok(frame) => Arc::new(frame),
                Err(e) => {
                    error!(index, "Stopping frame loading: {}", e);
                    break;
                }
            };

            {
                let mut slots = shared.lock();
                slots.frames[index] = Some(Arc::clone(&frame));
                slots.loaded = index + 1;
            }
            shared.published.notify_all();
            sink.frame_loaded(index, total, &frame);
        }
        index += 1;
        debug!("Loaded frame {}/{}", index, total);
    }

    let loaded = shared.lock().loaded;
    info!(loaded, total, "Frame loading done for {}", reader.info().path().display());
    sink.loading_done(loaded, total);
}

/// Moves `delta` frames from `current`, wrapping around both ends of the capture.
pub fn wrap_frame_index(current: usize, delta: isize, frames: usize) -> usize {
    if frames == 0 {
        return 0;
    }
    let wrapped = (current as isize + delta).rem_euclid(frames as isize);
    wrapped.max(0) as usize
}
