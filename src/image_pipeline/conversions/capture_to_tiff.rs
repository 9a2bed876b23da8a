use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::image_pipeline::{
    capture::{CaptureDecoder, FileHeader, FrameHeader, FrameReader},
    common::error::{CaptureError, Result},
    tiff::{ExportConfig, MultiPageTiffWriter, PageWriter, TiffPage},
};

/// Contents of the `.json` sidecar written next to every exported container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub file_header: FileHeader,
    pub frame_headers: Vec<FrameHeader>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub source: PathBuf,
    pub tiff_path: PathBuf,
    pub json_path: PathBuf,
    pub pages: usize,
}

/// Re-decodes a capture end to end into a multi-page TIFF and a JSON sidecar.
///
/// Every export opens its own decoder; nothing is shared with a live frame cache.
#[derive(Debug, Clone, Default)]
pub struct CaptureExporter {
    config: ExportConfig,
}

impl CaptureExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// `(tiff, json)` output paths for `input`.
    pub fn output_paths(&self, input: &Path) -> (PathBuf, PathBuf) {
        let dir = match &self.config.output_dir {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let stem = input.file_stem().unwrap_or_default();
        let with_suffix = |suffix: &str| {
            let mut name = stem.to_os_string();
            name.push(suffix);
            dir.join(name)
        };
        (with_suffix(".tiff"), with_suffix(".json"))
    }

    #[instrument(skip_all, fields(input = %input.as_ref().display()))]
    pub fn export<P: AsRef<Path>>(&self, input: P) -> Result<ExportSummary> {
        let input = input.as_ref();
        let mut decoder = CaptureDecoder::open_with_config(input, &self.config.decoder)?;
        let (tiff_path, json_path) = self.output_paths(input);

        info!(
            tiff = %tiff_path.display(),
            json = %json_path.display(),
            frames = decoder.frames_in_file(),
            "Exporting capture"
        );

        let io_error = |e: std::io::Error| {
            CaptureError::ExportIo(format!("{}: {}", tiff_path.display(), e))
        };
        let mut output = BufWriter::new(File::create(&tiff_path).map_err(io_error)?);

        let frame_headers = {
            let _span = tracing::info_span!("write_pages").entered();
            let mut writer = MultiPageTiffWriter::new(&mut output, self.config.compression)?;
            self.write_pages(&mut decoder, &mut writer)?
        };
        output.flush().map_err(io_error)?;
        let pages = frame_headers.len();

        let metadata = CaptureMetadata {
            file_header: *decoder.file_header(),
            frame_headers,
        };
        {
            let _span = tracing::info_span!("write_sidecar").entered();
            write_sidecar(&json_path, &metadata)?;
        }

        info!(pages, "Export complete");
        Ok(ExportSummary {
            source: input.to_path_buf(),
            tiff_path,
            json_path,
            pages,
        })
    }

    /// Writes one page per frame in index order and returns the collected frame headers.
    ///
    /// The first read or write failure aborts; remaining frames are not written.
    pub fn write_pages<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<Vec<FrameHeader>>
    where
        R: FrameReader,
        W: PageWriter,
    {
        let description = header_json(reader.info().file_header())
            .and_then(|value| serde_json::to_string(&value))
            .map_err(|e| CaptureError::ExportIo(e.to_string()))?;
        let frames = reader.frames_in_file();
        let mut frame_headers = Vec::with_capacity(frames);

        for index in 0..frames {
            let frame = reader.read_frame(index)?;
            let datetime = page_datetime(&frame.header);
            let frame_header_json = serde_json::to_string(&frame.header)
                .map_err(|e| CaptureError::ExportIo(e.to_string()))?;

            writer
                .write_page(&TiffPage {
                    width: frame.width,
                    height: frame.height,
                    samples: &frame.samples,
                    datetime: &datetime,
                    description: &description,
                    frame_header_json: &frame_header_json,
                })
                .inspect_err(|e| error!(index, "Aborting export: {}", e))?;

            frame_headers.push(frame.header);
        }

        Ok(frame_headers)
    }

    /// Runs [`export`](Self::export) on a dedicated thread.
    pub fn spawn(&self, input: impl Into<PathBuf>) -> ExportHandle {
        let exporter = self.clone();
        let input = input.into();
        let source = input.clone();
        let handle = thread::Builder::new()
            .name("capture-export".to_string())
            .spawn(move || exporter.export(&input));

        match handle {
            Ok(handle) => ExportHandle {
                source,
                state: HandleState::Running(handle),
            },
            Err(e) => ExportHandle {
                source,
                state: HandleState::NotStarted(e.into()),
            },
        }
    }
}

enum HandleState {
    Running(JoinHandle<Result<ExportSummary>>),
    NotStarted(CaptureError),
}

/// A background export job. Export jobs cannot be cancelled.
pub struct ExportHandle {
    source: PathBuf,
    state: HandleState,
}

impl ExportHandle {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Running(handle) => handle.is_finished(),
            HandleState::NotStarted(_) => true,
        }
    }

    /// Waits for the job and returns its outcome.
    pub fn join(self) -> Result<ExportSummary> {
        match self.state {
            HandleState::Running(handle) => handle.join().unwrap_or_else(|_| {
                Err(CaptureError::ExportIo(format!(
                    "export thread for {} panicked",
                    self.source.display()
                )))
            }),
            HandleState::NotStarted(e) => Err(e),
        }
    }
}

/// Wall-clock time of a frame from its `system_micros`, in TIFF `DateTime` form (UTC).
pub fn page_datetime(header: &FrameHeader) -> String {
    let seconds = (header.system_micros / 1_000_000) as i64;
    let datetime = DateTime::from_timestamp(seconds, 0).unwrap_or_else(|| {
        warn!(system_micros = header.system_micros, "Frame time out of range");
        DateTime::<Utc>::default()
    });
    datetime.format("%Y:%m:%d %H:%M:%S").to_string()
}

/// File header as a JSON value; page descriptions and the sidecar share this form.
fn header_json(header: &FileHeader) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(header)
}

/// Indented JSON with keys sorted at every level.
fn write_sidecar(path: &Path, metadata: &CaptureMetadata) -> Result<()> {
    let value = header_json(&metadata.file_header)
        .and_then(|file_header| {
            let frame_headers = serde_json::to_value(&metadata.frame_headers)?;
            Ok(serde_json::json!({
                "file_header": file_header,
                "frame_headers": frame_headers,
            }))
        })
        .map_err(|e| CaptureError::ExportIo(e.to_string()))?;

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| CaptureError::ExportIo(e.to_string()))?;

    std::fs::write(path, buffer)
        .map_err(|e| CaptureError::ExportIo(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::image_pipeline::capture::test_support::{file_header, frame_header, write_capture};
    use crate::image_pipeline::capture::{CaptureInfo, PixelFormat, RawFrame, RawSamples};

    struct MockReader {
        info: CaptureInfo,
    }

    impl MockReader {
        fn new(frames: usize) -> Self {
            let header = file_header(PixelFormat::Mono8, 2, 2);
            Self {
                info: CaptureInfo::new("mock.bin", 64 + frames as u64 * 40, header).unwrap(),
            }
        }
    }

    impl FrameReader for MockReader {
        fn info(&self) -> &CaptureInfo {
            &self.info
        }

        fn read_frame(&mut self, index: usize) -> Result<RawFrame> {
            Ok(RawFrame {
                header: frame_header(index, 2, 2),
                width: 2,
                height: 2,
                samples: RawSamples::Mono8(vec![index as u8; 4]),
            })
        }
    }

    struct MockWriter {
        fail_at: Option<usize>,
        written: Arc<Mutex<Vec<String>>>,
    }

    impl PageWriter for MockWriter {
        fn write_page(&mut self, page: &TiffPage<'_>) -> Result<()> {
            if self.fail_at == Some(self.pages_written()) {
                return Err(CaptureError::ExportIo("Mock encode error".to_string()));
            }
            self.written
                .lock()
                .unwrap()
                .push(page.frame_header_json.to_string());
            Ok(())
        }

        fn pages_written(&self) -> usize {
            self.written.lock().unwrap().len()
        }
    }

    #[test]
    fn test_write_pages_in_order() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut writer = MockWriter {
            fail_at: None,
            written: written.clone(),
        };

        let headers = CaptureExporter::default()
            .write_pages(&mut MockReader::new(3), &mut writer)
            .unwrap();

        assert_eq!(headers.len(), 3);
        let written = written.lock().unwrap();
        for (index, json) in written.iter().enumerate() {
            let parsed: FrameHeader = serde_json::from_str(json).unwrap();
            assert_eq!(parsed, headers[index]);
            assert_eq!(parsed.frame_number, index as u32);
        }
    }

    #[test]
    fn test_writer_failure_aborts_remaining_pages() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut writer = MockWriter {
            fail_at: Some(1),
            written: written.clone(),
        };

        let result = CaptureExporter::default().write_pages(&mut MockReader::new(4), &mut writer);

        assert!(matches!(result, Err(CaptureError::ExportIo(_))));
        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_output_paths_beside_source() {
        let exporter = CaptureExporter::default();
        let (tiff, json) = exporter.output_paths(Path::new("/data/dive1/cam_0001.bin"));
        assert_eq!(tiff, PathBuf::from("/data/dive1/cam_0001.tiff"));
        assert_eq!(json, PathBuf::from("/data/dive1/cam_0001.json"));
    }

    #[test]
    fn test_output_paths_in_output_dir() {
        let config = ExportConfig::builder()
            .output_dir(Some(PathBuf::from("/exports")))
            .build();
        let (tiff, json) = CaptureExporter::new(config).output_paths(Path::new("/data/cam.bin"));
        assert_eq!(tiff, PathBuf::from("/exports/cam.tiff"));
        assert_eq!(json, PathBuf::from("/exports/cam.json"));
    }

    #[test]
    fn test_output_paths_keep_dotted_stem() {
        let (tiff, _) = CaptureExporter::default().output_paths(Path::new("dive.v2.bin"));
        assert_eq!(tiff, PathBuf::from("dive.v2.tiff"));
    }

    #[test]
    fn test_page_datetime_from_system_micros() {
        let header = FrameHeader {
            system_micros: 1_600_000_000_999_999,
            ..FrameHeader::default()
        };
        assert_eq!(page_datetime(&header), "2020:09:13 12:26:40");
    }

    #[test]
    fn test_sidecar_keys_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let header = file_header(PixelFormat::Mono8, 2, 2);
        let path = write_capture(dir.path(), "cap.bin", &header, &[vec![1; 4], vec![2; 4]]);

        let summary = CaptureExporter::default().export(&path).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.json_path, dir.path().join("cap.json"));

        let text = std::fs::read_to_string(&summary.json_path).unwrap();
        assert!(text.starts_with("{\n    \"file_header\": {\n        \"binning_mode\": 0,"));
        let frame_headers_at = text.find("\"frame_headers\"").unwrap();
        assert!(text.find("\"file_header\"").unwrap() < frame_headers_at);

        let metadata: CaptureMetadata = serde_json::from_str(&text).unwrap();
        assert_eq!(metadata.file_header, header);
        assert_eq!(metadata.frame_headers.len(), 2);
        assert_eq!(metadata.frame_headers[1], frame_header(1, 2, 2));
    }

    #[test]
    fn test_page_description_matches_sidecar_header() {
        let dir = tempfile::tempdir().unwrap();
        let header = FileHeader {
            gain: 0.1,
            red_gain: f32::NAN,
            ..file_header(PixelFormat::Mono8, 2, 2)
        };
        let path = write_capture(dir.path(), "cap.bin", &header, &[vec![3; 4]]);

        let summary = CaptureExporter::default().export(&path).unwrap();

        let text = std::fs::read_to_string(&summary.json_path).unwrap();
        let sidecar: serde_json::Value = serde_json::from_str(&text).unwrap();
        let mut decoder =
            ::tiff::decoder::Decoder::new(File::open(&summary.tiff_path).unwrap()).unwrap();
        let description = decoder
            .get_tag_ascii_string(::tiff::tags::Tag::ImageDescription)
            .unwrap();
        let description: serde_json::Value = serde_json::from_str(&description).unwrap();
        assert_eq!(description, sidecar["file_header"]);

        let metadata: CaptureMetadata = serde_json::from_str(&text).unwrap();
        assert_eq!(metadata.file_header.gain, 0.1);
        assert!(metadata.file_header.red_gain.is_nan());
        assert_eq!(metadata.file_header.exposure_time, 1.5);
    }

    #[test]
    fn test_missing_output_dir_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let header = file_header(PixelFormat::Mono8, 2, 2);
        let path = write_capture(dir.path(), "cap.bin", &header, &[vec![1; 4]]);
        let config = ExportConfig::builder()
            .output_dir(Some(dir.path().join("missing")))
            .build();

        let result = CaptureExporter::new(config).export(&path);

        assert!(matches!(result, Err(CaptureError::ExportIo(_))));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_export_missing_file_fails_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let handle = CaptureExporter::default().spawn(dir.path().join("gone.bin"));
        assert!(matches!(handle.join(), Err(CaptureError::NotFound(_))));
    }
}
