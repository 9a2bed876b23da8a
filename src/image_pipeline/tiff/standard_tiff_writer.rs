use std::io::{Seek, Write};

use tiff::encoder::colortype::{ColorType, Gray8, Gray16};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use crate::image_pipeline::capture::RawSamples;
use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::tiff::types::TiffCompression;
use crate::image_pipeline::tiff::writer::{PageWriter, TiffPage};

/// Private tag carrying the JSON frame header on every page.
pub const FRAME_HEADER_TAG: u16 = 65000;

fn encode_error(e: tiff::TiffError) -> CaptureError {
    CaptureError::ExportIo(e.to_string())
}

/// Appends grayscale pages to a single TIFF stream.
pub struct MultiPageTiffWriter<W: Write + Seek> {
    encoder: TiffEncoder<W>,
    pages: usize,
}

impl<W: Write + Seek> MultiPageTiffWriter<W> {
    pub fn new(output: W, compression: TiffCompression) -> Result<Self> {
        let compression = match compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        };

        let encoder = TiffEncoder::new(output)
            .map_err(encode_error)?
            .with_compression(compression);

        Ok(Self { encoder, pages: 0 })
    }

    fn write_typed<C>(&mut self, page: &TiffPage<'_>, data: &[C::Inner]) -> Result<()>
    where
        C: ColorType,
        [C::Inner]: TiffValue,
    {
        let mut image = self
            .encoder
            .new_image::<C>(page.width as u32, page.height as u32)
            .map_err(encode_error)?;

        let directory = image.encoder();
        directory
            .write_tag(Tag::DateTime, page.datetime)
            .map_err(encode_error)?;
        directory
            .write_tag(Tag::ImageDescription, page.description)
            .map_err(encode_error)?;
        directory
            .write_tag(Tag::Unknown(FRAME_HEADER_TAG), page.frame_header_json)
            .map_err(encode_error)?;

        image.write_data(data).map_err(encode_error)
    }
}

impl<W: Write + Seek> PageWriter for MultiPageTiffWriter<W> {
    fn write_page(&mut self, page: &TiffPage<'_>) -> Result<()> {
        debug!("Encoding TIFF page {}: {}x{}", self.pages, page.width, page.height);

        match page.samples {
            RawSamples::Mono8(data) => self.write_typed::<Gray8>(page, data)?,
            RawSamples::Mono16(data) => self.write_typed::<Gray16>(page, data)?,
        }

        self.pages += 1;
        Ok(())
    }

    fn pages_written(&self) -> usize {
        self.pages
    }
}
