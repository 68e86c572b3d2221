// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel buffers at either end of the transform chain. Decoding happens here
// (producing `RawImage`), and so does encoding and writing of the final
// `NormalizedImage`.

use std::io::Write;
use std::path::Path;

use fundus_core::error::{FundusError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// A decoded 3-channel colour image of arbitrary size.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pixels: RgbImage,
}

impl RawImage {
    /// Decode an image file. The format is guessed from the file contents.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = image::ImageReader::open(path.as_ref())
            .and_then(|r| r.with_guessed_format())
            .map_err(|err| {
                FundusError::Decode(format!("failed to open {}: {}", path.as_ref().display(), err))
            })?;
        let img = reader.decode().map_err(|err| {
            FundusError::Decode(format!(
                "failed to decode {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = img.width(), height = img.height(), "Image decoded");
        Ok(Self::from_dynamic(img))
    }

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| FundusError::Decode(format!("failed to decode image: {}", err)))?;
        Ok(Self::from_dynamic(img))
    }

    /// Convert any decoded image to 8-bit RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.into_rgb8(),
        }
    }

    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Output of the transform chain: always exactly the configured target size.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pixels: RgbImage,
}

impl NormalizedImage {
    pub(crate) fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_rgb(self) -> RgbImage {
        self.pixels
    }

    /// Encode as JPEG with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        self.pixels
            .write_with_encoder(encoder)
            .map_err(|err| FundusError::Write(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode in the given container format. JPEG uses `jpeg_quality`.
    pub fn encode(&self, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        if format == ImageFormat::Jpeg {
            return self.to_jpeg_bytes(jpeg_quality);
        }
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        DynamicImage::ImageRgb8(self.pixels.clone())
            .write_to(&mut cursor, format)
            .map_err(|err| FundusError::Write(format!("{:?} encoding failed: {}", format, err)))?;
        Ok(buffer)
    }

    /// Write the image to `path`, choosing the encoding from its extension.
    ///
    /// The bytes go to a hidden sibling file first and are renamed into place,
    /// so `path` only ever holds a complete image. The sibling is removed if
    /// anything fails.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn save(&self, path: &Path, jpeg_quality: u8) -> Result<()> {
        let format = ImageFormat::from_path(path).map_err(|err| {
            FundusError::Write(format!("no encoder for {}: {}", path.display(), err))
        })?;
        let bytes = self.encode(format, jpeg_quality)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| FundusError::Write(format!("{} has no file name", path.display())))?;
        let partial = path.with_file_name(format!(".{}.partial", file_name.to_string_lossy()));

        let written = std::fs::File::create(&partial)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&partial, path));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&partial);
            return Err(FundusError::Write(format!(
                "failed to write {}: {}",
                path.display(),
                err
            )));
        }
        debug!(bytes = bytes.len(), "Normalized image written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn zero_byte_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpeg");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(RawImage::open(&path), Err(FundusError::Decode(_))));
    }

    #[test]
    fn missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RawImage::open(dir.path().join("nope.jpeg")),
            Err(FundusError::Decode(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_decode_error() {
        assert!(matches!(
            RawImage::from_bytes(b"definitely not an image"),
            Err(FundusError::Decode(_))
        ));
    }

    #[test]
    fn grayscale_and_rgba_inputs_become_rgb() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 3, image::Luma([9])));
        let raw = RawImage::from_dynamic(gray);
        assert_eq!((raw.width(), raw.height()), (4, 3));
        assert_eq!(raw.as_rgb().get_pixel(0, 0), &Rgb([9, 9, 9]));
    }

    #[test]
    fn save_writes_decodable_jpeg_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpeg");
        NormalizedImage::new(gradient(32, 16)).save(&path, 95).unwrap();

        let decoded = RawImage::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn png_output_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let pixels = gradient(8, 8);
        NormalizedImage::new(pixels.clone()).save(&path, 95).unwrap();
        assert_eq!(RawImage::open(&path).unwrap().as_rgb(), &pixels);
    }

    #[test]
    fn unwritable_target_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.jpeg");
        std::fs::create_dir(&path).unwrap();

        let err = NormalizedImage::new(gradient(8, 8)).save(&path, 95).unwrap_err();
        assert!(matches!(err, FundusError::Write(_)));
        assert!(!dir.path().join(".taken.jpeg.partial").exists());
    }
}
