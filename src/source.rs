//! Image sources: something with a known size that can decode itself toward
//! a requested target size.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::error::ImageError;
use image::{ImageFormat, ImageReader, RgbaImage, imageops};
use jpeg_decoder::{Decoder as JpegDecoder, PixelFormat};
use tracing::debug;

use crate::error::{DecodeError, Error};
use crate::processing::resize::{subsample, subsample_toward, subsampled_size};

/// A decodable image.
///
/// Sources are handed to the decode worker, so they must be shareable
/// across threads.
pub trait ImageSource: Send + Sync {
    /// Natural size after orientation. `(0, 0)` means there is nothing to show.
    fn size(&self) -> (u32, u32);

    /// Decode at roughly `target_width`x`target_height`, never smaller than
    /// the target by more than a factor of two on the constraining axis.
    ///
    /// # Errors
    /// [`DecodeError::OutOfMemory`] when the decode does not fit the memory
    /// budget at this size, [`DecodeError::Failed`] otherwise.
    fn decode(&self, target_width: u32, target_height: u32) -> Result<RgbaImage, DecodeError>;

    /// Small decode used to estimate brightness.
    ///
    /// # Errors
    /// Same as [`ImageSource::decode`].
    fn decode_probe(&self, max_dimension: u32) -> Result<RgbaImage, DecodeError> {
        self.decode(max_dimension, max_dimension)
    }
}

/// Image file on disk, decoded with EXIF orientation applied.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    format: Option<ImageFormat>,
    raw_width: u32,
    raw_height: u32,
    orientation: u16,
    max_decode_bytes: u64,
}

impl FileImageSource {
    /// Read the header and orientation of `path`.
    ///
    /// # Errors
    /// Returns an error when the file cannot be opened or its dimensions
    /// cannot be determined.
    pub fn open(path: impl Into<PathBuf>, max_decode_bytes: u64) -> Result<Self, Error> {
        let path = path.into();
        let reader = ImageReader::open(&path)?.with_guessed_format()?;
        let format = reader.format();
        let (raw_width, raw_height) = reader.into_dimensions()?;
        let orientation = read_orientation(&path).unwrap_or(1);
        Ok(Self {
            path,
            format,
            raw_width,
            raw_height,
            orientation,
            max_decode_bytes,
        })
    }

    fn swaps_axes(&self) -> bool {
        (5..=8).contains(&self.orientation)
    }

    fn decode_raw(&self, width: u32, height: u32) -> Result<RgbaImage, DecodeError> {
        if matches!(self.format, Some(ImageFormat::Jpeg)) {
            match self.decode_jpeg_scaled(width, height) {
                Ok(img) => return Ok(img),
                Err(err) => {
                    debug!(path = %self.path.display(), error = %err, "scaled JPEG decode failed; using full decode");
                }
            }
        }

        let mut reader = ImageReader::open(&self.path)
            .map_err(|err| DecodeError::Failed(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| DecodeError::Failed(err.to_string()))?;
        let mut limits = image::Limits::default();
        limits.max_alloc = Some(self.max_decode_bytes);
        reader.limits(limits);
        let decoded = reader.decode().map_err(|err| match err {
            ImageError::Limits(_) => DecodeError::OutOfMemory {
                width: self.raw_width,
                height: self.raw_height,
            },
            other => DecodeError::Failed(other.to_string()),
        })?;
        Ok(decoded.to_rgba8())
    }

    fn decode_jpeg_scaled(&self, width: u32, height: u32) -> Result<RgbaImage, DecodeError> {
        let failed = |err: jpeg_decoder::Error| DecodeError::Failed(err.to_string());
        let file = File::open(&self.path).map_err(|err| DecodeError::Failed(err.to_string()))?;
        let mut decoder = JpegDecoder::new(BufReader::new(file));
        let request_w = width.clamp(1, u32::from(u16::MAX)) as u16;
        let request_h = height.clamp(1, u32::from(u16::MAX)) as u16;
        decoder.scale(request_w, request_h).map_err(failed)?;
        let pixels = decoder.decode().map_err(failed)?;
        let info = decoder
            .info()
            .ok_or_else(|| DecodeError::Failed("missing JPEG info".into()))?;

        let rgba: Vec<u8> = match info.pixel_format {
            PixelFormat::RGB24 => pixels
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            PixelFormat::L8 => pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            PixelFormat::CMYK32 => pixels
                .chunks_exact(4)
                .flat_map(|px| {
                    let k = f32::from(px[3]) / 255.0;
                    let channel = |c: u8| {
                        let c = f32::from(c) / 255.0 * (1.0 - k) + k;
                        ((1.0 - c) * 255.0).round().clamp(0.0, 255.0) as u8
                    };
                    [channel(px[0]), channel(px[1]), channel(px[2]), 255]
                })
                .collect(),
            PixelFormat::L16 => {
                return Err(DecodeError::Failed(
                    "16-bit grayscale JPEG needs the full decoder".into(),
                ));
            }
        };
        RgbaImage::from_raw(u32::from(info.width), u32::from(info.height), rgba)
            .ok_or_else(|| DecodeError::Failed("JPEG buffer size mismatch".into()))
    }
}

impl ImageSource for FileImageSource {
    fn size(&self) -> (u32, u32) {
        if self.swaps_axes() {
            (self.raw_height, self.raw_width)
        } else {
            (self.raw_width, self.raw_height)
        }
    }

    fn decode(&self, target_width: u32, target_height: u32) -> Result<RgbaImage, DecodeError> {
        let (raw_tw, raw_th) = if self.swaps_axes() {
            (target_height, target_width)
        } else {
            (target_width, target_height)
        };
        let (out_w, out_h) = subsampled_size(self.raw_width, self.raw_height, raw_tw, raw_th);
        if u64::from(out_w) * u64::from(out_h) * 4 > self.max_decode_bytes {
            return Err(DecodeError::OutOfMemory {
                width: out_w,
                height: out_h,
            });
        }

        let decoded = self.decode_raw(out_w, out_h)?;
        let sized = if decoded.dimensions() == (out_w, out_h) {
            decoded
        } else {
            subsample(&decoded, out_w, out_h)
                .map_err(|err| DecodeError::Failed(format!("{err:#}")))?
        };
        debug!(
            path = %self.path.display(),
            width = out_w,
            height = out_h,
            orientation = self.orientation,
            "decoded artwork"
        );
        Ok(apply_orientation(sized, self.orientation))
    }
}

/// Already-decoded pixels, shared without copying.
#[derive(Debug, Clone)]
pub struct MemoryImageSource {
    image: Arc<RgbaImage>,
}

impl MemoryImageSource {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }
}

impl ImageSource for MemoryImageSource {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn decode(&self, target_width: u32, target_height: u32) -> Result<RgbaImage, DecodeError> {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Err(DecodeError::Failed("empty image".into()));
        }
        subsample_toward(&self.image, target_width, target_height)
            .map_err(|err| DecodeError::Failed(format!("{err:#}")))
    }
}

/// Rotate/flip `img` so it displays upright for the given EXIF orientation.
#[must_use]
pub fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, path = %path.display(), "exif orientation");
    Some(orientation)
}
