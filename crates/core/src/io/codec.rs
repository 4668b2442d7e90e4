//! JPEG/PNG pixel I/O through the `image` crate

use crate::error::{Error, Result};
use crate::raster::{BandStack, EncodedImage, Samples};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageBuffer, Luma, Rgb, Rgba};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Decode any image the `image` crate understands, dropping alpha
pub fn read_image(path: &Path) -> Result<BandStack> {
    let img = image::open(path)?;
    let rows = img.height() as usize;
    let cols = img.width() as usize;

    match img {
        DynamicImage::ImageLuma8(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 1, 1),
        DynamicImage::ImageLumaA8(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 2, 1),
        DynamicImage::ImageRgb8(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 3, 3),
        DynamicImage::ImageRgba8(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 4, 3),
        DynamicImage::ImageLuma16(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 1, 1),
        DynamicImage::ImageLumaA16(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 2, 1),
        DynamicImage::ImageRgb16(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 3, 3),
        DynamicImage::ImageRgba16(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 4, 3),
        DynamicImage::ImageRgb32F(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 3, 3),
        DynamicImage::ImageRgba32F(b) => BandStack::from_interleaved(b.as_raw(), rows, cols, 4, 3),
        other => Err(Error::UnsupportedDataType(format!(
            "{:?} pixels in {}",
            other.color(),
            path.display()
        ))),
    }
}

/// Write 8-bit gray or RGB samples as JPEG
pub fn write_jpeg(image: &EncodedImage, path: &Path, quality: u8) -> Result<()> {
    let (data, color) = match (&image.samples, image.bands) {
        (Samples::U8(d), 1) => (d, ExtendedColorType::L8),
        (Samples::U8(d), 3) => (d, ExtendedColorType::Rgb8),
        (samples, bands) => {
            return Err(Error::UnsupportedDataType(format!(
                "JPEG output with {} band(s) of {}",
                bands,
                samples.type_name()
            )))
        }
    };

    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode(
        data,
        image.width,
        image.height,
        color,
    )?;
    writer.flush()?;
    Ok(())
}

/// Write 8-bit or 16-bit samples as PNG
pub fn write_png(image: &EncodedImage, path: &Path) -> Result<()> {
    let (w, h) = (image.width, image.height);
    let unsupported = || {
        Error::UnsupportedDataType(format!(
            "PNG output with {} band(s) of {}",
            image.bands,
            image.samples.type_name()
        ))
    };

    match (&image.samples, image.bands) {
        (Samples::U8(d), 1) => save(ImageBuffer::<Luma<u8>, _>::from_raw(w, h, d.clone()), path),
        (Samples::U8(d), 3) => save(ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, d.clone()), path),
        (Samples::U8(d), 4) => save(ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, d.clone()), path),
        (Samples::U16(d), 1) => save(ImageBuffer::<Luma<u16>, _>::from_raw(w, h, d.clone()), path),
        (Samples::U16(d), 3) => save(ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, d.clone()), path),
        (Samples::U16(d), 4) => save(ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, d.clone()), path),
        _ => Err(unsupported()),
    }
}

fn save<P>(buffer: Option<ImageBuffer<P, Vec<P::Subpixel>>>, path: &Path) -> Result<()>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let buffer = buffer.ok_or_else(|| Error::Other("pixel buffer too small".into()))?;
    buffer.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_png_roundtrip_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let image =
            EncodedImage::new(1, 2, 4, Samples::U8(vec![10, 20, 30, 255, 40, 50, 60, 128])).unwrap();

        write_png(&image, &path).unwrap();
        let stack = read_image(&path).unwrap();
        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.pixel(1, 0).unwrap(), vec![40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_jpeg_gray_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.jpg");
        let image = EncodedImage::new(8, 8, 1, Samples::U8(vec![100; 64])).unwrap();

        write_jpeg(&image, &path, 95).unwrap();
        let stack = read_image(&path).unwrap();
        assert_eq!(stack.shape(), (8, 8));
        let v = stack.pixel(3, 3).unwrap()[0];
        assert!((v - 100.0).abs() <= 2.0);
    }

    #[test]
    fn test_jpeg_rejects_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.jpg");
        let image = EncodedImage::new(1, 1, 1, Samples::U16(vec![1000])).unwrap();
        let result = write_jpeg(&image, &path, 95);
        assert!(matches!(result, Err(Error::UnsupportedDataType(_))));
        assert!(!path.exists());
    }
}
