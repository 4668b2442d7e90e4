//! TIFF reading/writing through the `tiff` crate.
//!
//! Outputs are written uncompressed as Gray/RGB/RGBA with 8-bit, 16-bit or
//! 32-bit float samples. Metadata fields copied from another image are
//! written as extra IFD0 tags.

use crate::error::{Error, Result};
use crate::io::metadata::{self, FieldIfd, FieldValue, MetadataField};
use crate::raster::{BandStack, EncodedImage, Samples};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    ColorType as EncoderColor, Gray16, Gray32Float, Gray8, RGB16, RGB32Float, RGB8, RGBA16,
    RGBA32Float, RGBA8,
};
use tiff::encoder::{Rational, SRational, TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType;

/// Read a TIFF file into a floating point stack (alpha dropped)
pub fn read_tiff<P: AsRef<Path>>(path: P) -> Result<BandStack> {
    let file = File::open(path.as_ref())?;
    decode_tiff(BufReader::new(file))?.to_band_stack_without_alpha()
}

/// Read a TIFF file keeping its exact sample type
pub fn read_tiff_encoded<P: AsRef<Path>>(path: P) -> Result<EncodedImage> {
    let file = File::open(path.as_ref())?;
    Ok(decode_tiff(BufReader::new(file))?.image)
}

/// Write an encoded image as TIFF, with optional extra metadata tags
pub fn write_tiff<P: AsRef<Path>>(
    image: &EncodedImage,
    path: P,
    fields: &[MetadataField],
) -> Result<()> {
    // Encode to memory first so a failed encode never leaves a truncated file.
    let mut buf = Vec::new();
    encode_tiff(image, Cursor::new(&mut buf), fields)?;
    std::fs::write(path.as_ref(), buf)?;
    Ok(())
}

struct DecodedTiff {
    image: EncodedImage,
    has_alpha: bool,
}

impl DecodedTiff {
    fn to_band_stack_without_alpha(&self) -> Result<BandStack> {
        let keep = if self.has_alpha {
            self.image.bands - 1
        } else {
            self.image.bands
        };
        let rows = self.image.height as usize;
        let cols = self.image.width as usize;
        let stride = self.image.bands;
        match &self.image.samples {
            Samples::U8(v) => BandStack::from_interleaved(v, rows, cols, stride, keep),
            Samples::U16(v) => BandStack::from_interleaved(v, rows, cols, stride, keep),
            Samples::F32(v) => BandStack::from_interleaved(v, rows, cols, stride, keep),
        }
    }
}

/// Internal: decode a TIFF from any `Read + Seek` source
fn decode_tiff<R: Read + Seek>(reader: R) -> Result<DecodedTiff> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let (bands, has_alpha) = match decoder.colortype()? {
        ColorType::Gray(_) => (1, false),
        ColorType::GrayA(_) => (2, true),
        ColorType::RGB(_) => (3, false),
        ColorType::RGBA(_) => (4, true),
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "TIFF color type {:?}",
                other
            )))
        }
    };

    let samples = match decoder.read_image()? {
        DecodingResult::U8(buf) => Samples::U8(buf),
        DecodingResult::U16(buf) => Samples::U16(buf),
        DecodingResult::F32(buf) => Samples::F32(buf),
        DecodingResult::F64(buf) => Samples::F32(buf.into_iter().map(|v| v as f32).collect()),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF sample format".to_string(),
            ))
        }
    };

    Ok(DecodedTiff {
        image: EncodedImage::new(width, height, bands, samples)?,
        has_alpha,
    })
}

/// Internal: encode into any `Write + Seek` sink
fn encode_tiff<W: Write + Seek>(
    image: &EncodedImage,
    writer: W,
    fields: &[MetadataField],
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (w, h) = (image.width, image.height);

    match (&image.samples, image.bands) {
        (Samples::U8(d), 1) => write_image::<Gray8, _>(&mut encoder, w, h, d, fields),
        (Samples::U8(d), 3) => write_image::<RGB8, _>(&mut encoder, w, h, d, fields),
        (Samples::U8(d), 4) => write_image::<RGBA8, _>(&mut encoder, w, h, d, fields),
        (Samples::U16(d), 1) => write_image::<Gray16, _>(&mut encoder, w, h, d, fields),
        (Samples::U16(d), 3) => write_image::<RGB16, _>(&mut encoder, w, h, d, fields),
        (Samples::U16(d), 4) => write_image::<RGBA16, _>(&mut encoder, w, h, d, fields),
        (Samples::F32(d), 1) => write_image::<Gray32Float, _>(&mut encoder, w, h, d, fields),
        (Samples::F32(d), 3) => write_image::<RGB32Float, _>(&mut encoder, w, h, d, fields),
        (Samples::F32(d), 4) => write_image::<RGBA32Float, _>(&mut encoder, w, h, d, fields),
        (samples, bands) => Err(Error::UnsupportedDataType(format!(
            "TIFF output with {} band(s) of {}",
            bands,
            samples.type_name()
        ))),
    }
}

fn write_image<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    fields: &[MetadataField],
) -> Result<()>
where
    C: EncoderColor,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder.new_image::<C>(width, height)?;

    // GPS and interop tags have their own numbering and need their own IFD
    let copied = fields.iter().filter(|f| {
        matches!(f.ifd, FieldIfd::Primary | FieldIfd::Exif)
            && !metadata::is_structural_tiff_tag(f.tag)
    });
    for field in copied {
        let tag = Tag::Unknown(field.tag);
        let dir = image.encoder();
        match &field.value {
            FieldValue::Ascii(s) => dir.write_tag(tag, s.as_str())?,
            FieldValue::Byte(v) | FieldValue::Undefined(v) => {
                dir.write_tag(tag, v.as_slice())?
            }
            FieldValue::Short(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::Long(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::SShort(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::SLong(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::Float(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::Double(v) => dir.write_tag(tag, v.as_slice())?,
            FieldValue::Rational(v) => {
                let r: Vec<Rational> = v.iter().map(|&(n, d)| Rational { n, d }).collect();
                dir.write_tag(tag, r.as_slice())?
            }
            FieldValue::SRational(v) => {
                let r: Vec<SRational> = v.iter().map(|&(n, d)| SRational { n, d }).collect();
                dir.write_tag(tag, r.as_slice())?
            }
        }
    }

    image.write_data(data)?;
    Ok(())
}
