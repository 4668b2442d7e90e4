//! EXIF metadata access.
//!
//! Fields are read with `kamadak-exif` from any container it understands
//! (JPEG, TIFF, PNG, ...). Writing is supported for JPEG (APP1 segment) and
//! TIFF (extra IFD0 tags).

use crate::error::{Error, Result};
use crate::io::{jpeg, tiff_io, ImageFormat};
use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::debug;

/// EXIF `UserComment`
pub const USER_COMMENT_TAG: u16 = 0x9286;

const ASCII_PREFIX: &[u8; 8] = b"ASCII\0\0\0";
const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";
const UNDEFINED_PREFIX: &[u8; 8] = &[0; 8];

/// IFD a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIfd {
    Primary,
    Exif,
    Gps,
    Interop,
}

/// Value of a metadata field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Ascii(String),
    Byte(Vec<u8>),
    Undefined(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Rational(Vec<(u32, u32)>),
    SRational(Vec<(i32, i32)>),
}

/// One metadata field of the primary image
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataField {
    pub ifd: FieldIfd,
    pub tag: u16,
    pub value: FieldValue,
}

impl MetadataField {
    /// The user comment field holding `text`
    pub fn user_comment(text: &str) -> Self {
        Self {
            ifd: FieldIfd::Exif,
            tag: USER_COMMENT_TAG,
            value: FieldValue::Undefined(encode_user_comment(text)),
        }
    }

    pub fn is_user_comment(&self) -> bool {
        self.tag == USER_COMMENT_TAG
    }

    /// Decoded text of a user comment value
    pub fn comment_text(&self) -> Option<String> {
        match &self.value {
            FieldValue::Undefined(bytes) | FieldValue::Byte(bytes) => decode_user_comment(bytes),
            FieldValue::Ascii(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Tags describing the pixel layout or pointing at other IFDs.
///
/// These belong to the file being written and are never copied.
pub fn is_structural_tiff_tag(tag: u16) -> bool {
    matches!(
        tag,
        256..=259           // width, length, bits per sample, compression
            | 262           // photometric interpretation
            | 273           // strip offsets
            | 277..=279     // samples per pixel, rows per strip, strip byte counts
            | 282..=284     // resolution, planar configuration
            | 296           // resolution unit
            | 317           // predictor
            | 320           // color map
            | 322..=325     // tiles
            | 338..=339     // extra samples, sample format
            | 513..=514     // JPEG thumbnail
            | 34665         // Exif IFD pointer
            | 34853         // GPS IFD pointer
            | 40965 // Interop IFD pointer
    )
}

/// Read the copyable metadata fields of the primary image.
///
/// A file without metadata yields an empty list.
pub fn read_fields(path: &Path) -> Result<Vec<MetadataField>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(exif
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter(|f| !is_structural_tiff_tag(f.tag.number()))
        .filter_map(from_exif_field)
        .collect())
}

/// Read the decoded user comment, if any
pub fn read_user_comment(path: &Path) -> Result<Option<String>> {
    Ok(read_fields(path)?
        .into_iter()
        .find(MetadataField::is_user_comment)
        .and_then(|f| f.comment_text()))
}

/// Replace the metadata of an existing image with `fields`
pub fn write_fields(path: &Path, fields: &[MetadataField]) -> Result<()> {
    match ImageFormat::from_path(path)? {
        ImageFormat::Jpeg => {
            let bytes = std::fs::read(path)?;
            let payload = encode_exif_payload(fields)?;
            let spliced = jpeg::replace_exif_segment(&bytes, payload.as_deref())?;
            std::fs::write(path, spliced)?;
        }
        ImageFormat::Tiff => {
            let image = tiff_io::read_tiff_encoded(path)?;
            tiff_io::write_tiff(&image, path, fields)?;
        }
        ImageFormat::Png => {
            return Err(Error::UnsupportedFormat(format!(
                "writing metadata to {}",
                path.display()
            )))
        }
    }
    debug!("Wrote {} metadata field(s) to {}", fields.len(), path.display());
    Ok(())
}

/// Encode a user comment with the ASCII character-code prefix
pub fn encode_user_comment(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ASCII_PREFIX.len() + text.len());
    bytes.extend_from_slice(ASCII_PREFIX);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// Decode a user comment, accepting the ASCII, UNICODE and undefined
/// character codes. Empty comments decode to `None`.
pub fn decode_user_comment(bytes: &[u8]) -> Option<String> {
    let text = if bytes.len() >= 8 && &bytes[..8] == UNICODE_PREFIX {
        let units: Vec<u16> = bytes[8..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if bytes.len() >= 8 && (&bytes[..8] == ASCII_PREFIX || &bytes[..8] == UNDEFINED_PREFIX)
    {
        String::from_utf8_lossy(&bytes[8..]).into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    let text = text.trim_end_matches(['\0', ' ']);
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Serialize fields into a TIFF-structured EXIF blob, `None` when empty
fn encode_exif_payload(fields: &[MetadataField]) -> Result<Option<Vec<u8>>> {
    let exif_fields: Vec<Field> = fields.iter().map(to_exif_field).collect();
    if exif_fields.is_empty() {
        return Ok(None);
    }

    let mut writer = Writer::new();
    for field in &exif_fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false)?;
    Ok(Some(buf.into_inner()))
}

fn from_exif_field(field: &Field) -> Option<MetadataField> {
    let ifd = match field.tag.context() {
        Context::Tiff => FieldIfd::Primary,
        Context::Exif => FieldIfd::Exif,
        Context::Gps => FieldIfd::Gps,
        Context::Interop => FieldIfd::Interop,
        // `Context` is non-exhaustive
        #[allow(unreachable_patterns)]
        _ => return None,
    };

    let value = match &field.value {
        Value::Ascii(parts) => FieldValue::Ascii(
            parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join("\0"),
        ),
        Value::Byte(v) => FieldValue::Byte(v.clone()),
        Value::Undefined(v, _) => FieldValue::Undefined(v.clone()),
        Value::Short(v) => FieldValue::Short(v.clone()),
        Value::Long(v) => FieldValue::Long(v.clone()),
        Value::SShort(v) => FieldValue::SShort(v.clone()),
        Value::SLong(v) => FieldValue::SLong(v.clone()),
        Value::Float(v) => FieldValue::Float(v.clone()),
        Value::Double(v) => FieldValue::Double(v.clone()),
        Value::Rational(v) => FieldValue::Rational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::SRational(v) => {
            FieldValue::SRational(v.iter().map(|r| (r.num, r.denom)).collect())
        }
        _ => return None,
    };

    Some(MetadataField {
        ifd,
        tag: field.tag.number(),
        value,
    })
}

fn to_exif_field(field: &MetadataField) -> Field {
    let context = match field.ifd {
        FieldIfd::Primary => Context::Tiff,
        FieldIfd::Exif => Context::Exif,
        FieldIfd::Gps => Context::Gps,
        FieldIfd::Interop => Context::Interop,
    };

    let value = match &field.value {
        FieldValue::Ascii(s) => Value::Ascii(s.split('\0').map(|p| p.as_bytes().to_vec()).collect()),
        FieldValue::Byte(v) => Value::Byte(v.clone()),
        FieldValue::Undefined(v) => Value::Undefined(v.clone(), 0),
        FieldValue::Short(v) => Value::Short(v.clone()),
        FieldValue::Long(v) => Value::Long(v.clone()),
        FieldValue::SShort(v) => Value::SShort(v.clone()),
        FieldValue::SLong(v) => Value::SLong(v.clone()),
        FieldValue::Float(v) => Value::Float(v.clone()),
        FieldValue::Double(v) => Value::Double(v.clone()),
        FieldValue::Rational(v) => Value::Rational(
            v.iter()
                .map(|&(num, denom)| exif::Rational { num, denom })
                .collect(),
        ),
        FieldValue::SRational(v) => Value::SRational(
            v.iter()
                .map(|&(num, denom)| exif::SRational { num, denom })
                .collect(),
        ),
    };

    Field {
        tag: Tag(context, field.tag),
        ifd_num: In::PRIMARY,
        value,
    }
}
