//! JPEG marker-segment surgery for EXIF metadata

use crate::error::{Error, Result};

const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
/// Segment length field counts itself
const MAX_SEGMENT_PAYLOAD: usize = 0xFFFF - 2;

/// Replace the EXIF APP1 segment of a JPEG stream.
///
/// Existing EXIF segments are dropped. When `tiff_payload` is given a new
/// segment is inserted right after SOI, or after the leading APP0 (JFIF)
/// segments when present. Everything from SOS on is copied untouched.
pub fn replace_exif_segment(jpeg: &[u8], tiff_payload: Option<&[u8]>) -> Result<Vec<u8>> {
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != SOI {
        return Err(Error::Metadata("not a JPEG stream".into()));
    }

    let segment = tiff_payload.map(exif_segment).transpose()?;

    let mut out = Vec::with_capacity(jpeg.len() + segment.as_ref().map_or(0, Vec::len));
    out.extend_from_slice(&jpeg[..2]);

    let mut inserted = segment.is_none();
    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return Err(Error::Metadata(format!("bad JPEG marker at offset {}", pos)));
        }
        let marker = jpeg[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }
        if marker == SOS {
            break;
        }

        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(Error::Metadata("truncated JPEG segment".into()));
        }

        if !inserted && marker != APP0 {
            if let Some(seg) = &segment {
                out.extend_from_slice(seg);
            }
            inserted = true;
        }

        let is_exif = marker == APP1 && jpeg[pos + 4..end].starts_with(EXIF_HEADER);
        if !is_exif {
            out.extend_from_slice(&jpeg[pos..end]);
        }
        pos = end;
    }

    if !inserted {
        if let Some(seg) = &segment {
            out.extend_from_slice(seg);
        }
    }
    out.extend_from_slice(&jpeg[pos..]);
    Ok(out)
}

fn exif_segment(tiff_payload: &[u8]) -> Result<Vec<u8>> {
    let payload_len = EXIF_HEADER.len() + tiff_payload.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(Error::Metadata(format!(
            "EXIF block of {} bytes does not fit in one APP1 segment",
            payload_len
        )));
    }

    let mut seg = Vec::with_capacity(payload_len + 4);
    seg.extend_from_slice(&[0xFF, APP1]);
    seg.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    seg.extend_from_slice(EXIF_HEADER);
    seg.extend_from_slice(tiff_payload);
    Ok(seg)
}
