//! Imagery algorithms for processed outputs
//!
//! - Normalized difference indices: NDVI and generic two-band indices
//! - Linear rescale between value ranges
//! - Output pixel representation policy

mod encode;
mod indices;
mod rescale;

pub use encode::{LutKind, PixelRepresentation};
pub use indices::{ndvi, normalized_difference, IndexKind};
pub use rescale::{rescale, ValueRange};
