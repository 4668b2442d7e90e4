//! Raster data structures and operations

mod element;
mod encoded;
mod grid;
mod stack;

pub use element::RasterElement;
pub use encoded::{EncodedImage, Samples};
pub use grid::{Raster, RasterStatistics};
pub use stack::BandStack;
