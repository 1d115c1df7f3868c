//! Output module
//!
//! Writes downloaded data to its destination as it arrives.
//!
//! # Overview
//!
//! This module provides:
//! - [`ByteSink`], the append-only destination seam, with [`FileSink`] and
//!   [`MemorySink`]
//! - [`PageWriter`], which joins page bodies into one artifact per
//!   [`PageLayout`]
//! - GeoJSON `FeatureCollection` assembly for geometry exports

mod geojson;
mod pages;
mod writer;

pub use geojson::{feature_collection, DEFAULT_GEOMETRY_FIELD};
pub use pages::{PageLayout, PageWriter};
pub use writer::{ByteSink, FileSink, MemorySink};
