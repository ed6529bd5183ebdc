#![forbid(unsafe_code)]

//! Data model and configuration for slide SVG tables (headless).
//!
//! - [`model`]: rows, column specs, format kinds, justification
//! - [`format`]: cell value formatting
//! - [`palette`]: the immutable color registry used by renders and highlights
//! - [`config`]: rendering configuration loaded from JSON/YAML
//! - [`tables`]: named table definitions
//! - [`source`]: inline rows or JSON fetched through a [`source::Fetcher`]

pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod palette;
pub mod source;
pub mod tables;

pub use config::{OverlayConfig, RenderConfig, SizingConfig};
pub use error::{Error, Result};
pub use format::{CellFormatter, StandardFormatter, format_value};
pub use model::{ColumnSpec, FormatKind, Justify, Row, cell};
pub use palette::Palette;
pub use source::{Fetcher, FsFetcher, RowSource, load_rows, parse_rows};
pub use tables::{TableSpec, TableSpecRegistry};

#[cfg(test)]
mod tests;
