#![forbid(unsafe_code)]

//! Headless table layout and SVG emission.
//!
//! The pipeline is pure: format the rows once ([`FormattedTable`]), solve a font size and column
//! boundaries for a container ([`layout::solve_layout`]), then emit the SVG document
//! ([`svg::render_table_svg`]). Highlight overlays are computed from the layout, or from the
//! metadata embedded in a previously emitted document ([`TableLayout::from_svg`]).

pub mod highlight;
pub mod layout;
pub mod metadata;
pub mod svg;
pub mod text;

pub use highlight::{HighlightTarget, OverlayRect, compute_overlay_rect};
pub use layout::{FormattedTable, LayoutRequest, Size, TableLayout, solve_layout};
pub use svg::{SvgRenderOptions, render_overlay_svg, render_table_svg};

use crate::text::{GlyphEstimateTextMeasurer, TextMeasurer};
use slidetable_core::{CellFormatter, ColumnSpec, RenderConfig, Row, StandardFormatter};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("table has no rows")]
    EmptyRows,
    #[error("table has no columns")]
    NoColumns,
    #[error("invalid table metadata: {message}")]
    InvalidMetadata { message: String },
    #[error("row {row} is out of range (table has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("column {col} is out of range (table has {cols} columns)")]
    ColumnOutOfRange { col: usize, cols: usize },
    #[error("invalid highlight target: {message}")]
    InvalidTarget { message: String },
    #[error("SVG parse error: {0}")]
    SvgParse(#[from] roxmltree::Error),
    #[error(transparent)]
    Core(#[from] slidetable_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    pub formatter: Arc<dyn CellFormatter + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(GlyphEstimateTextMeasurer),
            formatter: Arc::new(StandardFormatter),
        }
    }
}

impl std::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOptions").finish_non_exhaustive()
    }
}

/// A rendered table: the SVG document plus the geometry it was built from.
#[derive(Debug, Clone)]
pub struct RenderedTable {
    pub svg: String,
    pub layout: TableLayout,
    pub table: FormattedTable,
}

/// Formats, lays out and emits a table in one call.
pub fn render_table(
    rows: &[Row],
    columns: &[ColumnSpec],
    request: &LayoutRequest,
    config: &RenderConfig,
    options: &LayoutOptions,
) -> Result<RenderedTable> {
    let table = FormattedTable::new(rows, columns, options.formatter.as_ref())?;
    let layout = solve_layout(&table, request, config, options.text_measurer.as_ref())?;
    let svg = render_table_svg(
        &table,
        &layout,
        config,
        &SvgRenderOptions {
            background: request.background,
        },
    );
    tracing::debug!(
        rows = layout.rows,
        cols = layout.cols,
        font_px = layout.font_size_px,
        "rendered table svg"
    );
    Ok(RenderedTable { svg, layout, table })
}
