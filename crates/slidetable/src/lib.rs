#![forbid(unsafe_code)]

//! `slidetable` renders JSON rows as SVG tables sized to a slide container, and animates
//! row/column/cell highlight overlays on top of them.
//!
//! # Features
//!
//! - `raster`: enable PNG output via pure-Rust SVG rasterization (`slidetable::render::raster`)

pub use slidetable_core::*;

pub mod render {
    pub use slidetable_render::svg;
    pub use slidetable_render::svg::escape_xml;
    pub use slidetable_render::text::{
        DeterministicTextMeasurer, GlyphEstimateTextMeasurer, TextMeasurer, TextMetrics,
        TextStyle,
    };
    pub use slidetable_render::{
        Error, FormattedTable, HighlightTarget, LayoutOptions, LayoutRequest, OverlayRect,
        RenderedTable, Result, Size, SvgRenderOptions, TableLayout, compute_overlay_rect,
        render_overlay_svg, render_table, render_table_svg, solve_layout,
    };

    #[cfg(feature = "raster")]
    pub mod raster;
}

pub mod stage;

pub use stage::{Host, Overlay, OverlayPhase, Stage, StageError, TableRequest};
