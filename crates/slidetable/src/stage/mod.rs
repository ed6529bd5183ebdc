//! Named containers holding rendered tables and their highlight overlays.
//!
//! A [`Stage`] is the host-facing surface. Its operations never return errors: failures are
//! logged through `tracing` and the call becomes a no-op (`None`/`false`). Each operation has a
//! `try_*` twin that returns the error instead.
//!
//! All state lives behind `RefCell`s and is only borrowed between suspension points, so several
//! operations may be in flight on one thread. A render waits on the host for a usable container
//! size and on the [`Fetcher`] for row data; when two renders of one container overlap, the older
//! completion is dropped.

mod overlay;

pub use overlay::{Overlay, OverlayPhase};

use crate::render::svg::overlay_rect_markup;
use crate::render::{
    FormattedTable, HighlightTarget, LayoutOptions, LayoutRequest, RenderedTable, Size,
    TableLayout, compute_overlay_rect,
};
use indexmap::IndexMap;
use serde_json::Value;
use slidetable_core::{
    ColumnSpec, Fetcher, FsFetcher, Palette, RenderConfig, Row, RowSource, TableSpec, load_rows,
};
use std::cell::{Cell, RefCell};
use std::future::Future;

/// The environment a stage renders into.
pub trait Host {
    /// On-screen size of the named container, or `None` when no such container exists.
    fn container_size(&self, name: &str) -> Option<Size>;

    /// Resolves at the next animation frame.
    fn next_frame(&self) -> impl Future<Output = ()>;

    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("container `{name}` not found")]
    ContainerNotFound { name: String },
    #[error("container `{name}` holds no table")]
    NoTable { name: String },
    #[error("render {generation} of `{name}` was superseded by render {latest}")]
    Superseded {
        name: String,
        generation: u64,
        latest: u64,
    },
    #[error("row numbers are 1-based (got 0)")]
    ZeroRowNumber,
    #[error("no highlight on row {row_number} of `{name}`")]
    NoRowHighlight { name: String, row_number: usize },
    #[error(transparent)]
    Core(#[from] slidetable_core::Error),
    #[error(transparent)]
    Render(#[from] slidetable_render::Error),
}

pub type Result<T> = std::result::Result<T, StageError>;

/// One call to [`Stage::render_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub container: String,
    pub source: RowSource,
    pub columns: Vec<ColumnSpec>,
    pub font_size_pt: Option<f64>,
    pub column_weights: Option<Vec<f64>>,
    pub background: bool,
}

impl TableRequest {
    pub fn new(
        container: impl Into<String>,
        source: impl Into<RowSource>,
        columns: Vec<ColumnSpec>,
    ) -> Self {
        Self {
            container: container.into(),
            source: source.into(),
            columns,
            font_size_pt: None,
            column_weights: None,
            background: false,
        }
    }

    /// Builds the request from the parallel key/format/header/justify lists slide scripts pass.
    /// Any provided list whose length differs from `keys` is an error.
    pub fn from_parallel<K, F, H, J>(
        container: impl Into<String>,
        source: impl Into<RowSource>,
        keys: &[K],
        formats: &[F],
        headers: Option<&[H]>,
        justify: Option<&[J]>,
    ) -> Result<Self>
    where
        K: AsRef<str>,
        F: AsRef<str>,
        H: AsRef<str>,
        J: AsRef<str>,
    {
        let columns = ColumnSpec::from_parallel(keys, formats, headers, justify)?;
        Ok(Self::new(container, source, columns))
    }

    /// Builds the request from a named table definition.
    pub fn from_spec(
        container: impl Into<String>,
        source: impl Into<RowSource>,
        spec: &TableSpec,
    ) -> Self {
        Self {
            font_size_pt: spec.font_size_pt,
            column_weights: spec.column_weights.clone(),
            background: spec.background,
            ..Self::new(container, source, spec.columns.clone())
        }
    }

    pub fn with_font_size_pt(mut self, pt: f64) -> Self {
        self.font_size_pt = Some(pt);
        self
    }

    pub fn with_column_weights(mut self, weights: Vec<f64>) -> Self {
        self.column_weights = Some(weights);
        self
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }
}

#[derive(Debug, Clone)]
struct TableState {
    rows: Vec<Row>,
    columns: Vec<ColumnSpec>,
    request: LayoutRequest,
    rendered: RenderedTable,
}

#[derive(Debug, Clone, Default)]
enum Content {
    #[default]
    Empty,
    Table(Box<TableState>),
    /// Markup placed with [`Stage::insert_svg`].
    Markup(String),
}

#[derive(Debug, Default)]
struct ContainerState {
    content: Content,
    overlays: Vec<Overlay>,
    generation: u64,
}

impl ContainerState {
    /// Swaps in new content, tearing down every overlay that belonged to the old content.
    fn replace(&mut self, content: Content) {
        if !self.overlays.is_empty() {
            tracing::debug!(overlays = self.overlays.len(), "discarding overlays");
        }
        self.overlays.clear();
        self.content = content;
    }
}

pub struct Stage<H, F = FsFetcher> {
    host: H,
    fetcher: F,
    config: RenderConfig,
    palette: Palette,
    options: LayoutOptions,
    containers: RefCell<IndexMap<String, ContainerState>>,
    next_overlay_id: Cell<u64>,
}

impl<H, F> std::fmt::Debug for Stage<H, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("containers", &self.containers.borrow().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<H: Host, F: Fetcher> Stage<H, F> {
    pub fn new(host: H, fetcher: F) -> Self {
        let config = RenderConfig::default();
        Self {
            host,
            fetcher,
            palette: config.palette(),
            config,
            options: LayoutOptions::default(),
            containers: RefCell::new(IndexMap::new()),
            next_overlay_id: Cell::new(1),
        }
    }

    /// Replaces the configuration, rebuilding the palette from it.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.palette = config.palette();
        self.config = config;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_layout_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Renders a table into `request.container`, replacing whatever it held.
    ///
    /// Returns the solved layout, or `None` when the render failed or was superseded by a newer
    /// render of the same container. On failure the container keeps its previous contents.
    pub async fn render_table(&self, request: TableRequest) -> Option<TableLayout> {
        let container = request.container.clone();
        match self.try_render_table(request).await {
            Ok(layout) => Some(layout),
            Err(err @ StageError::Superseded { .. }) => {
                tracing::warn!(container = %container, "{err}");
                None
            }
            Err(err) => {
                tracing::error!(container = %container, error = %err, "render_table failed");
                None
            }
        }
    }

    pub async fn try_render_table(&self, request: TableRequest) -> Result<TableLayout> {
        let name = request.container;
        self.require_container(&name)?;
        if request.columns.is_empty() {
            return Err(slidetable_core::Error::NoColumns.into());
        }

        let generation = {
            let mut containers = self.containers.borrow_mut();
            let state = containers.entry(name.clone()).or_default();
            state.generation += 1;
            state.generation
        };

        let size = self.wait_for_size(&name).await?;
        let rows = load_rows(&request.source, &self.fetcher).await?;
        self.check_generation(&name, generation)?;

        let layout_request = LayoutRequest::new(size)
            .with_font_size_pt(request.font_size_pt)
            .with_column_weights(request.column_weights)
            .with_background(request.background);
        let rendered = crate::render::render_table(
            &rows,
            &request.columns,
            &layout_request,
            &self.config,
            &self.options,
        )?;
        let layout = rendered.layout.clone();

        self.containers
            .borrow_mut()
            .entry(name.clone())
            .or_default()
            .replace(Content::Table(Box::new(TableState {
                rows,
                columns: request.columns,
                request: layout_request,
                rendered,
            })));
        tracing::info!(
            container = %name,
            generation,
            rows = layout.rows,
            cols = layout.cols,
            font_px = layout.font_size_px,
            "table rendered"
        );
        Ok(layout)
    }

    /// Polls the host until both container dimensions exceed the configured minimum.
    ///
    /// After `max_retries` frames the last reported size is used, with the configured fallback
    /// substituted for any zero dimension.
    async fn wait_for_size(&self, name: &str) -> Result<Size> {
        let sizing = &self.config.sizing;
        let mut frames = 0;
        loop {
            let size = self.require_container(name)?;
            if size.width > sizing.min_dimension_px && size.height > sizing.min_dimension_px {
                return Ok(size);
            }
            if frames >= sizing.max_retries {
                let fallback = Size::new(
                    nonzero_or(size.width, sizing.fallback_width),
                    nonzero_or(size.height, sizing.fallback_height),
                );
                tracing::warn!(
                    container = %name,
                    frames,
                    width = fallback.width,
                    height = fallback.height,
                    "container never reported a usable size; using fallback"
                );
                return Ok(fallback);
            }
            frames += 1;
            self.host.next_frame().await;
        }
    }

    fn check_generation(&self, name: &str, generation: u64) -> Result<()> {
        let latest = self
            .containers
            .borrow()
            .get(name)
            .map_or(generation, |s| s.generation);
        if latest == generation {
            Ok(())
        } else {
            Err(StageError::Superseded {
                name: name.to_string(),
                generation,
                latest,
            })
        }
    }

    fn require_container(&self, name: &str) -> Result<Size> {
        self.host
            .container_size(name)
            .ok_or_else(|| StageError::ContainerNotFound {
                name: name.to_string(),
            })
    }

    /// Adds a highlight overlay. `duration_ms` is how long the overlay stays before fading out;
    /// without it the overlay stays until cleared. Returns the overlay id.
    pub fn highlight(
        &self,
        container: &str,
        target: HighlightTarget,
        color_key: &str,
        duration_ms: Option<f64>,
    ) -> Option<u64> {
        self.try_highlight(container, target, color_key, duration_ms)
            .map_err(|err| {
                tracing::error!(container, ?target, error = %err, "highlight failed");
            })
            .ok()
    }

    /// [`Stage::highlight`] with the loose `(kind, target)` arguments scripts pass, e.g.
    /// `("Cell", [2, 1])`.
    pub fn highlight_kind(
        &self,
        container: &str,
        kind: &str,
        target: &Value,
        color_key: &str,
        duration_ms: Option<f64>,
    ) -> Option<u64> {
        match HighlightTarget::parse(kind, target) {
            Ok(target) => self.highlight(container, target, color_key, duration_ms),
            Err(err) => {
                tracing::error!(container, kind, %target, error = %err, "highlight failed");
                None
            }
        }
    }

    pub fn try_highlight(
        &self,
        container: &str,
        target: HighlightTarget,
        color_key: &str,
        duration_ms: Option<f64>,
    ) -> Result<u64> {
        self.require_container(container)?;
        let mut containers = self.containers.borrow_mut();
        let state = containers
            .get_mut(container)
            .ok_or_else(|| no_table(container))?;

        let rect = match &state.content {
            Content::Table(table) => compute_overlay_rect(&table.rendered.layout, target)?,
            Content::Markup(markup) => {
                compute_overlay_rect(&TableLayout::from_svg(markup)?, target)?
            }
            Content::Empty => return Err(no_table(container)),
        };

        let id = self.next_overlay_id.get();
        self.next_overlay_id.set(id + 1);
        let color = self.palette.resolve(color_key).to_string();
        tracing::debug!(container, id, ?target, color = %color, "highlight added");
        state.overlays.push(Overlay::new(
            id,
            target,
            rect,
            color,
            duration_ms,
            self.host.now_ms(),
        ));
        Ok(id)
    }

    /// Advances every overlay by one animation frame at `now_ms` and drops removed ones.
    pub fn tick(&self, now_ms: f64) {
        let fade_ms = self.config.overlay.fade_ms;
        for (name, state) in self.containers.borrow_mut().iter_mut() {
            for overlay in &mut state.overlays {
                overlay.advance(now_ms, fade_ms);
            }
            let before = state.overlays.len();
            state
                .overlays
                .retain(|o| o.phase() != OverlayPhase::Removed);
            if state.overlays.len() != before {
                tracing::trace!(
                    container = %name,
                    removed = before - state.overlays.len(),
                    "overlays faded out"
                );
            }
        }
    }

    /// [`Stage::tick`] at the host's current time.
    pub fn on_animation_frame(&self) {
        self.tick(self.host.now_ms());
    }

    /// Removes every overlay in the container. Returns how many were removed.
    pub fn clear_highlights(&self, container: &str) -> Option<usize> {
        self.try_clear_highlights(container)
            .map_err(|err| {
                tracing::error!(container, error = %err, "clear_highlights failed");
            })
            .ok()
    }

    pub fn try_clear_highlights(&self, container: &str) -> Result<usize> {
        self.require_container(container)?;
        let mut containers = self.containers.borrow_mut();
        let Some(state) = containers.get_mut(container) else {
            return Ok(0);
        };
        let removed = state.overlays.len();
        state.overlays.clear();
        Ok(removed)
    }

    /// Removes one overlay on the 1-based `row_number`: the oldest row overlay for that row, or
    /// failing that the oldest cell overlay on it.
    pub fn clear_row_highlight(&self, container: &str, row_number: usize) -> bool {
        match self.try_clear_row_highlight(container, row_number) {
            Ok(()) => true,
            Err(err @ StageError::NoRowHighlight { .. }) => {
                tracing::warn!(container, "{err}");
                false
            }
            Err(err) => {
                tracing::error!(container, error = %err, "clear_row_highlight failed");
                false
            }
        }
    }

    pub fn try_clear_row_highlight(&self, container: &str, row_number: usize) -> Result<()> {
        self.require_container(container)?;
        let row = row_number.checked_sub(1).ok_or(StageError::ZeroRowNumber)?;
        let mut containers = self.containers.borrow_mut();
        let overlays = containers
            .get_mut(container)
            .map(|s| &mut s.overlays)
            .ok_or_else(|| no_table(container))?;

        let position = overlays
            .iter()
            .position(|o| o.target == HighlightTarget::Row { row })
            .or_else(|| {
                overlays
                    .iter()
                    .position(|o| matches!(o.target, HighlightTarget::Cell { row: r, .. } if r == row))
            })
            .ok_or_else(|| StageError::NoRowHighlight {
                name: container.to_string(),
                row_number,
            })?;
        let removed = overlays.remove(position);
        tracing::debug!(container, id = removed.id, row_number, "row highlight removed");
        Ok(())
    }

    /// Replaces one raw cell value and re-renders the table at its current size.
    ///
    /// `row` and `col` are 0-based. Overlays are torn down with the old rendering.
    pub fn update_cell(&self, container: &str, row: usize, col: usize, value: Value) -> bool {
        self.try_update_cell(container, row, col, value)
            .map_err(|err| {
                tracing::error!(container, row, col, error = %err, "update_cell failed");
            })
            .is_ok()
    }

    pub fn try_update_cell(
        &self,
        container: &str,
        row: usize,
        col: usize,
        value: Value,
    ) -> Result<()> {
        let current = self.require_container(container)?;
        let mut containers = self.containers.borrow_mut();
        let state = containers
            .get_mut(container)
            .ok_or_else(|| no_table(container))?;
        let Content::Table(table) = &state.content else {
            return Err(no_table(container));
        };

        let rows_len = table.rows.len();
        let cols_len = table.columns.len();
        if row >= rows_len {
            return Err(slidetable_render::Error::RowOutOfRange {
                row,
                rows: rows_len,
            }
            .into());
        }
        let Some(column) = table.columns.get(col) else {
            return Err(slidetable_render::Error::ColumnOutOfRange {
                col,
                cols: cols_len,
            }
            .into());
        };

        let mut rows = table.rows.clone();
        rows[row].insert(column.key.clone(), value);

        let mut request = table.request.clone();
        let min = self.config.sizing.min_dimension_px;
        if current.width > min && current.height > min {
            request.size = current;
        }
        let rendered = crate::render::render_table(
            &rows,
            &table.columns,
            &request,
            &self.config,
            &self.options,
        )?;
        let columns = table.columns.clone();
        state.replace(Content::Table(Box::new(TableState {
            rows,
            columns,
            request,
            rendered,
        })));
        tracing::debug!(container, row, col, "cell updated");
        Ok(())
    }

    /// Places SVG markup in a container, replacing its contents.
    ///
    /// Highlights on such a container read the layout from the markup's `data-*` attributes.
    pub fn insert_svg(&self, container: &str, markup: impl Into<String>) -> bool {
        self.try_insert_svg(container, markup.into())
            .map_err(|err| {
                tracing::warn!(container, error = %err, "insert_svg failed");
            })
            .is_ok()
    }

    pub fn try_insert_svg(&self, container: &str, markup: String) -> Result<()> {
        self.require_container(container)?;
        let mut containers = self.containers.borrow_mut();
        let state = containers.entry(container.to_string()).or_default();
        // A render still in flight must not overwrite inserted markup.
        state.generation += 1;
        state.replace(Content::Markup(markup));
        Ok(())
    }

    /// Fetches SVG markup through the stage's fetcher and inserts it.
    pub async fn insert_svg_from(&self, container: &str, url: &str) -> bool {
        let result: Result<()> = async {
            self.require_container(container)?;
            let markup = self.fetcher.fetch(url).await?;
            self.try_insert_svg(container, markup)
        }
        .await;
        result
            .map_err(|err| {
                tracing::warn!(container, url, error = %err, "insert_svg_from failed");
            })
            .is_ok()
    }

    /// Serialized container contents, with overlays appended inside the root `<svg>`.
    pub fn markup(&self, container: &str) -> Option<String> {
        let containers = self.containers.borrow();
        let state = containers.get(container)?;
        let base = match &state.content {
            Content::Empty => return None,
            Content::Table(table) => table.rendered.svg.as_str(),
            Content::Markup(markup) => markup.as_str(),
        };
        if state.overlays.is_empty() {
            return Some(base.to_string());
        }

        let fade_ms = self.config.overlay.fade_ms;
        let overlays: Vec<String> = state
            .overlays
            .iter()
            .map(|o| overlay_rect_markup(&o.rect, &o.color, fade_ms, o.opacity()))
            .collect();
        let overlays = overlays.join("\n");
        Some(match base.rfind("</svg>") {
            Some(end) => format!("{}{}\n{}", &base[..end], overlays, &base[end..]),
            None => format!("{base}\n{overlays}"),
        })
    }

    /// The layout of the table currently in the container.
    pub fn layout(&self, container: &str) -> Option<TableLayout> {
        match &self.containers.borrow().get(container)?.content {
            Content::Table(table) => Some(table.rendered.layout.clone()),
            Content::Markup(markup) => TableLayout::from_svg(markup).ok(),
            Content::Empty => None,
        }
    }

    /// The formatted strings of the table currently in the container.
    pub fn formatted(&self, container: &str) -> Option<FormattedTable> {
        match &self.containers.borrow().get(container)?.content {
            Content::Table(table) => Some(table.rendered.table.clone()),
            _ => None,
        }
    }

    pub fn overlays(&self, container: &str) -> Vec<Overlay> {
        self.containers
            .borrow()
            .get(container)
            .map(|s| s.overlays.clone())
            .unwrap_or_default()
    }
}

fn no_table(name: &str) -> StageError {
    StageError::NoTable {
        name: name.to_string(),
    }
}

fn nonzero_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}
