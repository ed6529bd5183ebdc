use crate::text::{TextMeasurer, TextStyle};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use slidetable_core::{CellFormatter, ColumnSpec, Justify, RenderConfig, Row, cell};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Header labels and cell display strings.
///
/// Formatting happens once per render; measurement and emission both read the same strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub headers: Vec<String>,
    pub justify: Vec<Justify>,
    /// `cells[row][col]`; an empty string means the cell is left blank.
    pub cells: Vec<Vec<String>>,
}

impl FormattedTable {
    pub fn new(rows: &[Row], columns: &[ColumnSpec], formatter: &dyn CellFormatter) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::NoColumns);
        }
        if rows.is_empty() {
            return Err(Error::EmptyRows);
        }
        let cells = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| formatter.format(cell(row, &col.key), col.format))
                    .collect()
            })
            .collect();
        Ok(Self {
            headers: columns.iter().map(|c| c.label().to_string()).collect(),
            justify: columns.iter().map(|c| c.justify).collect(),
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRequest {
    pub size: Size,
    /// Requested body font size in pt; `None` uses the configured default.
    pub font_size_pt: Option<f64>,
    /// Relative column widths, normalized to the table width. Ignored unless there is one
    /// positive-sum weight per column.
    pub column_weights: Option<Vec<f64>>,
    pub background: bool,
}

impl LayoutRequest {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            font_size_pt: None,
            column_weights: None,
            background: false,
        }
    }

    pub fn with_font_size_pt(mut self, pt: Option<f64>) -> Self {
        self.font_size_pt = pt;
        self
    }

    pub fn with_column_weights(mut self, weights: Option<Vec<f64>>) -> Self {
        self.column_weights = weights;
        self
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }
}

/// Solved table geometry, in px relative to the SVG viewport.
///
/// Everything a highlight needs is also written onto the root `<svg>` element, so a layout can be
/// recovered from an emitted document with [`TableLayout::from_svg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    pub width: f64,
    pub height: f64,
    pub rows: usize,
    pub cols: usize,
    pub font_size_px: f64,
    pub row_height: f64,
    pub top_rule_y: f64,
    pub header_divider_y: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub col_start_x: Vec<f64>,
    pub col_end_x: Vec<f64>,
}

impl TableLayout {
    pub fn table_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn header_center_y(&self) -> f64 {
        (self.top_rule_y + self.header_divider_y) / 2.0
    }

    /// Top edge of data row `row` (0-based).
    pub fn row_top(&self, row: usize) -> f64 {
        self.header_divider_y + row as f64 * self.row_height
    }

    pub fn row_center_y(&self, row: usize) -> f64 {
        self.row_top(row) + self.row_height / 2.0
    }

    /// Y of the rule under the last row.
    pub fn table_bottom(&self) -> f64 {
        self.row_top(self.rows)
    }

    /// Anchor x for text in column `col`: inset by `inset` for left/right, centered otherwise.
    pub fn text_x(&self, col: usize, justify: Justify, inset: f64) -> f64 {
        let start = self.col_start_x[col];
        let end = self.col_end_x[col];
        match justify {
            Justify::Left => start + inset,
            Justify::Center => (start + end) / 2.0,
            Justify::Right => end - inset,
        }
    }
}

/// Picks the font size and column boundaries for `table` inside `request.size`.
///
/// The font never exceeds the requested size. It shrinks until every column's widest string plus
/// padding fits across the table width, then again until the header band plus all rows fit the
/// height, but not below `min_font_px`. Columns are finally scaled to span the table width exactly.
pub fn solve_layout(
    table: &FormattedTable,
    request: &LayoutRequest,
    config: &RenderConfig,
    measurer: &dyn TextMeasurer,
) -> Result<TableLayout> {
    let rows = table.rows();
    let cols = table.cols();
    if cols == 0 {
        return Err(Error::NoColumns);
    }
    if rows == 0 {
        return Err(Error::EmptyRows);
    }

    let Size { width, height } = request.size;
    let table_width = (width - config.margin_left - config.margin_right).max(0.0);
    let pad = 2.0 * config.cell_padding_px;
    let requested = config.font_px(request.font_size_pt);
    let floor = config.min_font_px.min(requested);
    let clamp = |font: f64| {
        if font.is_finite() {
            font.min(requested).max(floor)
        } else {
            floor
        }
    };
    let weights = request
        .column_weights
        .as_deref()
        .and_then(|w| normalized_weights(w, cols));

    let mut font = requested;
    let text = measure_columns(table, font, config, measurer);
    match &weights {
        None => {
            let total_text: f64 = text.iter().sum();
            let total = total_text + pad * cols as f64;
            if total > table_width && total_text > 0.0 {
                let avail = (table_width - pad * cols as f64).max(0.0);
                font = clamp(font * avail / total_text);
            }
        }
        Some(w) => {
            for (t, share) in text.iter().zip(w) {
                let avail = (share * table_width - pad).max(0.0);
                if *t > avail {
                    font = font.min(requested * avail / t);
                }
            }
            font = clamp(font);
        }
    }

    let needed = (rows + 1) as f64 * font * config.line_height_factor;
    if needed > height {
        font = clamp(font * height.max(0.0) / needed);
    }
    let row_height = font * config.line_height_factor;

    let widths: Vec<f64> = match &weights {
        Some(w) => w.iter().map(|share| share * table_width).collect(),
        None => {
            let content: Vec<f64> = measure_columns(table, font, config, measurer)
                .into_iter()
                .map(|t| t + pad)
                .collect();
            let sum: f64 = content.iter().sum();
            if sum > 0.0 {
                content.iter().map(|c| c * table_width / sum).collect()
            } else {
                vec![table_width / cols as f64; cols]
            }
        }
    };

    let mut col_start_x = Vec::with_capacity(cols);
    let mut col_end_x = Vec::with_capacity(cols);
    let mut x = config.margin_left;
    for w in &widths {
        col_start_x.push(x);
        x += w;
        col_end_x.push(x);
    }
    if let Some(last) = col_end_x.last_mut() {
        *last = config.margin_left + table_width;
    }

    tracing::trace!(requested, font, row_height, table_width, "solved table layout");

    Ok(TableLayout {
        width,
        height,
        rows,
        cols,
        font_size_px: font,
        row_height,
        top_rule_y: 0.0,
        header_divider_y: row_height,
        margin_left: config.margin_left,
        margin_right: config.margin_right,
        col_start_x,
        col_end_x,
    })
}

/// Widest header or cell string per column at `font_px`.
fn measure_columns(
    table: &FormattedTable,
    font_px: f64,
    config: &RenderConfig,
    measurer: &dyn TextMeasurer,
) -> Vec<f64> {
    let header_style = TextStyle {
        font_family: Some(config.font_family.clone()),
        font_size: font_px,
        font_weight: Some(config.header_font_weight),
    };
    let cell_style = TextStyle {
        font_weight: Some(config.cell_font_weight),
        ..header_style.clone()
    };

    let mut widths: Vec<f64> = table
        .headers
        .iter()
        .map(|h| measurer.width(h, &header_style))
        .collect();
    for row in &table.cells {
        for (w, text) in widths.iter_mut().zip(row) {
            if text.is_empty() {
                continue;
            }
            *w = w.max(measurer.width(text, &cell_style));
        }
    }
    widths
}

fn normalized_weights(weights: &[f64], cols: usize) -> Option<Vec<f64>> {
    if weights.len() != cols {
        tracing::warn!(
            weights = weights.len(),
            cols,
            "ignoring column weights: expected one per column"
        );
        return None;
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        tracing::warn!("ignoring column weights: negative or non-finite entry");
        return None;
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        tracing::warn!("ignoring column weights: they sum to zero");
        return None;
    }
    Some(weights.iter().map(|w| w / sum).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DeterministicTextMeasurer;
    use serde_json::json;
    use slidetable_core::{FormatKind, StandardFormatter};

    fn rows(v: serde_json::Value) -> Vec<Row> {
        slidetable_core::source::rows_from_value(v).unwrap()
    }

    fn quotes() -> FormattedTable {
        let rows = rows(json!([
            {"Symbol": "ABC", "Last": 101.5},
            {"Symbol": "LONGERNAME", "Last": 2.25},
        ]));
        let cols = vec![
            ColumnSpec::new("Symbol"),
            ColumnSpec::new("Last")
                .with_format(FormatKind::Dollar2)
                .with_justify(Justify::Right),
        ];
        FormattedTable::new(&rows, &cols, &StandardFormatter).unwrap()
    }

    fn solve(table: &FormattedTable, request: &LayoutRequest) -> TableLayout {
        solve_layout(
            table,
            request,
            &RenderConfig::default(),
            &DeterministicTextMeasurer::default(),
        )
        .unwrap()
    }

    #[test]
    fn formatted_table_skips_nothing_but_blanks_missing_cells() {
        let rows = rows(json!([{"A": 1}, {"B": 2}]));
        let cols = vec![ColumnSpec::new("A"), ColumnSpec::new("B")];
        let t = FormattedTable::new(&rows, &cols, &StandardFormatter).unwrap();
        assert_eq!(t.cells, vec![vec!["1", ""], vec!["", "2"]]);
        assert_eq!(t.headers, vec!["A", "B"]);
    }

    #[test]
    fn roomy_container_keeps_requested_font_and_stretches_columns() {
        let layout = solve(&quotes(), &LayoutRequest::new(Size::new(800.0, 400.0)));
        let requested = RenderConfig::default().font_px(None);
        assert_eq!(layout.font_size_px, requested);
        assert_eq!(layout.header_divider_y, layout.row_height);
        assert_eq!(layout.col_start_x[0], 0.0);
        assert_eq!(*layout.col_end_x.last().unwrap(), 800.0);
        assert_eq!(layout.col_end_x[0], layout.col_start_x[1]);
    }

    #[test]
    fn narrow_container_shrinks_font_to_fit_width() {
        let table = quotes();
        let layout = solve(&table, &LayoutRequest::new(Size::new(120.0, 400.0)));
        let requested = RenderConfig::default().font_px(None);
        assert!(layout.font_size_px < requested);

        // Widest strings plus padding now fit across the table.
        let m = DeterministicTextMeasurer::default();
        let needed: f64 = ["LONGERNAME", "$101.50"]
            .iter()
            .map(|s| {
                m.width(
                    s,
                    &TextStyle {
                        font_size: layout.font_size_px,
                        ..Default::default()
                    },
                ) + 10.0
            })
            .sum();
        assert!(needed <= 120.0 + 1e-6);
    }

    #[test]
    fn short_container_shrinks_font_and_rows_to_fit_height() {
        let layout = solve(&quotes(), &LayoutRequest::new(Size::new(800.0, 30.0)));
        assert!(layout.font_size_px < RenderConfig::default().font_px(None));
        assert!(layout.table_bottom() <= 30.0 + 1e-9);
        assert_eq!(layout.row_height, layout.font_size_px * 1.5);
    }

    #[test]
    fn font_never_drops_below_floor_and_columns_still_span_width() {
        let layout = solve(&quotes(), &LayoutRequest::new(Size::new(20.0, 5.0)));
        assert_eq!(layout.font_size_px, 6.0);
        assert_eq!(*layout.col_end_x.last().unwrap(), 20.0);
        for (s, e) in layout.col_start_x.iter().zip(&layout.col_end_x) {
            assert!(e >= s);
        }
    }

    #[test]
    fn requested_font_below_floor_is_not_enlarged() {
        let layout = solve(
            &quotes(),
            &LayoutRequest::new(Size::new(800.0, 400.0)).with_font_size_pt(Some(3.0)),
        );
        assert!((layout.font_size_px - 3.0 * 1.333).abs() < 1e-9);
    }

    #[test]
    fn column_weights_fix_boundaries() {
        let layout = solve(
            &quotes(),
            &LayoutRequest::new(Size::new(400.0, 400.0)).with_column_weights(Some(vec![3.0, 1.0])),
        );
        assert_eq!(layout.col_start_x, vec![0.0, 300.0]);
        assert_eq!(layout.col_end_x, vec![300.0, 400.0]);
    }

    #[test]
    fn mismatched_weights_are_ignored() {
        let plain = solve(&quotes(), &LayoutRequest::new(Size::new(400.0, 400.0)));
        let weighted = solve(
            &quotes(),
            &LayoutRequest::new(Size::new(400.0, 400.0)).with_column_weights(Some(vec![1.0])),
        );
        assert_eq!(plain, weighted);
    }

    #[test]
    fn margins_offset_columns() {
        let config = RenderConfig {
            margin_left: 10.0,
            margin_right: 30.0,
            ..Default::default()
        };
        let layout = solve_layout(
            &quotes(),
            &LayoutRequest::new(Size::new(400.0, 400.0)),
            &config,
            &DeterministicTextMeasurer::default(),
        )
        .unwrap();
        assert_eq!(layout.col_start_x[0], 10.0);
        assert_eq!(*layout.col_end_x.last().unwrap(), 370.0);
        assert_eq!(layout.table_width(), 360.0);
    }

    #[test]
    fn empty_tables_are_rejected() {
        let cols = vec![ColumnSpec::new("A")];
        let err = FormattedTable::new(&[], &cols, &StandardFormatter).unwrap_err();
        assert!(matches!(err, Error::EmptyRows));

        let rows = rows(json!([{"A": 1}]));
        let err = FormattedTable::new(&rows, &[], &StandardFormatter).unwrap_err();
        assert!(matches!(err, Error::NoColumns));
    }
}
