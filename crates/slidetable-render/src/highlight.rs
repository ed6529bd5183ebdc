use crate::layout::TableLayout;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an overlay covers. Indices are 0-based and count data rows only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HighlightTarget {
    Row { row: usize },
    #[serde(alias = "col")]
    Column { col: usize },
    Cell { row: usize, col: usize },
}

impl HighlightTarget {
    /// Parses the loose `(kind, target)` pair that slide scripts pass: `Row`/`Col`/`Column` take a
    /// number, `Cell` takes `[row, col]`. Kinds are case-insensitive.
    pub fn parse(kind: &str, target: &Value) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "row" => Ok(Self::Row {
                row: index(target, "row")?,
            }),
            "col" | "column" => Ok(Self::Column {
                col: index(target, "column")?,
            }),
            "cell" => match target.as_array().map(Vec::as_slice) {
                Some([r, c]) => Ok(Self::Cell {
                    row: index(r, "row")?,
                    col: index(c, "column")?,
                }),
                _ => Err(Error::InvalidTarget {
                    message: "a cell target must be [row, col]".to_string(),
                }),
            },
            other => Err(Error::InvalidTarget {
                message: format!("kind must be Row, Col or Cell (got `{other}`)"),
            }),
        }
    }

    pub fn row(self) -> Option<usize> {
        match self {
            Self::Row { row } | Self::Cell { row, .. } => Some(row),
            Self::Column { .. } => None,
        }
    }

    pub fn col(self) -> Option<usize> {
        match self {
            Self::Column { col } | Self::Cell { col, .. } => Some(col),
            Self::Row { .. } => None,
        }
    }
}

fn index(v: &Value, what: &str) -> Result<usize> {
    if let Some(i) = v.as_u64() {
        return usize::try_from(i).map_err(|_| Error::InvalidTarget {
            message: format!("{what} index {i} is too large"),
        });
    }
    // Scripts often pass whole-valued floats or numeric strings.
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match f {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < usize::MAX as f64 => Ok(f as usize),
        _ => Err(Error::InvalidTarget {
            message: format!("{what} index must be a non-negative integer (got {v})"),
        }),
    }
}

/// Overlay rectangle in table coordinates, tagged with the logical row/column it covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub row: Option<usize>,
    pub col: Option<usize>,
}

/// Geometry for `target`: a row spans every column, a column spans every data row (never the
/// header band), a cell is one row by one column.
pub fn compute_overlay_rect(layout: &TableLayout, target: HighlightTarget) -> Result<OverlayRect> {
    validate_layout(layout)?;
    if let Some(row) = target.row().filter(|r| *r >= layout.rows) {
        return Err(Error::RowOutOfRange {
            row,
            rows: layout.rows,
        });
    }
    if let Some(col) = target.col().filter(|c| *c >= layout.cols) {
        return Err(Error::ColumnOutOfRange {
            col,
            cols: layout.cols,
        });
    }

    let (x, width) = match target.col() {
        Some(col) => (
            layout.col_start_x[col],
            layout.col_end_x[col] - layout.col_start_x[col],
        ),
        None => (
            layout.col_start_x[0],
            layout.col_end_x[layout.cols - 1] - layout.col_start_x[0],
        ),
    };
    let (y, height) = match target.row() {
        Some(row) => (layout.row_top(row), layout.row_height),
        None => (
            layout.header_divider_y,
            layout.row_height * layout.rows as f64,
        ),
    };

    Ok(OverlayRect {
        x,
        y,
        width,
        height,
        row: target.row(),
        col: target.col(),
    })
}

pub(crate) fn validate_layout(layout: &TableLayout) -> Result<()> {
    let message = if layout.rows == 0 || layout.cols == 0 {
        "table has no rows or columns"
    } else if !(layout.row_height.is_finite() && layout.row_height > 0.0) {
        "row height must be positive"
    } else if layout.col_start_x.len() != layout.cols || layout.col_end_x.len() != layout.cols {
        "column boundary lists do not match the column count"
    } else {
        return Ok(());
    };
    Err(Error::InvalidMetadata {
        message: message.to_string(),
    })
}
