//! Recovering table geometry from an emitted document.

use crate::highlight::validate_layout;
use crate::layout::TableLayout;
use crate::{Error, Result};
use roxmltree::Node;

impl TableLayout {
    /// Reads the `data-*` layout attributes off the first `<svg>` element in `markup`.
    ///
    /// Size comes from `width`/`height` when they are plain numbers, otherwise from `viewBox`.
    pub fn from_svg(markup: &str) -> Result<TableLayout> {
        let doc = roxmltree::Document::parse(markup)?;
        let svg = doc
            .descendants()
            .find(|n| n.has_tag_name("svg"))
            .ok_or_else(|| invalid("no <svg> element"))?;

        let (width, height) = match (number_attr(svg, "width"), number_attr(svg, "height")) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => (w, h),
            _ => view_box_size(svg).ok_or_else(|| invalid("no usable size or viewBox"))?,
        };

        let layout = TableLayout {
            width,
            height,
            rows: count_attr(svg, "data-rows")?,
            cols: count_attr(svg, "data-cols")?,
            font_size_px: number_attr(svg, "data-font-size").unwrap_or(0.0),
            row_height: required_number(svg, "data-row-height")?,
            top_rule_y: 0.0,
            header_divider_y: required_number(svg, "data-header-divider-y")?,
            margin_left: number_attr(svg, "data-margin-left").unwrap_or(0.0),
            margin_right: number_attr(svg, "data-margin-right").unwrap_or(0.0),
            col_start_x: list_attr(svg, "data-col-start-x")?,
            col_end_x: list_attr(svg, "data-col-end-x")?,
        };
        validate_layout(&layout)?;
        Ok(layout)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidMetadata {
        message: message.into(),
    }
}

fn number_attr(node: Node<'_, '_>, name: &str) -> Option<f64> {
    let raw = node.attribute(name)?.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw);
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn required_number(node: Node<'_, '_>, name: &str) -> Result<f64> {
    number_attr(node, name).ok_or_else(|| invalid(format!("missing or non-numeric {name}")))
}

fn count_attr(node: Node<'_, '_>, name: &str) -> Result<usize> {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .ok_or_else(|| invalid(format!("missing or non-integer {name}")))
}

fn list_attr(node: Node<'_, '_>, name: &str) -> Result<Vec<f64>> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| invalid(format!("missing {name}")))?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| invalid(format!("{name} has non-numeric entry `{s}`")))
        })
        .collect()
}

fn view_box_size(node: Node<'_, '_>) -> Option<(f64, f64)> {
    let parts: Vec<f64> = node
        .attribute("viewBox")?
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}
