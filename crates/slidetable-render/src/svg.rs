use crate::highlight::OverlayRect;
use crate::layout::{FormattedTable, TableLayout};
use slidetable_core::RenderConfig;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SvgRenderOptions {
    /// Paint a full-bleed background rect first.
    pub background: bool,
}

/// Emits the table document.
///
/// Output is a pure function of its inputs. Parts are newline-separated, in paint order: optional
/// background, style block, top rule, header labels, header divider, row rules, cell text.
pub fn render_table_svg(
    table: &FormattedTable,
    layout: &TableLayout,
    config: &RenderConfig,
    options: &SvgRenderOptions,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(8 + layout.rows * (layout.cols + 1));
    let w = fmt(layout.width);
    let h = fmt(layout.height);

    let mut root = String::new();
    let _ = write!(
        &mut root,
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" data-rows="{}" data-cols="{}" data-header-divider-y="{}" data-row-height="{}" data-margin-left="{}" data-margin-right="{}" data-col-start-x="{}" data-col-end-x="{}" data-font-size="{}">"#,
        layout.rows,
        layout.cols,
        fmt(layout.header_divider_y),
        fmt(layout.row_height),
        fmt(layout.margin_left),
        fmt(layout.margin_right),
        fmt_list(&layout.col_start_x),
        fmt_list(&layout.col_end_x),
        fmt(layout.font_size_px),
    );
    parts.push(root);

    if options.background {
        parts.push(format!(
            r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}" />"#,
            escape_xml(&config.background_color)
        ));
    }

    parts.push(style_block(layout, config));

    let x1 = fmt(layout.margin_left);
    let x2 = fmt(layout.width - layout.margin_right);
    let rule = |y: f64, color: &str, stroke: f64| {
        format!(
            r#"<line x1="{x1}" y1="{}" x2="{x2}" y2="{}" stroke="{}" stroke-width="{}" />"#,
            fmt(y),
            fmt(y),
            escape_xml(color),
            fmt(stroke)
        )
    };

    parts.push(rule(
        layout.top_rule_y,
        config.primary_rule_color.as_str(),
        config.top_stroke_px,
    ));

    let inset = config.cell_padding_px;
    let header_y = fmt(layout.header_center_y());
    for (col, label) in table.headers.iter().enumerate() {
        let justify = table.justify[col];
        parts.push(format!(
            r#"<text x="{}" y="{header_y}" class="tbl-header" text-anchor="{}">{}</text>"#,
            fmt(layout.text_x(col, justify, inset)),
            justify.text_anchor(),
            escape_xml(label)
        ));
    }

    parts.push(rule(
        layout.header_divider_y,
        config.secondary_rule_color.as_str(),
        config.row_stroke_px,
    ));
    for i in 1..=layout.rows {
        let color = if i == layout.rows {
            config.primary_rule_color.as_str()
        } else {
            config.secondary_rule_color.as_str()
        };
        parts.push(rule(layout.row_top(i), color, config.row_stroke_px));
    }

    for (r, row) in table.cells.iter().enumerate() {
        let y = fmt(layout.row_center_y(r));
        for (col, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let justify = table.justify[col];
            parts.push(format!(
                r#"<text x="{}" y="{y}" class="tbl-cell" text-anchor="{}">{}</text>"#,
                fmt(layout.text_x(col, justify, inset)),
                justify.text_anchor(),
                escape_xml(text)
            ));
        }
    }

    parts.push("</svg>".to_string());
    parts.join("\n")
}

fn style_block(layout: &TableLayout, config: &RenderConfig) -> String {
    let font_size = fmt(layout.font_size_px);
    let family = escape_text(&config.font_family);
    let fill = escape_text(&config.text_color);
    let mut out = String::from("<style>\n");
    for (class, weight) in [
        ("tbl-header", config.header_font_weight),
        ("tbl-cell", config.cell_font_weight),
    ] {
        let _ = writeln!(
            &mut out,
            "  .{class} {{ font-family: {family}; font-size: {font_size}px; font-weight: {weight}; fill: {fill}; dominant-baseline: middle; }}"
        );
    }
    out.push_str("</style>");
    out
}

/// Markup for an overlay rect appended to a live table document.
///
/// The rect starts transparent with an opacity transition; the stage flips `opacity` to fade it
/// in and out.
pub fn overlay_rect_markup(rect: &OverlayRect, color: &str, fade_ms: f64, opacity: f64) -> String {
    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" fill-opacity="1" data-svg-highlight="1""#,
        fmt(rect.x),
        fmt(rect.y),
        fmt(rect.width),
        fmt(rect.height),
        escape_xml(color),
    );
    if let Some(row) = rect.row {
        let _ = write!(&mut out, r#" data-row="{row}""#);
    }
    if let Some(col) = rect.col {
        let _ = write!(&mut out, r#" data-col="{col}""#);
    }
    let _ = write!(
        &mut out,
        r#" style="pointer-events: none; opacity: {}; transition: opacity {}ms ease;" />"#,
        fmt(opacity),
        fmt(fade_ms)
    );
    out
}

/// A standalone SVG holding a single semi-transparent overlay, sized like the table it covers.
///
/// Used for offline output where the rect is composited over the table image by the slide tool.
pub fn render_overlay_svg(
    layout: &TableLayout,
    rect: &OverlayRect,
    color: &str,
    opacity: f64,
) -> String {
    let w = fmt(layout.width);
    let h = fmt(layout.height);
    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"#
    );
    let _ = writeln!(
        &mut out,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" fill-opacity="{}" />"#,
        fmt(rect.x),
        fmt(rect.y),
        fmt(rect.width),
        fmt(rect.height),
        escape_xml(color),
        fmt(opacity),
    );
    out.push_str("</svg>");
    out
}

pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

fn fmt_list(values: &[f64]) -> String {
    values.iter().map(|v| fmt(*v)).collect::<Vec<_>>().join(",")
}

/// Escapes the five XML-reserved characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// Element content only; quotes stay literal so CSS font names survive.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
