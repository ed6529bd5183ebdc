use slidetable::render::raster::{RasterError, RasterOptions, svg_to_png};
use slidetable::render::{
    DeterministicTextMeasurer, GlyphEstimateTextMeasurer, HighlightTarget, LayoutOptions,
    LayoutRequest, RenderedTable, Size, TextMeasurer, compute_overlay_rect, render_overlay_svg,
    render_table,
};
use slidetable::{ColumnSpec, Palette, RenderConfig, TableSpecRegistry, parse_rows};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Table(slidetable::Error),
    Render(slidetable::render::Error),
    Json(serde_json::Error),
    Raster(RasterError),
    UnknownColor { name: String, known: Vec<String> },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Table(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::UnknownColor { name, known } => write!(
                f,
                "Unknown color `{name}`. Valid colors are: {}",
                known.join(", ")
            ),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<slidetable::Error> for CliError {
    fn from(value: slidetable::Error) -> Self {
        Self::Table(value)
    }
}

impl From<slidetable::render::Error> for CliError {
    fn from(value: slidetable::render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Command {
    #[default]
    Render,
    Layout,
}

#[derive(Debug, Clone, Copy, Default)]
enum TextMeasurerKind {
    Deterministic,
    #[default]
    Glyph,
}

#[derive(Debug, Clone)]
struct Highlight {
    target: HighlightTarget,
    color: String,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    cols: Option<Vec<String>>,
    headers: Option<Vec<String>>,
    formats: Option<Vec<String>>,
    justify: Option<Vec<String>>,
    column_weights: Option<Vec<f64>>,
    font_size_pt: Option<f64>,
    width: f64,
    height: f64,
    background: bool,
    config: Option<String>,
    spec: Option<String>,
    table: Option<String>,
    highlights: Vec<Highlight>,
    out_dir: Option<String>,
    png: bool,
    scale: f32,
    pretty: bool,
    text_measurer: TextMeasurerKind,
}

fn usage() -> &'static str {
    "slidetable\n\
\n\
USAGE:\n\
  slidetable [render] [OPTIONS] <json>\n\
  slidetable layout [--pretty] [OPTIONS] <json>\n\
\n\
OPTIONS:\n\
  --cols <a,b,..>            column keys (default: keys of the first row)\n\
  --headers <A,B,..>         header labels (default: column keys)\n\
  --format <Text,Dollar2,..> value formats (default: Text)\n\
  --justify <L,R,..>         justification codes (default: L)\n\
  --colwidths <1,2,..>       relative column widths\n\
  --fontsize <pt>            requested font size in pt\n\
  --size <w> <h>             container size in px (default: 800 500)\n\
  --bg-oxford                paint the background color behind the table\n\
  --config <path>            render configuration (.json/.yaml)\n\
  --spec <path> --table <n>  take columns from a named table spec\n\
  --row-highlight <i> <color>\n\
  --col-highlight <i> <color>\n\
  --cell-highlight <r> <c> <color>\n\
  --out-dir <dir>            output directory (default: <json dir>/svg)\n\
  --png [--scale <n>]        also rasterize every written SVG\n\
  --text-measurer glyph|deterministic\n\
\n\
NOTES:\n\
  - Highlight indices are zero-based data rows/columns; the header is not a row.\n\
  - Existing files are never overwritten; `_v2`, `_v3`, ... is appended instead.\n\
  - Set SLIDETABLE_LOG (e.g. `debug`) to see layout diagnostics on stderr.\n"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, CliError> {
    text.trim().parse::<T>().map_err(|_| CliError::Usage(usage()))
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(|s| s.trim().to_string()).collect()
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        width: 800.0,
        height: 500.0,
        scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "layout" => args.command = Command::Layout,
            "--pretty" => args.pretty = true,
            "--bg-oxford" => args.background = true,
            "--png" => args.png = true,
            "--cols" => args.cols = Some(split_list(next_value(&mut it)?)),
            "--headers" => args.headers = Some(split_list(next_value(&mut it)?)),
            "--format" => args.formats = Some(split_list(next_value(&mut it)?)),
            "--justify" => args.justify = Some(split_list(next_value(&mut it)?)),
            "--colwidths" => {
                let weights = split_list(next_value(&mut it)?)
                    .iter()
                    .map(|w| parse_num::<f64>(w))
                    .collect::<Result<Vec<_>, _>>()?;
                args.column_weights = Some(weights);
            }
            "--fontsize" => {
                let pt = parse_num::<f64>(next_value(&mut it)?)?;
                if !(pt.is_finite() && pt > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.font_size_pt = Some(pt);
            }
            "--size" => {
                args.width = parse_num::<f64>(next_value(&mut it)?)?;
                args.height = parse_num::<f64>(next_value(&mut it)?)?;
                if !(args.width > 0.0 && args.height > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--scale" => {
                args.scale = parse_num::<f32>(next_value(&mut it)?)?;
                if !(args.scale.is_finite() && args.scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--spec" => args.spec = Some(next_value(&mut it)?.clone()),
            "--table" => args.table = Some(next_value(&mut it)?.clone()),
            "--out-dir" => args.out_dir = Some(next_value(&mut it)?.clone()),
            "--row-highlight" => {
                let row = parse_num::<usize>(next_value(&mut it)?)?;
                let color = next_value(&mut it)?.clone();
                args.highlights.push(Highlight {
                    target: HighlightTarget::Row { row },
                    color,
                });
            }
            "--col-highlight" => {
                let col = parse_num::<usize>(next_value(&mut it)?)?;
                let color = next_value(&mut it)?.clone();
                args.highlights.push(Highlight {
                    target: HighlightTarget::Column { col },
                    color,
                });
            }
            "--cell-highlight" => {
                let row = parse_num::<usize>(next_value(&mut it)?)?;
                let col = parse_num::<usize>(next_value(&mut it)?)?;
                let color = next_value(&mut it)?.clone();
                args.highlights.push(Highlight {
                    target: HighlightTarget::Cell { row, col },
                    color,
                });
            }
            "--text-measurer" => {
                args.text_measurer = match next_value(&mut it)?.as_str() {
                    "deterministic" => TextMeasurerKind::Deterministic,
                    "glyph" => TextMeasurerKind::Glyph,
                    _ => return Err(CliError::Usage(usage())),
                };
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            other => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(other.to_string());
            }
        }
    }

    if args.input.is_none() || args.spec.is_some() != args.table.is_some() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn build_text_measurer(kind: TextMeasurerKind) -> Arc<dyn TextMeasurer + Send + Sync> {
    match kind {
        TextMeasurerKind::Deterministic => Arc::new(DeterministicTextMeasurer::default()),
        TextMeasurerKind::Glyph => Arc::new(GlyphEstimateTextMeasurer::default()),
    }
}

/// Columns and request-level settings, either from a named table spec or from the list flags.
fn resolve_table(
    args: &Args,
    rows: &[slidetable::Row],
) -> Result<(Vec<ColumnSpec>, LayoutRequest), CliError> {
    let mut request = LayoutRequest::new(Size::new(args.width, args.height))
        .with_font_size_pt(args.font_size_pt)
        .with_column_weights(args.column_weights.clone())
        .with_background(args.background);

    if let (Some(spec_path), Some(name)) = (&args.spec, &args.table) {
        let registry = TableSpecRegistry::from_path(spec_path)?;
        let spec = registry.get(name)?;
        request = request
            .with_font_size_pt(args.font_size_pt.or(spec.font_size_pt))
            .with_column_weights(
                args.column_weights
                    .clone()
                    .or_else(|| spec.column_weights.clone()),
            )
            .with_background(args.background || spec.background);
        return Ok((spec.columns.clone(), request));
    }

    let keys = match &args.cols {
        Some(cols) => cols.clone(),
        None => ColumnSpec::infer_from_rows(rows)?
            .into_iter()
            .map(|c| c.key)
            .collect(),
    };
    let formats = args
        .formats
        .clone()
        .unwrap_or_else(|| vec!["Text".to_string(); keys.len()]);
    let columns = ColumnSpec::from_parallel(
        &keys,
        &formats,
        args.headers.as_deref(),
        args.justify.as_deref(),
    )?;
    Ok((columns, request))
}

/// Returns `path` if it is free, else the first free `<stem>_vN<ext>` for N = 2, 3, ...
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 2u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}_v{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// File-name fragment for a color argument: letters and digits only.
fn color_slug(name: &str) -> String {
    let slug: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if slug.is_empty() {
        "color".to_string()
    } else {
        slug
    }
}

fn overlay_file_name(stem: &str, highlight: &Highlight) -> String {
    let color = color_slug(&highlight.color);
    match highlight.target {
        HighlightTarget::Row { row } => format!("{stem}_row_{row}_{color}.svg"),
        HighlightTarget::Column { col } => format!("{stem}_col_{col}_{color}.svg"),
        HighlightTarget::Cell { row, col } => format!("{stem}_cell_{row}_{col}_{color}.svg"),
    }
}

/// Unknown names are an error here; an empty name means the fallback highlight color.
fn resolve_color(palette: &Palette, name: &str) -> Result<String, CliError> {
    if name.trim().is_empty() {
        return Ok(palette.fallback().to_string());
    }
    palette
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| CliError::UnknownColor {
            name: name.to_string(),
            known: palette.keys().map(str::to_string).collect(),
        })
}

fn write_svg(path: &Path, svg: &str, args: &Args) -> Result<PathBuf, CliError> {
    let path = unique_path(path);
    std::fs::write(&path, svg)?;
    if args.png {
        let png = svg_to_png(
            svg,
            &RasterOptions {
                scale: args.scale,
                background: None,
            },
        )?;
        let png_path = unique_path(&path.with_extension("png"));
        std::fs::write(&png_path, png)?;
        tracing::debug!(path = %png_path.display(), "wrote png");
    }
    Ok(path)
}

fn write_outputs(
    args: &Args,
    input: &Path,
    rendered: &RenderedTable,
    config: &RenderConfig,
) -> Result<(), CliError> {
    let out_dir = match &args.out_dir {
        Some(dir) => PathBuf::from(dir),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join("svg"),
    };
    std::fs::create_dir_all(&out_dir)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());

    let palette = config.palette();
    // Validate every highlight before writing anything.
    let mut overlays = Vec::with_capacity(args.highlights.len());
    for highlight in &args.highlights {
        let color = resolve_color(&palette, &highlight.color)?;
        let rect = compute_overlay_rect(&rendered.layout, highlight.target)?;
        overlays.push((highlight, color, rect));
    }

    let base = write_svg(&out_dir.join(format!("{stem}.svg")), &rendered.svg, args)?;
    println!("Base table saved to: {}", base.display());

    for (highlight, color, rect) in overlays {
        let svg = render_overlay_svg(
            &rendered.layout,
            &rect,
            &color,
            config.overlay.standalone_opacity,
        );
        let path = write_svg(&out_dir.join(overlay_file_name(&stem, highlight)), &svg, args)?;
        let what = match highlight.target {
            HighlightTarget::Row { .. } => "Row",
            HighlightTarget::Column { .. } => "Column",
            HighlightTarget::Cell { .. } => "Cell",
        };
        println!("{what} highlight saved to: {}", path.display());
    }
    Ok(())
}

fn write_json(value: &impl serde::Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let Some(input) = args.input.as_deref().map(PathBuf::from) else {
        return Err(CliError::Usage(usage()));
    };

    let config = match &args.config {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };
    let text = std::fs::read_to_string(&input)?;
    let rows = parse_rows(&text)?;
    let (columns, request) = resolve_table(&args, &rows)?;

    let options = LayoutOptions {
        text_measurer: build_text_measurer(args.text_measurer),
        ..Default::default()
    };
    let rendered = render_table(&rows, &columns, &request, &config, &options)?;
    tracing::info!(
        rows = rendered.layout.rows,
        cols = rendered.layout.cols,
        font_size_px = rendered.layout.font_size_px,
        "table laid out"
    );

    match args.command {
        Command::Layout => write_json(&rendered.layout, args.pretty),
        Command::Render => write_outputs(&args, &input, &rendered, &config),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SLIDETABLE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
