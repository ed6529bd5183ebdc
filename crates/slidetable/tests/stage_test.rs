use futures::executor::block_on;
use serde_json::{Value, json};
use slidetable::render::{DeterministicTextMeasurer, HighlightTarget, LayoutOptions, Size};
use slidetable::{
    ColumnSpec, Fetcher, FormatKind, FsFetcher, Host, Justify, OverlayPhase, Row, RowSource,
    Stage, TableRequest,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Containers with fixed sizes; each frame advances the clock by 16 ms.
#[derive(Default)]
struct FakeHost {
    sizes: RefCell<HashMap<String, Size>>,
    /// Sizes read as 0x0 until this many frames have passed.
    hidden_frames: Cell<u32>,
    frames: Cell<u32>,
    now: Cell<f64>,
}

impl FakeHost {
    fn with_container(name: &str, width: f64, height: f64) -> Self {
        let host = Self::default();
        host.sizes
            .borrow_mut()
            .insert(name.to_string(), Size::new(width, height));
        host
    }
}

impl Host for FakeHost {
    fn container_size(&self, name: &str) -> Option<Size> {
        let size = *self.sizes.borrow().get(name)?;
        if self.frames.get() < self.hidden_frames.get() {
            return Some(Size::new(0.0, 0.0));
        }
        Some(size)
    }

    fn next_frame(&self) -> impl Future<Output = ()> {
        self.frames.set(self.frames.get() + 1);
        self.now.set(self.now.get() + 16.0);
        std::future::ready(())
    }

    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Serves canned JSON; URLs starting with `slow/` yield once before resolving.
#[derive(Default)]
struct MapFetcher {
    docs: HashMap<String, String>,
}

struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = slidetable::Result<String>> {
        let doc = self.docs.get(url).cloned();
        let slow = url.starts_with("slow/");
        let url = url.to_string();
        async move {
            if slow {
                YieldOnce(false).await;
            }
            doc.ok_or(slidetable::Error::Fetch {
                url,
                message: "404".to_string(),
            })
        }
    }
}

fn quote_rows() -> Vec<Row> {
    slidetable::source::rows_from_value(json!([
        {"Ticker": "ABC", "Price": 101.5},
        {"Ticker": "DEF", "Price": 7},
        {"Ticker": "GHI", "Price": null},
    ]))
    .expect("rows")
}

fn quote_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Ticker"),
        ColumnSpec::new("Price")
            .with_format(FormatKind::Dollar2)
            .with_justify(Justify::Right),
    ]
}

fn stage_with<F: Fetcher>(host: FakeHost, fetcher: F) -> Stage<FakeHost, F> {
    Stage::new(host, fetcher).with_layout_options(LayoutOptions {
        text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        ..Default::default()
    })
}

fn quotes_stage() -> Stage<FakeHost, FsFetcher> {
    let stage = stage_with(
        FakeHost::with_container("rect1", 600.0, 300.0),
        FsFetcher::default(),
    );
    block_on(stage.render_table(TableRequest::new("rect1", quote_rows(), quote_columns())))
        .expect("rendered");
    stage
}

fn overlay_count(markup: &str) -> usize {
    markup.matches(r#"data-svg-highlight="1""#).count()
}

#[test]
fn render_table_fills_the_container() {
    let stage = quotes_stage();
    let layout = stage.layout("rect1").expect("layout");
    assert_eq!((layout.width, layout.height), (600.0, 300.0));
    assert_eq!((layout.rows, layout.cols), (3, 2));

    let markup = stage.markup("rect1").expect("markup");
    let doc = roxmltree::Document::parse(&markup).expect("well-formed svg");
    let price = doc
        .descendants()
        .find(|n| n.text() == Some("$101.50"))
        .expect("price cell");
    assert_eq!(price.attribute("text-anchor"), Some("end"));
    let ticker = doc
        .descendants()
        .find(|n| n.text() == Some("ABC"))
        .expect("ticker cell");
    assert_eq!(ticker.attribute("text-anchor"), Some("start"));
}

#[test]
fn parallel_lists_build_the_same_table() {
    let stage = stage_with(
        FakeHost::with_container("rect1", 600.0, 300.0),
        FsFetcher::default(),
    );
    let request = TableRequest::from_parallel(
        "rect1",
        quote_rows(),
        &["Ticker", "Price"],
        &["Text", "Dollar2"],
        Some(&["Ticker", "Price"][..]),
        Some(&["L", "R"][..]),
    )
    .expect("request");
    let labels: Vec<_> = request.columns.iter().map(|c| c.label()).collect();
    assert_eq!(labels, vec!["Ticker", "Price"]);
    assert_eq!(request.columns[1].format, FormatKind::Dollar2);
    assert_eq!(request.columns[1].justify, Justify::Right);
    assert!(block_on(stage.render_table(request)).is_some());
}

#[test]
fn mismatched_lists_are_rejected_before_rendering() {
    let err = TableRequest::from_parallel(
        "rect1",
        quote_rows(),
        &["Ticker", "Price"],
        &["Text"],
        None::<&[&str]>,
        None::<&[&str]>,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        slidetable::StageError::Core(slidetable::Error::ColumnArityMismatch { .. })
    ));
}

#[test]
fn missing_container_is_a_logged_no_op() {
    let stage = quotes_stage();
    let request = TableRequest::new("nope", quote_rows(), quote_columns());
    assert!(block_on(stage.render_table(request)).is_none());
    assert!(stage.markup("nope").is_none());
    assert!(
        stage
            .highlight("nope", HighlightTarget::Row { row: 0 }, "Robin", None)
            .is_none()
    );
}

#[test]
fn empty_rows_leave_previous_contents_untouched() {
    let stage = quotes_stage();
    let before = stage.markup("rect1").expect("markup");
    let request = TableRequest::new("rect1", RowSource::Inline(Vec::new()), quote_columns());
    assert!(block_on(stage.render_table(request)).is_none());
    assert_eq!(stage.markup("rect1").expect("markup"), before);
}

#[test]
fn size_polling_waits_for_a_usable_size() {
    let host = FakeHost::with_container("rect1", 500.0, 250.0);
    host.hidden_frames.set(3);
    let stage = stage_with(host, FsFetcher::default());
    let layout = block_on(stage.render_table(TableRequest::new(
        "rect1",
        quote_rows(),
        quote_columns(),
    )))
    .expect("rendered");
    assert_eq!(stage.host().frames.get(), 3);
    assert_eq!((layout.width, layout.height), (500.0, 250.0));
}

#[test]
fn size_polling_falls_back_after_retries() {
    let host = FakeHost::with_container("rect1", 500.0, 250.0);
    host.hidden_frames.set(u32::MAX);
    let stage = stage_with(host, FsFetcher::default());
    let layout = block_on(stage.render_table(TableRequest::new(
        "rect1",
        quote_rows(),
        quote_columns(),
    )))
    .expect("rendered");
    assert_eq!(stage.host().frames.get(), 30);
    assert_eq!((layout.width, layout.height), (800.0, 400.0));
}

#[test]
fn rows_can_be_fetched_from_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("quotes.json"),
        r#"[{"Ticker":"ABC","Price":101.5}]"#,
    )
    .expect("write");
    let stage = stage_with(
        FakeHost::with_container("rect1", 600.0, 300.0),
        FsFetcher::new(dir.path()),
    );
    let layout = block_on(stage.render_table(TableRequest::new(
        "rect1",
        "quotes.json",
        quote_columns(),
    )))
    .expect("rendered");
    assert_eq!(layout.rows, 1);

    let missing = TableRequest::new("rect1", "missing.json", quote_columns());
    assert!(block_on(stage.render_table(missing)).is_none());
    assert_eq!(stage.layout("rect1").expect("layout").rows, 1);
}

#[test]
fn stale_render_completion_is_dropped() {
    let mut fetcher = MapFetcher::default();
    fetcher.docs.insert(
        "slow/three.json".to_string(),
        r#"[{"A":1},{"A":2},{"A":3}]"#.to_string(),
    );
    fetcher
        .docs
        .insert("fast/one.json".to_string(), r#"[{"A":9}]"#.to_string());
    let stage = stage_with(FakeHost::with_container("rect1", 400.0, 200.0), fetcher);

    let columns = vec![ColumnSpec::new("A")];
    let older = stage.render_table(TableRequest::new(
        "rect1",
        "slow/three.json",
        columns.clone(),
    ));
    let newer = stage.render_table(TableRequest::new("rect1", "fast/one.json", columns));
    let (older, newer) = block_on(async { futures::join!(older, newer) });

    assert!(older.is_none(), "superseded render must not apply");
    assert_eq!(newer.expect("newer render").rows, 1);
    assert_eq!(stage.layout("rect1").expect("layout").rows, 1);
}

#[test]
fn highlight_fades_in_holds_and_is_removed() {
    let stage = quotes_stage();
    let id = stage
        .highlight("rect1", HighlightTarget::Row { row: 1 }, "Robin", Some(1000.0))
        .expect("overlay");

    let overlays = stage.overlays("rect1");
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].id, id);
    assert_eq!(overlays[0].phase(), OverlayPhase::Created);
    assert_eq!(overlays[0].color, "rgb(52,192,206)");

    let markup = stage.markup("rect1").expect("markup");
    assert_eq!(overlay_count(&markup), 1);
    assert!(markup.contains("opacity: 0;"));
    assert!(markup.contains("transition: opacity 400ms ease"));
    assert!(markup.trim_end().ends_with("</svg>"));
    roxmltree::Document::parse(&markup).expect("overlay keeps markup well-formed");

    let t0 = stage.overlays("rect1")[0].created_ms();
    stage.tick(t0 + 16.0);
    assert_eq!(stage.overlays("rect1")[0].phase(), OverlayPhase::Visible);
    assert!(stage.markup("rect1").expect("markup").contains("opacity: 1;"));

    stage.tick(t0 + 1000.0);
    assert_eq!(stage.overlays("rect1")[0].phase(), OverlayPhase::Fading);

    stage.tick(t0 + 1400.0);
    assert!(stage.overlays("rect1").is_empty());
    assert_eq!(overlay_count(&stage.markup("rect1").expect("markup")), 0);
}

#[test]
fn unknown_color_keys_use_the_fallback() {
    let stage = quotes_stage();
    stage
        .highlight("rect1", HighlightTarget::Column { col: 0 }, "Mauve", None)
        .expect("overlay");
    assert_eq!(stage.overlays("rect1")[0].color, "rgba(221,232,185,0.5)");
}

#[test]
fn out_of_range_highlight_changes_nothing() {
    let stage = quotes_stage();
    let before = stage.markup("rect1").expect("markup");
    assert!(
        stage
            .highlight("rect1", HighlightTarget::Row { row: 3 }, "Robin", None)
            .is_none()
    );
    assert!(
        stage
            .highlight_kind("rect1", "Cell", &json!([0, 2]), "Robin", None)
            .is_none()
    );
    assert!(
        stage
            .highlight_kind("rect1", "Diagonal", &Value::Null, "Robin", None)
            .is_none()
    );
    assert_eq!(stage.markup("rect1").expect("markup"), before);
}

#[test]
fn highlight_kind_accepts_script_arguments() {
    let stage = quotes_stage();
    stage
        .highlight_kind("rect1", "Cell", &json!([2, 1]), "Tea", None)
        .expect("cell overlay");
    let o = &stage.overlays("rect1")[0];
    let layout = stage.layout("rect1").expect("layout");
    assert_eq!(o.target, HighlightTarget::Cell { row: 2, col: 1 });
    assert_eq!(o.rect.x, layout.col_start_x[1]);
    assert_eq!(o.rect.y, layout.row_top(2));
}

#[test]
fn clear_highlights_removes_every_overlay_and_nothing_else() {
    let stage = quotes_stage();
    let bare = stage.markup("rect1").expect("markup");
    for row in 0..3 {
        stage.highlight("rect1", HighlightTarget::Row { row }, "Robin", None);
    }
    stage.highlight("rect1", HighlightTarget::Column { col: 1 }, "Tea", None);
    assert_eq!(overlay_count(&stage.markup("rect1").expect("markup")), 4);

    assert_eq!(stage.clear_highlights("rect1"), Some(4));
    assert_eq!(stage.markup("rect1").expect("markup"), bare);
    assert_eq!(stage.clear_highlights("nope"), None);
}

#[test]
fn clear_row_highlight_uses_logical_rows() {
    let stage = quotes_stage();
    // Added out of row order, with a column and a cell overlay mixed in.
    stage.highlight("rect1", HighlightTarget::Row { row: 2 }, "Robin", None);
    stage.highlight("rect1", HighlightTarget::Column { col: 0 }, "Tea", None);
    stage.highlight("rect1", HighlightTarget::Cell { row: 0, col: 1 }, "Tea", None);
    stage.highlight("rect1", HighlightTarget::Row { row: 0 }, "Robin", None);

    // Row number 1 is row index 0: the row overlay goes first, then the cell overlay.
    assert!(stage.clear_row_highlight("rect1", 1));
    let targets: Vec<_> = stage.overlays("rect1").iter().map(|o| o.target).collect();
    assert_eq!(
        targets,
        vec![
            HighlightTarget::Row { row: 2 },
            HighlightTarget::Column { col: 0 },
            HighlightTarget::Cell { row: 0, col: 1 },
        ]
    );

    assert!(stage.clear_row_highlight("rect1", 1));
    assert!(stage.clear_row_highlight("rect1", 3));
    assert_eq!(stage.overlays("rect1").len(), 1);

    assert!(!stage.clear_row_highlight("rect1", 2));
    assert!(!stage.clear_row_highlight("rect1", 0));
    assert_eq!(stage.overlays("rect1").len(), 1);
}

#[test]
fn update_cell_rerenders_with_the_new_value() {
    let stage = quotes_stage();
    stage.highlight("rect1", HighlightTarget::Row { row: 0 }, "Robin", None);

    assert!(stage.update_cell("rect1", 2, 1, json!(55.25)));
    let table = stage.formatted("rect1").expect("table");
    assert_eq!(table.cells[2][1], "$55.25");
    assert!(stage.overlays("rect1").is_empty());

    assert!(!stage.update_cell("rect1", 3, 0, json!("X")));
    assert!(!stage.update_cell("rect1", 0, 2, json!("X")));
    assert_eq!(stage.formatted("rect1").expect("table").cells[0][0], "ABC");
}

#[test]
fn inserted_svg_supports_highlights_from_its_metadata() {
    let source = quotes_stage();
    let svg = source.markup("rect1").expect("markup");

    let stage = stage_with(
        FakeHost::with_container("shape", 600.0, 300.0),
        FsFetcher::default(),
    );
    assert!(stage.insert_svg("shape", svg));
    stage
        .highlight("shape", HighlightTarget::Row { row: 1 }, "Robin", None)
        .expect("overlay");
    let expected = source.layout("rect1").expect("layout");
    let rect = stage.overlays("shape")[0].rect;
    assert!((rect.y - expected.row_top(1)).abs() < 1e-6);

    assert!(stage.insert_svg("shape", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>"));
    assert!(stage.overlays("shape").is_empty());
    assert!(
        stage
            .highlight("shape", HighlightTarget::Row { row: 0 }, "Robin", None)
            .is_none()
    );
}

#[test]
fn insert_svg_from_reads_through_the_fetcher() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("logo.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"/>"#,
    )
    .expect("write");
    let stage = stage_with(
        FakeHost::with_container("shape", 100.0, 100.0),
        FsFetcher::new(dir.path()),
    );
    assert!(block_on(stage.insert_svg_from("shape", "logo.svg")));
    assert!(
        stage
            .markup("shape")
            .expect("markup")
            .contains(r#"width="4""#)
    );
    assert!(!block_on(stage.insert_svg_from("shape", "https://example.com/x.svg")));
}
