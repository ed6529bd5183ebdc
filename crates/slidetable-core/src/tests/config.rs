use crate::*;
use std::io::Write as _;

#[test]
fn defaults_match_slide_style() {
    let cfg = RenderConfig::default();
    assert_eq!(cfg.pt_to_px, 1.333);
    assert_eq!(cfg.line_height_factor, 1.5);
    assert_eq!(cfg.sizing.max_retries, 30);
    assert_eq!(cfg.overlay.fade_ms, 400.0);
    assert!((cfg.font_px(None) - 14.0 * 1.333).abs() < 1e-9);
    assert!((cfg.font_px(Some(10.0)) - 13.33).abs() < 1e-9);
    assert!((cfg.font_px(Some(f64::NAN)) - 14.0 * 1.333).abs() < 1e-9);
}

#[test]
fn partial_yaml_overrides_keep_other_defaults() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "font_family: Arial\nsizing:\n  max_retries: 5\npalette:\n  Mauve: \"#E0B0FF\""
    )
    .unwrap();

    let cfg = RenderConfig::from_path(file.path()).unwrap();
    assert_eq!(cfg.font_family, "Arial");
    assert_eq!(cfg.sizing.max_retries, 5);
    assert_eq!(cfg.sizing.fallback_width, 800.0);
    assert_eq!(cfg.line_height_factor, 1.5);
    assert_eq!(cfg.palette().resolve("Mauve"), "#E0B0FF");
}

#[test]
fn json_config_is_validated() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"pt_to_px": 0}}"#).unwrap();
    let err = RenderConfig::from_path(file.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}
