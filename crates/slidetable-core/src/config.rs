use crate::palette::Palette;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rendering knobs shared by the layout solver, the SVG emitter and the stage runtime.
///
/// Every field has a default, so configuration files only need to list overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub font_family: String,
    pub header_font_weight: u16,
    pub cell_font_weight: u16,
    pub text_color: String,
    /// Top rule and the rule under the last row.
    pub primary_rule_color: String,
    /// Header divider and inner row rules.
    pub secondary_rule_color: String,
    /// Full-bleed fill used when a render asks for a background.
    pub background_color: String,
    pub pt_to_px: f64,
    pub line_height_factor: f64,
    /// The solver never shrinks text below this size.
    pub min_font_px: f64,
    /// Horizontal padding on each side of a cell's text.
    pub cell_padding_px: f64,
    pub top_stroke_px: f64,
    pub row_stroke_px: f64,
    pub default_font_size_pt: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub sizing: SizingConfig,
    pub overlay: OverlayConfig,
    /// Extra palette entries layered over the built-in colors.
    pub palette: IndexMap<String, String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "\"Montserrat\", sans-serif".to_string(),
            header_font_weight: 700,
            cell_font_weight: 400,
            text_color: "rgb(255,255,255)".to_string(),
            primary_rule_color: "rgb(198,62,48)".to_string(),
            secondary_rule_color: "rgb(155,184,193)".to_string(),
            background_color: "rgb(16,29,62)".to_string(),
            pt_to_px: 1.333,
            line_height_factor: 1.5,
            min_font_px: 6.0,
            cell_padding_px: 5.0,
            top_stroke_px: 1.35,
            row_stroke_px: 1.0,
            default_font_size_pt: 14.0,
            margin_left: 0.0,
            margin_right: 0.0,
            sizing: SizingConfig::default(),
            overlay: OverlayConfig::default(),
            palette: IndexMap::new(),
        }
    }
}

/// How long to wait for a container to report a usable on-screen size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Both dimensions must exceed this before the size is accepted.
    pub min_dimension_px: f64,
    /// Animation frames to wait before giving up and using the fallback.
    pub max_retries: u32,
    pub fallback_width: f64,
    pub fallback_height: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            min_dimension_px: 10.0,
            max_retries: 30,
            fallback_width: 800.0,
            fallback_height: 400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Duration of both the fade-in and the fade-out transition.
    pub fade_ms: f64,
    /// `fill-opacity` of overlays written as standalone SVG files.
    pub standalone_opacity: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fade_ms: 400.0,
            standalone_opacity: 0.5,
        }
    }
}

impl RenderConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let cfg: Self = load_structured(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pt_to_px", self.pt_to_px),
            ("line_height_factor", self.line_height_factor),
            ("min_font_px", self.min_font_px),
            ("default_font_size_pt", self.default_font_size_pt),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a positive number (got {v})"),
                });
            }
        }
        let non_negative = [
            ("cell_padding_px", self.cell_padding_px),
            ("margin_left", self.margin_left),
            ("margin_right", self.margin_right),
            ("overlay.fade_ms", self.overlay.fade_ms),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be zero or positive (got {v})"),
                });
            }
        }
        Ok(())
    }

    /// Font size in px for a requested size in pt.
    pub fn font_px(&self, font_size_pt: Option<f64>) -> f64 {
        let pt = font_size_pt
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(self.default_font_size_pt);
        pt * self.pt_to_px
    }

    pub fn palette(&self) -> Palette {
        Palette::with_entries(self.palette.clone())
    }
}

/// Reads a YAML (`.yaml`/`.yml`) or JSON (anything else) file into `T`.
pub fn load_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}
