use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<u16>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 16.0,
            font_weight: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// Measures rendered text. Implementations must be pure: the same text and style always yield
/// the same metrics, so widths taken for headers and cells are comparable.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    fn width(&self, text: &str, style: &TextStyle) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        self.measure(text, style).width
    }
}

/// Every glyph is `char_width_factor` em wide.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let font_size = style.font_size.max(0.0);
        let chars = text.chars().count();
        TextMetrics {
            width: chars as f64 * font_size * char_width_factor,
            height: font_size * line_height_factor,
        }
    }
}

/// Per-glyph advance estimates for a proportional sans-serif face.
///
/// Close enough to browser canvas measurements of Montserrat/Arial-like fonts for column sizing;
/// bold text (weight >= 600) is widened slightly.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphEstimateTextMeasurer;

impl GlyphEstimateTextMeasurer {
    pub fn char_width_em(ch: char) -> f64 {
        if ch == ' ' {
            return 0.33;
        }
        if ch == '\t' {
            return 0.66;
        }
        if ch == '_' || ch == '-' {
            return 0.33;
        }
        if matches!(ch, '.' | ',' | ':' | ';') {
            return 0.28;
        }
        if matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | '/') {
            return 0.33;
        }
        if matches!(ch, '+' | '*' | '=' | '\\' | '^' | '|' | '~') {
            return 0.45;
        }
        if matches!(ch, '$' | '%' | '#') {
            return ch_money_width(ch);
        }
        if ch.is_ascii_digit() {
            return 0.56;
        }
        if ch.is_ascii_uppercase() {
            return match ch {
                'I' => 0.30,
                'M' | 'W' => 0.85,
                _ => 0.64,
            };
        }
        if ch.is_ascii_lowercase() {
            return match ch {
                'i' | 'l' | 'j' => 0.26,
                'f' | 't' | 'r' => 0.36,
                'm' | 'w' => 0.82,
                _ => 0.55,
            };
        }
        0.60
    }
}

fn ch_money_width(ch: char) -> f64 {
    match ch {
        '%' => 0.78,
        _ => 0.58,
    }
}

impl TextMeasurer for GlyphEstimateTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let font_size = style.font_size.max(0.0);
        let em: f64 = text.chars().map(Self::char_width_em).sum();
        let bold = style.font_weight.is_some_and(|w| w >= 600);
        let weight_factor = if bold { 1.06 } else { 1.0 };
        TextMetrics {
            width: em * font_size * weight_factor,
            height: font_size * 1.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(size: f64) -> TextStyle {
        TextStyle {
            font_size: size,
            ..Default::default()
        }
    }

    #[test]
    fn deterministic_width_is_linear_in_chars_and_size() {
        let m = DeterministicTextMeasurer::default();
        assert_eq!(m.width("abcd", &style(10.0)), 24.0);
        assert_eq!(m.width("abcd", &style(20.0)), 48.0);
        assert_eq!(m.width("", &style(20.0)), 0.0);
    }

    #[test]
    fn glyph_estimates_are_proportional() {
        let m = GlyphEstimateTextMeasurer;
        let narrow = m.width("iiii", &style(16.0));
        let wide = m.width("WWWW", &style(16.0));
        assert!(narrow < wide);
        assert!((m.width("12", &style(10.0)) - 11.2).abs() < 1e-9);
    }

    #[test]
    fn bold_text_is_wider() {
        let m = GlyphEstimateTextMeasurer;
        let regular = m.width("Price", &style(16.0));
        let bold = m.width(
            "Price",
            &TextStyle {
                font_weight: Some(700),
                ..style(16.0)
            },
        );
        assert!(bold > regular);
    }
}
