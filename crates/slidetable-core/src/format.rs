//! Cell value formatting.
//!
//! The numeric kinds follow the en-US conventions slide authors expect (`$1,234.50`,
//! `12.50%`, `1,234.5000`). Values that cannot be read as numbers are shown verbatim.

use crate::model::FormatKind;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Turns a raw cell value into display text for a column's format kind.
///
/// An empty string means "no glyph": renderers skip the cell entirely.
pub trait CellFormatter {
    fn format(&self, value: &Value, kind: FormatKind) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormatter;

impl CellFormatter for StandardFormatter {
    fn format(&self, value: &Value, kind: FormatKind) -> String {
        format_value(value, kind)
    }
}

pub fn format_value(value: &Value, kind: FormatKind) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(fmt_plain_number).unwrap_or_default(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        return String::new();
    }

    match kind {
        FormatKind::Text => text,
        FormatKind::SpecialDate => special_date(&text),
        FormatKind::Dollar0 | FormatKind::Dollar2 | FormatKind::Dollar4 => {
            let Some(num) = to_number(value) else {
                return text;
            };
            let decimals = kind.decimals().unwrap_or(2);
            let body = group_thousands(&fixed(num.abs(), decimals));
            if is_negative_display(num, decimals) {
                format!("-${body}")
            } else {
                format!("${body}")
            }
        }
        FormatKind::Perc0 | FormatKind::Perc2 | FormatKind::Perc4 => {
            let Some(num) = to_number(value) else {
                return text;
            };
            let decimals = kind.decimals().unwrap_or(2);
            let scaled = num * 100.0;
            let body = fixed(scaled.abs(), decimals);
            if is_negative_display(scaled, decimals) {
                format!("-{body}%")
            } else {
                format!("{body}%")
            }
        }
        FormatKind::Dec0 | FormatKind::Dec2 | FormatKind::Dec4 => {
            let Some(num) = to_number(value) else {
                return text;
            };
            let decimals = kind.decimals().unwrap_or(2);
            let body = group_thousands(&fixed(num.abs(), decimals));
            if is_negative_display(num, decimals) {
                format!("-{body}")
            } else {
                body
            }
        }
    }
}

/// Reads numbers and numeric strings; `$`, `,` and `%` are ignored in strings.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '%'))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

fn fixed(v: f64, decimals: usize) -> String {
    format!("{v:.decimals$}")
}

// `-0.00` is shown as `0.00`.
fn is_negative_display(v: f64, decimals: usize) -> bool {
    v < 0.0 && fixed(v.abs(), decimals).chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn group_thousands(fixed: &str) -> String {
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed, None),
    };
    let digits = int_part.as_bytes();
    let mut out = String::with_capacity(fixed.len() + digits.len() / 3);
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*d as char);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Shortest decimal form, without a trailing `.0` on integral values.
fn fmt_plain_number(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        let s = format!("{}", v as i64);
        return if s == "-0" { "0".to_string() } else { s };
    }
    v.to_string()
}

fn special_date(text: &str) -> String {
    if !text.contains('/') {
        return text.to_string();
    }
    let token = text.split_whitespace().next().unwrap_or(text);
    let Some(date) = parse_slash_date(token) else {
        return text.to_string();
    };
    let day = date.day();
    let suffix = match day {
        1 | 21 | 31 => "st",
        2 | 22 => "nd",
        3 | 23 => "rd",
        _ => "th",
    };
    format!("{} {day}{suffix}", date.format("%b"))
}

fn parse_slash_date(token: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split('/').collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    let (year, month, day) = if a.len() == 4 {
        (a.parse::<i32>().ok()?, b.parse::<u32>().ok()?, c.parse::<u32>().ok()?)
    } else {
        let mut year = c.parse::<i32>().ok()?;
        if c.len() <= 2 {
            year += 2000;
        }
        (year, a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
