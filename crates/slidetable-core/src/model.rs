use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One data row: column key → raw value. Key order is the JSON source order.
pub type Row = Map<String, Value>;

/// Per-column value-to-string conversion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatKind {
    #[default]
    Text,
    Dollar0,
    Dollar2,
    Dollar4,
    Perc0,
    Perc2,
    Perc4,
    Dec0,
    Dec2,
    Dec4,
    SpecialDate,
}

impl FormatKind {
    /// Parses a format name case-insensitively (spaces ignored). Unknown names map to `Text`.
    pub fn parse_lenient(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "dollar0" => Self::Dollar0,
            "dollar2" => Self::Dollar2,
            "dollar4" => Self::Dollar4,
            "perc0" => Self::Perc0,
            "perc2" => Self::Perc2,
            "perc4" => Self::Perc4,
            "dec0" => Self::Dec0,
            "dec2" => Self::Dec2,
            "dec4" => Self::Dec4,
            "specialdate" => Self::SpecialDate,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Dollar0 => "Dollar0",
            Self::Dollar2 => "Dollar2",
            Self::Dollar4 => "Dollar4",
            Self::Perc0 => "Perc0",
            Self::Perc2 => "Perc2",
            Self::Perc4 => "Perc4",
            Self::Dec0 => "Dec0",
            Self::Dec2 => "Dec2",
            Self::Dec4 => "Dec4",
            Self::SpecialDate => "SpecialDate",
        }
    }

    /// Fraction digits for the numeric kinds.
    pub fn decimals(self) -> Option<usize> {
        match self {
            Self::Dollar0 | Self::Perc0 | Self::Dec0 => Some(0),
            Self::Dollar2 | Self::Perc2 | Self::Dec2 => Some(2),
            Self::Dollar4 | Self::Perc4 | Self::Dec4 => Some(4),
            Self::Text | Self::SpecialDate => None,
        }
    }
}

impl From<String> for FormatKind {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<FormatKind> for String {
    fn from(value: FormatKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal placement of text within its column band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

impl Justify {
    /// Accepts `L`/`C`/`R` codes or the full words, case-insensitively. Anything else is `Left`.
    pub fn parse_lenient(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "C" | "CENTER" | "CENTRE" | "MIDDLE" => Self::Center,
            "R" | "RIGHT" | "END" => Self::Right,
            _ => Self::Left,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Center => "C",
            Self::Right => "R",
        }
    }

    /// SVG `text-anchor` value.
    pub fn text_anchor(self) -> &'static str {
        match self {
            Self::Left => "start",
            Self::Center => "middle",
            Self::Right => "end",
        }
    }
}

impl From<String> for Justify {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<Justify> for String {
    fn from(value: Justify) -> Self {
        value.code().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub key: String,
    #[serde(default)]
    pub format: FormatKind,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub justify: Justify,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            format: FormatKind::Text,
            header: None,
            justify: Justify::Left,
        }
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    /// Header label; defaults to the column key.
    pub fn label(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.key)
    }

    /// Builds column specs from the parallel arrays used by slide scripts.
    ///
    /// `formats` must match `keys` in length; `headers` and `justify` are optional but, when
    /// present, must match as well.
    pub fn from_parallel<K, F, H, J>(
        keys: &[K],
        formats: &[F],
        headers: Option<&[H]>,
        justify: Option<&[J]>,
    ) -> Result<Vec<ColumnSpec>>
    where
        K: AsRef<str>,
        F: AsRef<str>,
        H: AsRef<str>,
        J: AsRef<str>,
    {
        if keys.is_empty() {
            return Err(Error::NoColumns);
        }
        let expected = keys.len();
        if formats.len() != expected {
            return Err(Error::ColumnArityMismatch {
                what: "format list",
                expected,
                actual: formats.len(),
            });
        }
        if let Some(headers) = headers {
            if headers.len() != expected {
                return Err(Error::ColumnArityMismatch {
                    what: "header list",
                    expected,
                    actual: headers.len(),
                });
            }
        }
        if let Some(justify) = justify {
            if justify.len() != expected {
                return Err(Error::ColumnArityMismatch {
                    what: "justification list",
                    expected,
                    actual: justify.len(),
                });
            }
        }

        Ok(keys
            .iter()
            .enumerate()
            .map(|(i, key)| ColumnSpec {
                key: key.as_ref().to_string(),
                format: FormatKind::parse_lenient(formats[i].as_ref()),
                header: headers.map(|h| h[i].as_ref().to_string()),
                justify: justify
                    .map(|j| Justify::parse_lenient(j[i].as_ref()))
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Plain-text columns for every key of the first row, in source order.
    pub fn infer_from_rows(rows: &[Row]) -> Result<Vec<ColumnSpec>> {
        let first = rows.first().ok_or(Error::EmptyRows)?;
        if first.is_empty() {
            return Err(Error::NoColumns);
        }
        Ok(first.keys().map(ColumnSpec::new).collect())
    }
}

/// A raw cell lookup that treats a missing key the same as JSON `null`.
pub fn cell<'a>(row: &'a Row, key: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    row.get(key).unwrap_or(&NULL)
}
