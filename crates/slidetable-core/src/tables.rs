//! Named table definitions.
//!
//! Slides refer to a table layout by name (`IOF`, `Cal`, ...) instead of repeating the column
//! list in every script. A registry file maps names to [`TableSpec`]s:
//!
//! ```yaml
//! IOF:
//!   font_size_pt: 12
//!   columns:
//!     - { key: Ticker }
//!     - { key: BasePrice, header: Base Price, format: Dollar2, justify: R }
//! ```

use crate::config::load_structured;
use crate::model::ColumnSpec;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub font_size_pt: Option<f64>,
    #[serde(default)]
    pub background: bool,
    /// Relative column widths; ignored unless there is one per column.
    #[serde(default)]
    pub column_weights: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSpecRegistry {
    specs: IndexMap<String, TableSpec>,
}

impl TableSpecRegistry {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let registry: Self = load_structured(path.as_ref())?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let registry: Self = serde_yaml::from_str(text)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: TableSpec) {
        self.specs.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&TableSpec> {
        self.specs.get(name).ok_or_else(|| Error::UnknownTableSpec {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    fn validate(&self) -> Result<()> {
        for (name, spec) in &self.specs {
            if spec.columns.is_empty() {
                return Err(Error::InvalidConfig {
                    message: format!("table spec `{name}` has no columns"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormatKind, Justify};

    #[test]
    fn yaml_registry_parses_columns_with_defaults() {
        let reg = TableSpecRegistry::from_yaml_str(
            r#"
IOF:
  font_size_pt: 12
  columns:
    - { key: Ticker }
    - { key: BasePrice, header: Base Price, format: dollar2, justify: R }
"#,
        )
        .unwrap();

        let spec = reg.get("IOF").unwrap();
        assert_eq!(spec.font_size_pt, Some(12.0));
        assert!(!spec.background);
        assert_eq!(spec.columns[0].format, FormatKind::Text);
        assert_eq!(spec.columns[0].justify, Justify::Left);
        assert_eq!(spec.columns[0].label(), "Ticker");
        assert_eq!(spec.columns[1].format, FormatKind::Dollar2);
        assert_eq!(spec.columns[1].justify, Justify::Right);
        assert_eq!(spec.columns[1].label(), "Base Price");
    }

    #[test]
    fn unknown_names_and_empty_specs_are_errors() {
        let reg = TableSpecRegistry::default();
        assert!(matches!(
            reg.get("Cal"),
            Err(Error::UnknownTableSpec { .. })
        ));

        let err = TableSpecRegistry::from_yaml_str("Cal:\n  columns: []\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
