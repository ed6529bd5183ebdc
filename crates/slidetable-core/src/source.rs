use crate::model::Row;
use crate::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;

/// Where a table's rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSource {
    Inline(Vec<Row>),
    /// A path or URL to a JSON array of flat objects.
    Url(String),
}

impl From<Vec<Row>> for RowSource {
    fn from(rows: Vec<Row>) -> Self {
        Self::Inline(rows)
    }
}

impl From<&str> for RowSource {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for RowSource {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

/// Retrieves the text behind a data URL.
///
/// Implementations decide which schemes they serve; the returned future is awaited on the caller's
/// event loop.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>>;
}

/// Serves plain paths and `file://` URLs from the local filesystem.
///
/// Relative paths resolve against `base_dir`. Network schemes are rejected.
#[derive(Debug, Clone, Default)]
pub struct FsFetcher {
    pub base_dir: Option<PathBuf>,
}

impl FsFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let path = match url::Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "file" => {
                parsed.to_file_path().map_err(|_| Error::Fetch {
                    url: url.to_string(),
                    message: "not a valid file URL".to_string(),
                })?
            }
            // One-letter "schemes" are Windows drive prefixes.
            Ok(parsed) if parsed.scheme().len() > 1 => {
                return Err(Error::UnsupportedScheme {
                    scheme: parsed.scheme().to_string(),
                    url: url.to_string(),
                });
            }
            _ => PathBuf::from(url),
        };
        Ok(match (&self.base_dir, path.is_relative()) {
            (Some(base), true) => base.join(path),
            _ => path,
        })
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> {
        let resolved = self.resolve(url);
        let url = url.to_string();
        async move {
            let path = resolved?;
            std::fs::read_to_string(&path).map_err(|err| Error::Fetch {
                url,
                message: err.to_string(),
            })
        }
    }
}

/// Parses a JSON document into rows. The document must be a non-empty array of objects.
pub fn parse_rows(text: &str) -> Result<Vec<Row>> {
    let value: Value = serde_json::from_str(text)?;
    rows_from_value(value)
}

pub fn rows_from_value(value: Value) -> Result<Vec<Row>> {
    let Value::Array(items) = value else {
        return Err(Error::MalformedRows {
            message: "top-level value is not an array".to_string(),
        });
    };
    if items.is_empty() {
        return Err(Error::EmptyRows);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(Error::MalformedRows {
                message: format!("item {i} is {} rather than an object", json_kind(&other)),
            }),
        })
        .collect()
}

/// Resolves a [`RowSource`] to rows, fetching when needed.
pub async fn load_rows<F: Fetcher>(source: &RowSource, fetcher: &F) -> Result<Vec<Row>> {
    match source {
        RowSource::Inline(rows) => {
            if rows.is_empty() {
                return Err(Error::EmptyRows);
            }
            Ok(rows.clone())
        }
        RowSource::Url(url) => {
            let text = fetcher.fetch(url).await?;
            let rows = parse_rows(&text)?;
            tracing::debug!(url = %url, rows = rows.len(), "fetched table rows");
            Ok(rows)
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
