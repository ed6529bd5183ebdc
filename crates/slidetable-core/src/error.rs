pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("column keys must be a non-empty list")]
    NoColumns,

    #[error("{what} has {actual} entries but there are {expected} columns")]
    ColumnArityMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("row data must be a JSON array of objects: {message}")]
    MalformedRows { message: String },

    #[error("no data rows")]
    EmptyRows,

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("unsupported data URL scheme `{scheme}` in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    #[error("unknown table spec `{name}`")]
    UnknownTableSpec { name: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
