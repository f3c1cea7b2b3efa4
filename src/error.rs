use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: Box<ReportError>,
    },

    /// Failure reported by a [`Store`](crate::store::Store) backend, such as a
    /// database driver error. The in-memory store never raises it.
    #[error("Store error: {0}")]
    Store(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Activity '{activity}' has total surface {total} but {surface} ha allocated to owners")]
    ZeroTotalSurface {
        activity: String,
        total: f64,
        surface: f64,
    },

    #[error("Activity '{activity}' has invalid surface {surface} ha for owner {owner}")]
    InvalidSurface {
        activity: String,
        owner: i64,
        surface: f64,
    },

    #[error("Valorisation {type_valo} mixes units {first} and {second}")]
    MixedUnits {
        type_valo: String,
        first: String,
        second: String,
    },

    #[error("Invalid season start '{0}': expected MM-DD")]
    InvalidSeasonAnchor(String),

    #[error("Invalid value '{value}' for filter '{filter}'")]
    InvalidFilter { filter: String, value: String },

    #[error("Column '{column}' is not a role column of table '{table}'")]
    UnsupportedRole { table: String, column: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ReportError {
    /// Wraps the error with a description of the call that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        ReportError::Query {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Walks `Query` wrappers down to the originating error.
    pub fn root_cause(&self) -> &ReportError {
        match self {
            ReportError::Query { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// `map_err` shorthand for attaching call context to a fallible store call.
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
