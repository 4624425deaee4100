use thiserror::Error;

pub type EnrichResult<T> = std::result::Result<T, EnrichError>;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("malformed record at {path}: {reason}")]
    MalformedInput { path: String, reason: String },

    #[error("malformed generation response for {kind}: {reason}")]
    MalformedResponse { kind: String, reason: String },

    #[error("generation failed for {kind}: {reason}")]
    Generation { kind: String, reason: String },

    #[error("no record stored for section {0:02}")]
    UnknownSection(u32),

    #[error("persistence failed for {key}: {reason}")]
    Persistence { key: String, reason: String },
}

impl EnrichError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(key: &str, err: &anyhow::Error) -> Self {
        Self::Persistence {
            key: key.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed-input",
            Self::MalformedResponse { .. } => "malformed-generation-response",
            Self::Generation { .. } => "generation-failure",
            Self::UnknownSection(_) => "unknown-section",
            Self::Persistence { .. } => "persistence-failure",
        }
    }
}
