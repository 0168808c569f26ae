use std::path::PathBuf;

/// Errors raised while loading, editing or saving a project archive.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("{what} not found: '{name}'.")]
    NotFound { what: &'static str, name: String },

    #[error("{what} named '{name}' already exists in target '{target}'.")]
    DuplicateName {
        what: &'static str,
        name: String,
        target: String,
    },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Block '{block}' already has next block '{next}'; detach it first.")]
    Chain { block: String, next: String },

    #[error("Project is not open: {0}")]
    State(String),

    #[error("Invalid archive '{}': {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, ProjectError>;

impl ProjectError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(what: &'static str, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DuplicateName {
            what,
            name: name.into(),
            target: target.into(),
        }
    }
}

/// Fails with a `Validation` error unless `lower <= value <= upper`.
pub fn check_range(field: &str, value: f64, lower: f64, upper: f64) -> Result<()> {
    if !value.is_finite() || value < lower || value > upper {
        return Err(ProjectError::validation(
            field,
            format!("{} is out of range, expected {} to {} inclusive.", value, lower, upper),
        ));
    }
    Ok(())
}
