use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InifigError {
    #[error("Unexpected input '{content}' at line {line}")]
    IniParse { line: usize, content: String },

    #[error("Failed to decode input: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid template '{model}': {reason}")]
    Template { model: String, reason: String },

    #[error("Validator '{validator}' in {scope} references unknown field '{field}'")]
    UnknownValidatorField {
        validator: String,
        field: String,
        scope: String,
    },

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Failed to convert config into the requested type: {0}")]
    Convert(#[from] toml::de::Error),

    #[error("Unknown config '{0}'")]
    UnknownConfig(String),

    #[error("Key not found: {key} (in config '{config}')")]
    KeyNotFound { key: String, config: String },

    #[error("No writable location for config '{0}'; add a search path to the store options")]
    NoWritePath(String),
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `"general.port"`.
    pub path: String,
    pub message: String,
}

/// Every field that failed while validating one record or model.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub model: String,
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if any error was reported for `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.errors.len() == 1 { "" } else { "s" };
        write!(
            f,
            "{} validation error{plural} for {}",
            self.errors.len(),
            self.model
        )?;
        for e in &self.errors {
            write!(f, "\n  {}: {}", e.path, e.message)?;
        }
        Ok(())
    }
}
