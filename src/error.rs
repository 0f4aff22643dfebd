//! Error types of the dispatch layer.

use crate::ids::ControllerAction;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while decoding request values into a form model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("field `{field}`: cannot parse {value:?} as {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("field `{field}`: {message}")]
    Field { field: String, message: String },
    #[error("{0}")]
    Custom(String),
}

impl FormError {
    /// Attach a field name to an error raised while decoding that field.
    pub(crate) fn in_field(self, name: &str) -> Self {
        match self {
            FormError::Custom(message) => FormError::Field {
                field: name.to_string(),
                message,
            },
            FormError::InvalidValue { value, expected, .. } => FormError::InvalidValue {
                field: name.to_string(),
                value,
                expected,
            },
            other => other,
        }
    }
}

impl serde::de::Error for FormError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        FormError::Custom(msg.to_string())
    }
}

/// Failure while resolving one declared handler parameter.
#[derive(Debug, Error)]
pub enum BindError {
    /// No supplied value and no fallback for the declared type.
    #[error("no supplied value for parameter of type `{type_name}`")]
    NotSupplied { type_name: &'static str },
    /// The construct-and-decode fallback failed.
    #[error("cannot decode parameter of type `{type_name}`: {source}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: FormError,
    },
    /// The controller instance handed to a descriptor has a different type.
    #[error("controller instance is not a `{expected}`")]
    ControllerMismatch { expected: &'static str },
}

/// Failure while reading the request body as a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("form body of {size} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { size: usize, limit: usize },
    #[error("invalid content type {0:?}")]
    InvalidContentType(String),
    #[error("invalid percent-encoding in form body at byte {0}")]
    InvalidEscape(usize),
}

/// Failure while parsing or rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("cannot read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("views folder {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("controller not found: {0}")]
    ControllerNotFound(String),
    #[error("action not found: {0}")]
    ActionNotFound(String),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("panic while rendering: {0}")]
    Panic(String),
}

/// Misuse of the registration API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("{kind} view must name both a controller and an action, got {pair}")]
    IncompleteViewPair {
        kind: &'static str,
        pair: ControllerAction,
    },
}

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error(transparent)]
    Views(#[from] ViewError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
