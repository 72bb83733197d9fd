use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClapscopeError {
    #[error("Cannot {action}: declarations are closed once the run phase has started")]
    Sequence { action: String },

    #[error("Invalid argument declaration: {reason}")]
    Spec { reason: String },

    #[error("Malformed config file {path} (line {line}): {reason}")]
    ConfigFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("No entrypoint provided; register one with .entrypoint() or select a subcommand")]
    NoEntrypoint,

    #[error("A process-wide log subscriber is already installed; logging can only be set up once")]
    DuplicateRootHandler,

    #[error(transparent)]
    Args(#[from] clap::Error),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ClapscopeError {
    pub(crate) fn sequence(action: impl Into<String>) -> Self {
        ClapscopeError::Sequence {
            action: action.into(),
        }
    }

    pub(crate) fn spec(reason: impl Into<String>) -> Self {
        ClapscopeError::Spec {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_format_formats_correctly() {
        let err = ClapscopeError::ConfigFormat {
            path: "/home/user/.myapp.ini".into(),
            line: 7,
            reason: "option outside of any section".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains(".myapp.ini"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("outside of any section"));
    }

    #[test]
    fn sequence_names_the_action() {
        let err = ClapscopeError::sequence("declare --name");
        let msg = err.to_string();
        assert!(msg.contains("declare --name"));
        assert!(msg.contains("declarations are closed"));
    }

    #[test]
    fn no_entrypoint_mentions_builder_method() {
        let err = ClapscopeError::NoEntrypoint;
        assert!(err.to_string().contains(".entrypoint()"));
    }
}
