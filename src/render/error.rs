//! Error types for the render pipeline

use crate::models::ScrollId;
use std::io;
use std::path::PathBuf;

/// Result type for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering a scroll
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The scroll source file does not exist (any more).
    /// Expected during normal operation, never fatal.
    #[error("No such scroll: {0}")]
    NoSuchScroll(ScrollId),

    /// A LaTeX template could not be read
    #[error("Producing LaTeX file for scroll {id}: read template {name}: {source}")]
    Template {
        id: ScrollId,
        name: String,
        #[source]
        source: io::Error,
    },

    /// An external program exited unsuccessfully
    #[error("{program} failed for scroll {id} ({status}): {output}")]
    Process {
        id: ScrollId,
        program: String,
        status: String,
        /// Combined stdout and stderr
        output: String,
    },

    /// File system errors, including failing to start a program
    #[error("{context} for scroll {id}: {source}")]
    Io {
        id: ScrollId,
        context: String,
        #[source]
        source: io::Error,
    },

    /// The library directory could not be listed
    #[error("Read library directory {}: {source}", directory.display())]
    Library {
        directory: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The render task panicked
    #[error("Rendering scroll {id} panicked: {reason}")]
    Panicked { id: ScrollId, reason: String },

    /// A batch render was stopped by this scroll's failure
    #[error("An error occurred when processing scroll {id}: {source}")]
    Aborted {
        id: ScrollId,
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Whether the scroll simply does not exist
    pub fn is_missing(&self) -> bool {
        matches!(self, RenderError::NoSuchScroll(_))
    }

    /// Scroll the error is about, if any
    pub fn scroll_id(&self) -> Option<&ScrollId> {
        match self {
            RenderError::NoSuchScroll(id)
            | RenderError::Template { id, .. }
            | RenderError::Process { id, .. }
            | RenderError::Io { id, .. }
            | RenderError::Panicked { id, .. }
            | RenderError::Aborted { id, .. } => Some(id),
            RenderError::Library { .. } => None,
        }
    }

    pub(crate) fn io(id: &ScrollId, context: impl Into<String>, source: io::Error) -> Self {
        RenderError::Io {
            id: id.clone(),
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_classification() {
        let missing = RenderError::NoSuchScroll(ScrollId::from("gone"));
        assert!(missing.is_missing());

        let failed = RenderError::Process {
            id: ScrollId::from("euler"),
            program: "xelatex".to_string(),
            status: "exit status: 1".to_string(),
            output: "! Undefined control sequence.".to_string(),
        };
        assert!(!failed.is_missing());
        assert!(failed.to_string().contains("Undefined control sequence"));

        let aborted = RenderError::Aborted {
            id: ScrollId::from("euler"),
            source: Box::new(failed),
        };
        assert!(!aborted.is_missing());
        assert_eq!(aborted.scroll_id().map(ScrollId::as_str), Some("euler"));
    }
}
