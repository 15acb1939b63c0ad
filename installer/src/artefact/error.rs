//! Error types for artefact descriptors and digests.
//!
//! Each variant identifies the invalid input and the constraint that was
//! violated, so manifest authors can fix the offending entry directly.

use thiserror::Error;

/// Errors arising from invalid artefact-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A prebuilt binary descriptor does not say which OS it targets.
    #[error("prebuilt artefact {url} must declare an `os`")]
    MissingOs {
        /// The descriptor URL template.
        url: String,
    },

    /// A source archive declares platform fields it cannot honour.
    #[error("source archive {url} must not declare `os` or `arch`")]
    PlatformOnSourceArchive {
        /// The descriptor URL template.
        url: String,
    },

    /// A URL template references a placeholder the installer cannot fill.
    #[error("unknown placeholder {{{placeholder}}} in URL template {template}")]
    UnknownPlaceholder {
        /// The offending template.
        template: String,
        /// The placeholder name without braces.
        placeholder: String,
    },

    /// A URL template has an opening brace with no closing brace.
    #[error("unterminated placeholder in URL template {template}")]
    UnterminatedPlaceholder {
        /// The offending template.
        template: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
