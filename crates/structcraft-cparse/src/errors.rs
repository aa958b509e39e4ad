//! Errors of the castxml run and reasons a translated type is left out.

use std::{io, path::PathBuf};

use structcraft::SchemaError;
use thiserror::Error;

/// Failures of the external castxml invocation.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    /// The executable is not installed or not on `PATH`.
    #[error("executable `{command}` not found; castxml must be installed and on PATH")]
    NotFound { command: String },

    /// The executable exists but could not be started.
    #[error("unable to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The tool exited with a failure status. `output` holds stdout and stderr.
    #[error("`{command_line}` failed ({status}):\n{output}")]
    Failed {
        command_line: String,
        status: String,
        output: String,
    },

    /// The tool reported success but never wrote its XML.
    #[error("castxml did not report any error but {} was never produced:\n{output}", path.display())]
    NoOutput { path: PathBuf, output: String },
}

/// Errors returned by [`crate::parse_c`].
#[derive(Debug, Error)]
pub enum CParseError {
    #[error(transparent)]
    Tool(#[from] ExternalToolError),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed castxml output: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Why a composite from the XML was left out of the result.
///
/// These never abort a translation; they are logged and the type is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    /// A member could not be translated.
    #[error("member `{member}`: {reason}")]
    Member {
        member: String,
        reason: Box<Unsupported>,
    },

    /// Multi-dimensional arrays.
    #[error("nested arrays (matrices) are not supported")]
    NestedArray,

    /// An XML element kind with no layout counterpart (functions, references, ...).
    #[error("member type {0} is not supported")]
    ElementKind(String),

    /// A fundamental type with no primitive tag, such as `long double` or `void`.
    #[error("fundamental type `{0}` is not supported")]
    Fundamental(String),

    #[error("no XML element with id `{0}`")]
    MissingElement(String),

    #[error("element `{id}` lacks attribute `{attribute}`")]
    MissingAttribute { id: String, attribute: &'static str },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    /// Structs may hold only bit members or only regular members.
    #[error("bit members mixed with regular members")]
    MixedBitfield,

    #[error("depends on unsupported type `{0}`")]
    Dependency(String),

    /// Forward declaration without a definition.
    #[error("incomplete type")]
    Incomplete,

    #[error("type refers to itself")]
    Recursive,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
