use crate::index::IndexError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File identity plus 1-based line number of the construct being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Location {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Error raised by builders and the inline parser, before a source location is known.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("{construct} is not implemented for the {target} builder")]
    NotImplemented {
        target: &'static str,
        construct: String,
    },

    #[error("unknown inline command: @<{0}>")]
    UnknownInline(String),

    #[error(transparent)]
    Reference(#[from] IndexError),

    #[error("{0}")]
    Syntax(String),
}

impl BuildError {
    pub fn not_implemented(target: &'static str, construct: impl Into<String>) -> Self {
        BuildError::NotImplemented {
            target,
            construct: construct.into(),
        }
    }

    /// Attach the location of the line that produced this error.
    pub fn at(self, location: &Location) -> CompileError {
        let location = location.clone();
        match self {
            BuildError::NotImplemented { target, construct } => CompileError::NotImplemented {
                location,
                target,
                construct,
            },
            BuildError::UnknownInline(name) => CompileError::UnknownInline { location, name },
            BuildError::Reference(IndexError::NotFound { kind, id }) => {
                CompileError::NotFound { location, kind, id }
            }
            BuildError::Reference(IndexError::Ambiguous { kind, id }) => {
                CompileError::Ambiguous { location, kind, id }
            }
            BuildError::Syntax(message) => CompileError::Syntax { location, message },
        }
    }
}

pub type BuildResult = std::result::Result<String, BuildError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{location}: {message}")]
    Syntax { location: Location, message: String },

    #[error("{location}: unknown command: //{name}")]
    UnknownDirective { location: Location, name: String },

    #[error("{location}: unknown inline command: @<{name}>")]
    UnknownInline { location: Location, name: String },

    #[error("{location}: unknown headline tag: [{name}]")]
    UnknownTag { location: Location, name: String },

    #[error("{location}: {kind} not found: {id}")]
    NotFound {
        location: Location,
        kind: &'static str,
        id: String,
    },

    #[error("{location}: {kind} is ambiguous: {id}")]
    Ambiguous {
        location: Location,
        kind: &'static str,
        id: String,
    },

    #[error("{location}: {construct} is not implemented for the {target} builder")]
    NotImplemented {
        location: Location,
        target: &'static str,
        construct: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),
}

/// Error categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnknownConstruct,
    NotFound,
    Ambiguous,
    NotImplemented,
    Configuration,
    Io,
}

impl CompileError {
    pub fn syntax(location: &Location, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            location: location.clone(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Syntax { .. } => ErrorKind::Syntax,
            CompileError::UnknownDirective { .. }
            | CompileError::UnknownInline { .. }
            | CompileError::UnknownTag { .. } => ErrorKind::UnknownConstruct,
            CompileError::NotFound { .. } => ErrorKind::NotFound,
            CompileError::Ambiguous { .. } => ErrorKind::Ambiguous,
            CompileError::NotImplemented { .. } => ErrorKind::NotImplemented,
            CompileError::Config(_) | CompileError::Catalog(_) => ErrorKind::Configuration,
            CompileError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            CompileError::Syntax { location, .. }
            | CompileError::UnknownDirective { location, .. }
            | CompileError::UnknownInline { location, .. }
            | CompileError::UnknownTag { location, .. }
            | CompileError::NotFound { location, .. }
            | CompileError::Ambiguous { location, .. }
            | CompileError::NotImplemented { location, .. } => Some(location),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
