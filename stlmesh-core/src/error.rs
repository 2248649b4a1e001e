/// Error types for parser configuration and STL decoding
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for STL decoding.
pub type StlResult<T> = Result<T, StlError>;

/// Misuse of the [`StlParser`](crate::stl::StlParser) builder.
///
/// These are the only errors that leave the parser; everything that goes
/// wrong while reading a model is folded into a `false` parse result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A model path and a stream were both configured.
    #[error("model path and stream can not be combined")]
    SourceConflict,

    /// Neither a model path nor a stream was configured.
    #[error("configure either a model path or a stream before parsing")]
    MissingSource,

    /// Scale/rotation/translation were mixed with an explicit transform.
    #[error("scale/rotation/translate can not be mixed with an explicit transform")]
    TransformConflict,

    /// Triangle data was requested before a successful parse.
    #[error("no positions available, parse the model first")]
    NotParsed,
}

/// Failure while reading or decoding an STL model.
#[derive(Debug, Error)]
pub enum StlError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("unsupported model extension: {extension:?}")]
    UnsupportedExtension { extension: Option<String> },

    /// The binary header starts with the ASCII `solid ` signature.
    #[error("binary header starts with 'solid', treating input as ascii")]
    AsciiSignature,

    #[error("binary payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid number on line {line}: {details}")]
    InvalidNumber { line: usize, details: String },

    #[error("facet ending on line {line} has {vertices} vertices, expected 3")]
    MalformedFacet { line: usize, vertices: usize },

    #[error("input contains no triangles")]
    Empty,

    #[error("ascii input is not valid utf-8 on line {line}")]
    InvalidUtf8 { line: usize },
}
