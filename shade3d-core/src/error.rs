/// Error types shared across the core
use thiserror::Error;

use crate::backend::ProgramHandle;

/// Failures of the pure matrix helpers
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MathError {
    #[error("matrix is singular (determinant {determinant})")]
    SingularMatrix { determinant: f32 },
}

/// Rejected projection parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid projection parameter: {0}")]
    InvalidParameter(String),
    #[error("unknown projection mode `{0}`")]
    UnknownMode(String),
}

/// Errors reported by a graphics backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("shader program failed to link: {log}")]
    ShaderLink { log: String },
    #[error("program {0:?} is not usable")]
    InertProgram(ProgramHandle),
    #[error("program does not declare uniform `{0}`")]
    MissingUniform(&'static str),
    #[error("program does not declare attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("draw range {first}..{end} exceeds {available} uploaded vertices")]
    DrawRange {
        first: usize,
        end: usize,
        available: usize,
    },
    #[error("backend failure: {0}")]
    Other(String),
}

/// A program that failed to build; the handle stays valid but inert
#[derive(Debug, Clone, PartialEq, Error)]
#[error("program {program:?} is inert: {source}")]
pub struct CompileFailure {
    pub program: ProgramHandle,
    #[source]
    pub source: BackendError,
}

/// Texture construction and loading failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TextureError {
    #[error("texture data has {actual} texels, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("texture has zero area")]
    Empty,
    #[error("texture load failed: {0}")]
    Load(String),
}

/// STL parsing failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),
    #[error("binary STL declares {declared} triangles but holds {available}")]
    Truncated { declared: usize, available: usize },
    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Errors surfaced by a frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("vertex streams are inconsistent: {0}")]
    InvalidStreams(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
