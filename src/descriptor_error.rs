//! Error handling for descriptor file loading

use std::io;
use std::path::{Path, PathBuf};

/// Unified error to report failures while reading robot and tool descriptor files.
#[derive(Debug)]
pub enum DescriptorError {
    IoError(io::Error),
    ParseError(String),
    NotFinite(String),
    /// No matrix literal with the requested names or shape. The shape is rows x columns.
    MatrixNotFound { names: Vec<String>, shape: (usize, usize) },
    /// The matrix exists but cannot be used for the requested purpose.
    InvalidMatrix(String),
    /// Wraps any of the above with the file and the kind of data that was required from it.
    InFile { file: PathBuf, kind: DescriptorKind, source: Box<DescriptorError> },
}

/// What the descriptor file was expected to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Robot,
    Tool,
}

impl DescriptorError {
    pub(crate) fn in_file(self, file: &Path, kind: DescriptorKind) -> Self {
        DescriptorError::InFile { file: file.to_path_buf(), kind, source: Box::new(self) }
    }
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            DescriptorError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            DescriptorError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            DescriptorError::NotFinite(ref expr) =>
                write!(f, "Value is not finite: {}", expr),
            DescriptorError::MatrixNotFound { ref names, shape } =>
                write!(f, "No {}x{} matrix named any of [{}]", shape.0, shape.1, names.join(", ")),
            DescriptorError::InvalidMatrix(ref msg) =>
                write!(f, "Invalid matrix: {}", msg),
            DescriptorError::InFile { ref file, kind, ref source } => {
                let name = file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                match kind {
                    DescriptorKind::Robot => write!(f, "Robot file {} is missing a DH matrix ({})", name, source),
                    DescriptorKind::Tool => write!(f, "Tool file {} is missing a TCP transform ({})", name, source),
                }
            }
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            DescriptorError::IoError(ref err) => Some(err),
            DescriptorError::InFile { ref source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for DescriptorError {
    fn from(err: io::Error) -> Self {
        DescriptorError::IoError(err)
    }
}
