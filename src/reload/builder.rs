//! The external build tool, as seen by the reload protocol.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A compile error reported by the build tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileProblem {
    pub message: String,
    /// 1-based
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Byte offset into `source`
    pub offset: Option<usize>,
    pub source: Option<PathBuf>,
    /// Source text as the build tool saw it; read from disk on demand when absent
    pub content: Option<String>,
}

impl CompileProblem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, source: impl Into<PathBuf>, line: usize) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self
    }

    pub fn column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for CompileProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => {
                write!(f, "{}:{line}: {}", source.display(), self.message)
            }
            (Some(source), None) => write!(f, "{}: {}", source.display(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Failure reported by [`Builder::build`].
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    #[error("Compilation failed: {0}")]
    Compilation(CompileProblem),

    #[error("{message}")]
    Unexpected {
        message: String,
        #[source]
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
}

impl BuildError {
    pub fn unexpected(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unexpected {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            cause: None,
        }
    }
}

impl From<CompileProblem> for BuildError {
    fn from(problem: CompileProblem) -> Self {
        Self::Compilation(problem)
    }
}

/// Where a compiled symbol was defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based
    pub line: Option<usize>,
}

/// The build tool driving compilation.
///
/// Calls into a builder are serialized by the version manager; implementations may
/// still be shared with other threads.
pub trait Builder: Send + Sync {
    /// Compile whatever changed. `Ok(true)` iff anything was recompiled.
    fn build(&self) -> Result<bool, BuildError>;

    /// Invalidate so the next build recompiles even without a change signal.
    fn force_reload(&self);

    /// Locate the definition of a compiled symbol.
    fn find_source(&self, symbol: &str, line: Option<usize>) -> Option<SourceLocation>;

    fn project_path(&self) -> PathBuf;

    /// Directories holding the output of the latest build.
    fn output_dirs(&self) -> Vec<PathBuf>;
}
