//! Position mapping from generated sources back to what the developer wrote.
//!
//! Compilers report errors against generated code (compiled templates, route tables).
//! A [`PositionMapper`] turns such a position into the original file, line and, when
//! the format allows it, column and offset. A miss is `None`; callers then show the
//! generated position as-is.
//!
//! Mapping is stateless and re-reads files on every call, so it is safe to share
//! mappers across threads and to call them while files are being edited.

mod routes;
mod table;
mod template;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use routes::{HEADER_FLOOR, RoutesMapper, SOURCE_PREFIX, parse_header, parse_marker};
pub use table::PositionTable;
pub use template::{SEPARATOR, TemplateMapper, TemplateMetadata};

/// A position in a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPosition {
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    /// Byte offset into the generated file, when the compiler reported one
    pub offset: Option<usize>,
}

impl GeneratedPosition {
    pub fn line(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            offset: None,
        }
    }

    pub fn offset(file: impl Into<PathBuf>, line: usize, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            offset: Some(offset),
        }
    }
}

/// A position in an original source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: PathBuf,
    /// 1-based; 0 means before any mapped region
    pub line: usize,
    pub column: Option<usize>,
    pub offset: Option<usize>,
    /// Text of `line`, without line terminator
    pub content: Option<String>,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        Ok(())
    }
}

/// Maps generated positions to original positions.
pub trait PositionMapper: Send + Sync {
    fn map(&self, position: &GeneratedPosition) -> Option<SourcePosition>;
}

/// Kind of generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedFormat {
    Template,
    Routes,
}

impl GeneratedFormat {
    /// Recognize a generated file by its contents.
    pub fn detect(contents: &str) -> Option<Self> {
        let first = contents.lines().next()?;
        if first.contains(SOURCE_PREFIX) {
            return Some(Self::Routes);
        }
        contents
            .lines()
            .any(|line| line.trim() == SEPARATOR)
            .then_some(Self::Template)
    }
}

/// Mapper that picks the strategy matching each generated file.
#[derive(Debug, Clone)]
pub struct SourceMapper {
    template: TemplateMapper,
    routes: RoutesMapper,
}

impl SourceMapper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            template: TemplateMapper::new(root.clone()),
            routes: RoutesMapper::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        self.template.root()
    }

    /// Format of `file`, or `None` if it is not a recognized generated file.
    pub fn detect(&self, file: &Path) -> Option<GeneratedFormat> {
        GeneratedFormat::detect(&fs::read_to_string(file).ok()?)
    }
}

impl PositionMapper for SourceMapper {
    fn map(&self, position: &GeneratedPosition) -> Option<SourcePosition> {
        let generated = fs::read_to_string(&position.file).ok()?;
        let mapped = match GeneratedFormat::detect(&generated)? {
            GeneratedFormat::Template => self.template.map_generated(&generated, position),
            GeneratedFormat::Routes => self.routes.map_generated(&generated, position),
        };
        if mapped.is_none() {
            crate::debug_event!(
                "mapping",
                "no mapping",
                "{}:{}",
                position.file.display(),
                position.line
            );
        }
        mapped
    }
}

/// Resolve a path written by a generator against the project root.
pub(crate) fn resolve_source(root: &Path, source: &str) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
