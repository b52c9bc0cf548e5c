//! Result of a single reload.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::builder::CompileProblem;
use super::scope::CodeScope;
use crate::mapping::GeneratedPosition;

/// What one `reload()` produced.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Nothing was recompiled; the current scope stays active.
    NoChange,
    /// A new scope replaced the previous one.
    Reloaded(Arc<CodeScope>),
    CompileFailure(CompileFailure),
    UnexpectedError {
        message: String,
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
}

impl BuildOutcome {
    pub fn scope(&self) -> Option<&Arc<CodeScope>> {
        match self {
            Self::Reloaded(scope) => Some(scope),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::CompileFailure(_) | Self::UnexpectedError { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoChange => "no change",
            Self::Reloaded(_) => "reloaded",
            Self::CompileFailure(_) => "compile failure",
            Self::UnexpectedError { .. } => "unexpected error",
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => f.write_str("no change"),
            Self::Reloaded(scope) => write!(f, "reloaded (v{})", scope.version()),
            Self::CompileFailure(failure) => write!(f, "compile failure: {failure}"),
            Self::UnexpectedError { message, cause } => match cause {
                Some(cause) => write!(f, "unexpected error: {message} ({cause})"),
                None => write!(f, "unexpected error: {message}"),
            },
        }
    }
}

/// Source text captured for a compile failure, read on first access.
#[derive(Debug)]
pub struct SourceSnapshot {
    path: Option<PathBuf>,
    content: OnceLock<Option<String>>,
}

impl SourceSnapshot {
    pub fn lazy(path: Option<PathBuf>) -> Self {
        Self {
            path,
            content: OnceLock::new(),
        }
    }

    pub fn with_content(path: Option<PathBuf>, content: String) -> Self {
        let snapshot = Self::lazy(path);
        let _ = snapshot.content.set(Some(content));
        snapshot
    }

    /// File text, or `None` if it could not be read.
    pub fn content(&self) -> Option<&str> {
        self.content
            .get_or_init(|| {
                let path = self.path.as_ref()?;
                match fs::read_to_string(path) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        crate::debug_event!(
                            "reload",
                            "source unreadable",
                            "{}: {e}",
                            path.display()
                        );
                        None
                    }
                }
            })
            .as_deref()
    }
}

/// A structured compile error, positioned in the file the developer edits.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub message: String,
    /// 1-based
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub offset: Option<usize>,
    /// Absolute
    pub source: Option<PathBuf>,
    /// Set when the position was mapped out of a generated file
    pub generated: Option<GeneratedPosition>,
    snapshot: Arc<SourceSnapshot>,
}

impl CompileFailure {
    /// Build from a builder problem, resolving a relative source against `project`.
    pub fn from_problem(problem: CompileProblem, project: &Path) -> Self {
        let source = problem
            .source
            .map(|path| if path.is_absolute() { path } else { project.join(path) });
        let snapshot = match problem.content {
            Some(content) => SourceSnapshot::with_content(source.clone(), content),
            None => SourceSnapshot::lazy(source.clone()),
        };

        Self {
            message: collapse_message(&problem.message),
            line: problem.line,
            column: problem.column,
            offset: problem.offset,
            source,
            generated: None,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Same failure, moved to another source position.
    pub fn relocated(
        self,
        source: PathBuf,
        line: usize,
        column: Option<usize>,
        offset: Option<usize>,
        generated: GeneratedPosition,
    ) -> Self {
        Self {
            snapshot: Arc::new(SourceSnapshot::lazy(Some(source.clone()))),
            source: Some(source),
            line: Some(line),
            column,
            offset,
            generated: Some(generated),
            ..self
        }
    }

    /// Text of the source file, read on first call.
    pub fn content(&self) -> Option<&str> {
        self.snapshot.content()
    }

    /// Text of the failing line.
    pub fn line_content(&self) -> Option<&str> {
        let index = self.line?.checked_sub(1)?;
        self.content()?
            .lines()
            .nth(index)
            .map(|line| line.trim_end_matches('\r'))
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}", source.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
            f.write_str(": ")?;
        }
        f.write_str(&self.message)
    }
}

static OVERLOADED: OnceLock<Option<Regex>> = OnceLock::new();

fn overloaded() -> Option<&'static Regex> {
    OVERLOADED
        .get_or_init(|| {
            Regex::new(
                r"(?s)^overloaded method (?:value )?(\S+) with alternatives:(.*?)\s*cannot be applied to (.*)$",
            )
            .ok()
        })
        .as_ref()
}

const AMBIGUOUS_PREFIX: &str = "ambiguous reference to overloaded definition";

/// Collapse multi-line overload-resolution diagnostics into one line.
///
/// Other messages pass through untouched.
pub fn collapse_message(message: &str) -> String {
    if let Some(caps) = overloaded().and_then(|re| re.captures(message)) {
        let alternatives = caps[2].matches("<and>").count() + 1;
        return format!(
            "overloaded method {} ({alternatives} alternatives) cannot be applied to {}",
            &caps[1],
            single_line(&caps[3])
        );
    }
    if message.starts_with(AMBIGUOUS_PREFIX) {
        return single_line(message);
    }
    message.to_string()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collapse_overloaded() {
        let message = "overloaded method value apply with alternatives:\n  (x: Int)Foo <and>\n  (s: String)Foo <and>\n  (b: Byte)Foo\n cannot be applied to (Boolean)";
        assert_eq!(
            collapse_message(message),
            "overloaded method apply (3 alternatives) cannot be applied to (Boolean)"
        );
    }

    #[test]
    fn test_collapse_ambiguous() {
        let message = "ambiguous reference to overloaded definition,\nboth method f in object A of type (x: Int)Unit\nand  method f in object A of type (x: Long)Unit\nmatch argument types (Nothing)";
        let collapsed = collapse_message(message);
        assert!(!collapsed.contains('\n'));
        assert!(collapsed.starts_with("ambiguous reference to overloaded definition, both method f"));
    }

    #[test]
    fn test_other_messages_untouched() {
        assert_eq!(collapse_message("not found: value x"), "not found: value x");
        assert_eq!(collapse_message("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_snapshot_reads_lazily() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("Home.scala");
        std::fs::write(&source, "object Home\n  val x: Int = \"a\"\n").unwrap();

        let failure = CompileFailure::from_problem(
            CompileProblem::new("type mismatch").at("Home.scala", 2),
            temp.path(),
        );

        // Written after capture: the snapshot is taken on first read
        std::fs::write(&source, "object Home\n  val x: Int = true\n").unwrap();

        assert_eq!(failure.source.as_deref(), Some(source.as_path()));
        assert_eq!(failure.line_content(), Some("  val x: Int = true"));
        std::fs::write(&source, "changed").unwrap();
        assert_eq!(failure.line_content(), Some("  val x: Int = true"));
    }

    #[test]
    fn test_unreadable_source_has_no_content() {
        let failure = CompileFailure::from_problem(
            CompileProblem::new("boom").at("/definitely/not/here.scala", 1),
            Path::new("/"),
        );
        assert!(failure.content().is_none());
        assert!(failure.line_content().is_none());
    }

    #[test]
    fn test_builder_content_wins() {
        let failure = CompileFailure::from_problem(
            CompileProblem {
                content: Some("in memory".to_string()),
                ..CompileProblem::new("boom").at("/nowhere.scala", 1)
            },
            Path::new("/"),
        );
        assert_eq!(failure.line_content(), Some("in memory"));
    }
}
