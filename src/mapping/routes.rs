//! Routes-style generated sources.
//!
//! The first line names the routes file (`// @SOURCE:conf/routes`) and every emitted
//! statement is preceded by a marker naming its original line (`// @LINE:42`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::{GeneratedPosition, PositionMapper, SourcePosition, resolve_source};

/// Prefix of the header naming the original routes file.
pub const SOURCE_PREFIX: &str = "@SOURCE:";

/// Lowest generated line index examined when scanning for a marker.
///
/// Tied to the header the routes generator writes; move it if the header grows.
pub const HEADER_FLOOR: usize = 3;

static LINE_MARKER: OnceLock<Option<Regex>> = OnceLock::new();

fn line_marker() -> Option<&'static Regex> {
    LINE_MARKER
        .get_or_init(|| Regex::new(r"^\s*(?://)?\s*@LINE:\s*(\d+)\s*$").ok())
        .as_ref()
}

/// Original line referenced by a marker line, if it is one.
pub fn parse_marker(line: &str) -> Option<usize> {
    line_marker()?
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Original source path named by the header line.
pub fn parse_header(first_line: &str) -> Option<&str> {
    let (_, rest) = first_line.split_once(SOURCE_PREFIX)?;
    let path = rest.trim();
    (!path.is_empty()).then_some(path)
}

/// Maps lines in generated routes code back to the routes file.
#[derive(Debug, Clone)]
pub struct RoutesMapper {
    root: PathBuf,
}

impl RoutesMapper {
    /// Relative `@SOURCE:` paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map using already-read generated file contents.
    pub fn map_generated(
        &self,
        generated: &str,
        position: &GeneratedPosition,
    ) -> Option<SourcePosition> {
        let lines: Vec<&str> = generated.lines().collect();
        let file = resolve_source(&self.root, parse_header(lines.first()?)?);

        let line = find_marker(&lines, position.line)?;
        let original = fs::read_to_string(&file).ok()?;
        let content = original
            .lines()
            .nth(line.checked_sub(1)?)?
            .trim_end_matches('\r')
            .to_string();

        Some(SourcePosition {
            file,
            line,
            column: None,
            offset: None,
            content: Some(content),
        })
    }
}

impl PositionMapper for RoutesMapper {
    fn map(&self, position: &GeneratedPosition) -> Option<SourcePosition> {
        let generated = fs::read_to_string(&position.file).ok()?;
        self.map_generated(&generated, position)
    }
}

/// Walk back from 1-based `line` to the nearest marker, stopping at the header.
fn find_marker(lines: &[&str], line: usize) -> Option<usize> {
    let start = line.checked_sub(1)?.min(lines.len().checked_sub(1)?);
    if start < HEADER_FLOOR {
        return None;
    }
    (HEADER_FLOOR..=start)
        .rev()
        .find_map(|index| parse_marker(lines[index]))
}
