//! Template-style generated sources.
//!
//! A compiled template carries a trailing metadata block between two separator lines:
//!
//! ```text
//! /*
//!     -- GENERATED --
//!     SOURCE: app/views/index.scala.html
//!     MATRIX: 505->1|531->21
//!     LINES: 14->1|15->2
//!     -- GENERATED --
//! */
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::table::PositionTable;
use super::{GeneratedPosition, PositionMapper, SourcePosition, resolve_source};

/// Separator line around the metadata block.
pub const SEPARATOR: &str = "-- GENERATED --";

const KEY_SOURCE: &str = "SOURCE";
const KEY_LINES: &str = "LINES";
const KEY_MATRIX: &str = "MATRIX";

/// Key/value table read from a generated template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMetadata {
    entries: HashMap<String, String>,
}

impl TemplateMetadata {
    /// Read the metadata block from generated file contents.
    ///
    /// Returns `None` if the separator never appears.
    pub fn parse(generated: &str) -> Option<Self> {
        let mut lines = generated.lines().map(str::trim);
        lines.find(|line| *line == SEPARATOR)?;

        let mut entries = HashMap::new();
        for line in lines {
            if line == SEPARATOR {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Some(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Original source path as written by the generator.
    pub fn source(&self) -> Option<&str> {
        self.get(KEY_SOURCE).filter(|s| !s.is_empty())
    }

    /// Line table.
    pub fn lines(&self) -> Option<PositionTable> {
        self.get(KEY_LINES).and_then(PositionTable::parse)
    }

    /// Offset table.
    pub fn matrix(&self) -> Option<PositionTable> {
        self.get(KEY_MATRIX).and_then(PositionTable::parse)
    }
}

/// Maps positions in compiled templates back to the template source.
#[derive(Debug, Clone)]
pub struct TemplateMapper {
    root: PathBuf,
}

impl TemplateMapper {
    /// Relative `SOURCE` paths resolve against `root`.
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
        let metadata = TemplateMetadata::parse(generated)?;
        let file = resolve_source(&self.root, metadata.source()?);
        if !file.is_file() {
            crate::debug_event!("mapping", "template source missing", "{}", file.display());
            return None;
        }
        let original = fs::read_to_string(&file).ok()?;

        // Offsets go through MATRIX; without an offset or a usable matrix, use LINES
        let mapped = position
            .offset
            .zip(metadata.matrix())
            .and_then(|(offset, matrix)| matrix.map(offset));
        if let Some(mapped) = mapped {
            let (line, column, content) = locate_offset(&original, mapped);
            return Some(SourcePosition {
                file,
                line,
                column: Some(column),
                offset: Some(mapped),
                content: Some(content),
            });
        }

        let line = metadata.lines()?.map(position.line)?;
        let content = line
            .checked_sub(1)
            .and_then(|index| original.lines().nth(index))
            .map(|text| text.trim_end_matches('\r').to_string());
        Some(SourcePosition {
            file,
            line,
            column: None,
            offset: None,
            content,
        })
    }
}

impl PositionMapper for TemplateMapper {
    fn map(&self, position: &GeneratedPosition) -> Option<SourcePosition> {
        let generated = fs::read_to_string(&position.file).ok()?;
        self.map_generated(&generated, position)
    }
}

/// Resolve a byte offset to `(1-based line, column, line content)`.
///
/// Offsets past the end clamp to the end of the last line; a trailing `\r` is not
/// part of the line.
pub(crate) fn locate_offset(text: &str, offset: usize) -> (usize, usize, String) {
    let mut start = 0;
    let mut last = (1, 0, String::new());

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let end = start + raw.len();
        if offset <= end {
            let column = (offset - start).min(line.len());
            return (index + 1, column, line.to_string());
        }
        last = (index + 1, line.len(), line.to_string());
        start = end + 1;
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn generated_template(source: &str) -> String {
        format!(
            "package views.html\n\nobject index {{\n}}\n\n/*\n    {SEPARATOR}\n    DATE: Mon Jan 01 00:00:00 UTC 2024\n    SOURCE: {source}\n    MATRIX: 10->0|20->12\n    LINES: 10->5|20->8\n    {SEPARATOR}\n*/\n"
        )
    }

    #[test]
    fn test_parse_metadata() {
        let metadata = TemplateMetadata::parse(&generated_template("app/views/index.scala.html"))
            .unwrap();
        assert_eq!(metadata.source(), Some("app/views/index.scala.html"));
        assert_eq!(metadata.get("DATE"), Some("Mon Jan 01 00:00:00 UTC 2024"));
        assert_eq!(metadata.lines().unwrap().map(15), Some(10));
        assert_eq!(metadata.matrix().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_without_separator() {
        assert!(TemplateMetadata::parse("object index {}\n").is_none());
    }

    #[test]
    fn test_locate_offset() {
        let text = "first\r\nsecond\nthird";
        assert_eq!(locate_offset(text, 0), (1, 0, "first".to_string()));
        assert_eq!(locate_offset(text, 7), (2, 0, "second".to_string()));
        assert_eq!(locate_offset(text, 9), (2, 2, "second".to_string()));
        assert_eq!(locate_offset(text, 16), (3, 2, "third".to_string()));
    }

    #[test]
    fn test_locate_offset_clamps_past_end() {
        assert_eq!(locate_offset("ab\ncd", 100), (2, 2, "cd".to_string()));
    }

    #[test]
    fn test_map_line_and_offset() {
        let temp = TempDir::new().unwrap();
        let views = temp.path().join("app/views");
        fs::create_dir_all(&views).unwrap();
        let source: String = (1..=20).map(|n| format!("line {n:02}\n")).collect();
        fs::write(views.join("index.scala.html"), &source).unwrap();

        let generated = temp.path().join("index.template.scala");
        fs::write(&generated, generated_template("app/views/index.scala.html")).unwrap();

        let mapper = TemplateMapper::new(temp.path());

        let by_line = mapper.map(&GeneratedPosition::line(&generated, 15)).unwrap();
        assert_eq!(by_line.line, 10);
        assert_eq!(by_line.content.as_deref(), Some("line 10"));
        assert_eq!(by_line.offset, None);
        assert_eq!(by_line.file, views.join("index.scala.html"));

        // 22 -> 12 + 2 = 14: second line ("line 02\n" is 8 bytes), column 6
        let by_offset = mapper
            .map(&GeneratedPosition::offset(&generated, 21, 22))
            .unwrap();
        assert_eq!(by_offset.offset, Some(14));
        assert_eq!(by_offset.line, 2);
        assert_eq!(by_offset.column, Some(6));
        assert_eq!(by_offset.content.as_deref(), Some("line 02"));
    }

    #[test]
    fn test_offset_falls_back_to_lines_without_matrix_entries() {
        let temp = TempDir::new().unwrap();
        let source: String = (1..=20).map(|n| format!("line {n:02}\n")).collect();
        fs::write(temp.path().join("index.scala.html"), &source).unwrap();

        let generated = format!(
            "object index {{}}\n/*\n    {SEPARATOR}\n    SOURCE: index.scala.html\n    MATRIX: \n    LINES: 10->5|20->8\n    {SEPARATOR}\n*/\n"
        );
        let mapper = TemplateMapper::new(temp.path());

        let position = mapper
            .map_generated(&generated, &GeneratedPosition::offset("index.template.scala", 15, 300))
            .unwrap();
        assert_eq!(position.line, 10);
        assert_eq!(position.column, None);
        assert_eq!(position.content.as_deref(), Some("line 10"));
    }

    #[test]
    fn test_missing_source_yields_none() {
        let temp = TempDir::new().unwrap();
        let generated = temp.path().join("index.template.scala");
        fs::write(&generated, generated_template("app/views/gone.scala.html")).unwrap();

        let mapper = TemplateMapper::new(temp.path());
        assert!(mapper.map(&GeneratedPosition::line(&generated, 15)).is_none());
    }
}
