//! Map command: generated position -> original source.

use std::path::PathBuf;

use anyhow::Context;

use crate::config::Settings;
use crate::mapping::{GeneratedPosition, PositionMapper, SourceMapper};

/// Print the original position, or "no mapping" on a miss.
pub fn run_map(
    config: &Settings,
    generated: PathBuf,
    line: usize,
    offset: Option<usize>,
) -> anyhow::Result<()> {
    if !generated.is_file() {
        anyhow::bail!("Generated file not found: {}", generated.display());
    }

    let mapper = SourceMapper::new(config.project_root());
    let format = mapper
        .detect(&generated)
        .with_context(|| format!("{} is not a generated source", generated.display()))?;
    crate::debug_event!("map", "format", "{format:?}");

    let position = GeneratedPosition {
        file: generated,
        line,
        offset,
    };
    match mapper.map(&position) {
        Some(original) => {
            println!("{original}");
            if let Some(content) = &original.content {
                println!("    {content}");
            }
        }
        None => println!(
            "no mapping for {}:{}",
            position.file.display(),
            position.line
        ),
    }
    Ok(())
}
