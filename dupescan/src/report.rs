//! Writes scan results to their sinks.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;
use stable_eyre::{eyre::Context, Result};

use crate::dupes::Duplication;

/// Write a duplication report as pretty-printed JSON.
pub fn write_duplications(
    path: &Path,
    duplications: &[Duplication],
    indicator: &str,
) -> Result<()> {
    info!(
        "writing {} {indicator} group(s) to {path:?}",
        duplications.len()
    );
    let file = File::create(path).with_context(|| format!("create {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), duplications)
        .with_context(|| format!("serialize {indicator} report"))?;
    Ok(())
}

/// Write a list of paths, one per line.
pub fn write_lines(path: &Path, lines: &[String], indicator: &str) -> Result<()> {
    info!("writing {} {indicator} to {path:?}", lines.len());
    let file = File::create(path).with_context(|| format!("create {path:?}"))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}").with_context(|| format!("write {path:?}"))?;
    }
    writer.flush().with_context(|| format!("flush {path:?}"))?;
    Ok(())
}
