//! Stdout rendering for command results.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to write JSON output")?;
    writeln!(out).context("Failed to write JSON output")?;
    Ok(())
}

/// Write one plain line.
pub fn write_line(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{}", line).context("Failed to write output")
}
