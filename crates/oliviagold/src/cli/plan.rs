//! `plan`: print the deletion waves.

use anyhow::Result;
use oliviagold_guard::DeletionStep;
use serde::Serialize;
use std::io::Write;

use super::context::CommandContext;
use super::exit::Outcome;
use super::output::{write_json, write_line};

#[derive(Debug, Serialize)]
struct WaveOutput<'a> {
    wave: usize,
    steps: Vec<&'a DeletionStep>,
}

pub fn run(ctx: &CommandContext, json: bool, out: &mut dyn Write) -> Result<Outcome> {
    let plan = ctx.deletion_plan()?;
    let waves = plan.waves();

    if json {
        let output: Vec<WaveOutput<'_>> = waves
            .into_iter()
            .enumerate()
            .map(|(wave, steps)| WaveOutput { wave, steps })
            .collect();
        write_json(out, &output)?;
        return Ok(Outcome::Success);
    }

    write_line(
        out,
        &format!("{} tables in {} waves (children first)", plan.len(), waves.len()),
    )?;
    for (wave, steps) in waves.iter().enumerate() {
        let names: Vec<String> = steps
            .iter()
            .map(|s| format!("{} ({})", s.entity, s.table))
            .collect();
        write_line(out, &format!("  wave {}: {}", wave, names.join(", ")))?;
    }
    Ok(Outcome::Success)
}
