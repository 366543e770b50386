//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use callscope_core::{Evidence, RepoIndex, Resolution, RunOutput, UsageHit};
use std::io::{self, IsTerminal, Write};
use termcolor::{ColorChoice, StandardStream};

fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn print_json(value: &serde_json::Value) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)
}

pub fn print_run(run: &RunOutput, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json::run(run)),
        OutputFormat::Cli => terminal::write_run(&mut stdout(), run),
    }
}

pub fn print_index(index: &RepoIndex, list_symbols: bool, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json::index(index, list_symbols)),
        OutputFormat::Cli => terminal::write_index(&mut stdout(), index, list_symbols),
    }
}

pub fn print_resolution(
    query: &str,
    resolution: &Resolution,
    evidence: Option<&Evidence>,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json::resolution(query, resolution, evidence)),
        OutputFormat::Cli => terminal::write_resolution(&mut stdout(), query, resolution, evidence),
    }
}

pub fn print_usages(needle: &str, hits: &[UsageHit], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json::usages(needle, hits)),
        OutputFormat::Cli => terminal::write_usages(&mut stdout(), needle, hits),
    }
}
