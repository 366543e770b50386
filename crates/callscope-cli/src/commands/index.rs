//! Index command

use super::load_index;
use crate::app::{IndexArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use callscope_core::Config;

pub fn run(args: IndexArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let index = load_index(&args.repo, config)?;
    output::print_index(&index, args.symbols, format)?;
    Ok(())
}
