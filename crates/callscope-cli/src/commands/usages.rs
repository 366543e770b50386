//! Usages command

use super::load_engine;
use crate::app::{OutputFormat, UsagesArgs};
use crate::output;
use anyhow::Result;
use callscope_core::search::find_usages;
use callscope_core::Config;

pub fn run(args: UsagesArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = load_engine(&args.repo, config)?;
    let hits = find_usages(engine.index(), &args.needle, args.limit)?;
    output::print_usages(&args.needle, &hits, format)?;
    Ok(())
}
