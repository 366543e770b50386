//! Resolve command

use super::load_engine;
use crate::app::{OutputFormat, ResolveArgs};
use crate::output;
use anyhow::Result;
use callscope_core::{CallscopeError, Config, Resolution, ResolutionError};

pub fn run(args: ResolveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = load_engine(&args.repo, config)?;
    let resolution = engine.resolve_symbol(&args.query, args.context.as_deref());

    let evidence = match (&resolution, args.open) {
        (Resolution::Matched { symbol, .. }, true) => Some(engine.open_resolved(symbol)?),
        _ => None,
    };
    output::print_resolution(&args.query, &resolution, evidence.as_ref(), format)?;

    if resolution == Resolution::NotFound {
        return Err(CallscopeError::Resolution(ResolutionError::NotFound { query: args.query }).into());
    }
    Ok(())
}
