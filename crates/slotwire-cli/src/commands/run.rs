//! `slotwire run`: Resolve a demo and print its result.

use clap::Args;
use slotwire_sdk::SlotwireConfig;

use crate::demos::Demo;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Demo composition to run.
    #[arg(value_enum)]
    pub demo: Demo,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the demo fails to assemble or resolve.
pub fn execute(args: RunArgs, config: SlotwireConfig) -> anyhow::Result<()> {
    let mut container = args.demo.container(config)?;
    let line = args.demo.run(&mut container)?;
    println!("{line}");
    Ok(())
}
