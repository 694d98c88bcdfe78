//! `slotwire overrides`: List explicit replacements in a demo.

use clap::Args;
use slotwire_sdk::SlotwireConfig;

use crate::demos::Demo;
use crate::output::{describe_provider, heading};

/// Arguments for the `overrides` command.
#[derive(Args, Debug)]
pub struct OverridesArgs {
    /// Demo composition to inspect.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `overrides` command.
///
/// # Errors
///
/// Returns an error if the demo fails to assemble or JSON serialization
/// fails.
pub fn execute(args: OverridesArgs, config: SlotwireConfig) -> anyhow::Result<()> {
    let container = args.demo.container(config)?;
    let overrides = container.overrides();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overrides)?);
        return Ok(());
    }

    println!("{}", heading(&format!("Overrides in: {}", args.demo.name())));
    if overrides.is_empty() {
        println!("  No overrides.");
        return Ok(());
    }
    for info in &overrides {
        println!("  {}", info.key);
        println!("      was: {}", describe_provider(&info.previous));
        println!("      now: {}", describe_provider(&info.next));
    }
    println!();
    println!("  {} override(s).", overrides.len());
    Ok(())
}
