//! `slotwire validate`: Dry-run a demo composition.

use clap::Args;
use slotwire_sdk::SlotwireConfig;

use crate::demos::Demo;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Demo composition to validate.
    #[arg(value_enum)]
    pub demo: Demo,
}

/// Executes the `validate` command.
///
/// Checks that every provider and decorator in every scope could be
/// constructed. Nothing is constructed.
///
/// # Errors
///
/// Returns the first unsatisfiable requirement.
pub fn execute(args: ValidateArgs, config: SlotwireConfig) -> anyhow::Result<()> {
    let container = args.demo.container(config)?;
    container.validate()?;
    println!(
        "{}: {} dependencies, {} modules, ok",
        args.demo.name(),
        container.dependencies().len(),
        container.modules().len()
    );
    Ok(())
}
