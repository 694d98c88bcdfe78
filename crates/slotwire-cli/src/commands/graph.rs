//! `slotwire graph`: Render the dependency graph of a demo.

use clap::{Args, ValueEnum};
use slotwire_sdk::SlotwireConfig;

use crate::demos::Demo;

/// Output format for rendered graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT document.
    Dot,
    /// Pretty-printed JSON of the graph model.
    Json,
}

/// Arguments for the `graph` command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Demo composition to render.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Output format.
    #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
    pub format: GraphFormat,

    /// Render the view of one module instead of the root scope.
    #[arg(long)]
    pub module: Option<String>,
}

/// Executes the `graph` command.
///
/// Builds the demo container and prints its root graph, or the graph of
/// the requested module scope.
///
/// # Errors
///
/// Returns an error if the demo fails to assemble, the module is unknown,
/// or JSON serialization fails.
pub fn execute(args: GraphArgs, config: SlotwireConfig) -> anyhow::Result<()> {
    let container = args.demo.container(config)?;
    let graph = match &args.module {
        Some(module) => container
            .graph_modules()
            .remove(module)
            .ok_or_else(|| anyhow::anyhow!("module not found: {module}"))?,
        None => container.graph(),
    };

    let rendered = match args.format {
        GraphFormat::Dot => graph.render_dot(&container.config().graph),
        GraphFormat::Json => serde_json::to_string_pretty(&graph)?,
    };
    tracing::debug!(
        demo = args.demo.name(),
        providers = graph.providers.len(),
        missing = graph.missing.len(),
        "graph rendered"
    );
    println!("{}", rendered.trim_end());
    Ok(())
}
