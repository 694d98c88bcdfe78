//! CLI command definitions and dispatch.

pub mod graph;
pub mod overrides;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slotwire_sdk::SlotwireConfig;

/// slotwire: inspect dependency injection compositions.
#[derive(Parser, Debug)]
#[command(name = "slotwire", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON configuration file.
    #[arg(long, global = true, env = "SLOTWIRE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the dependency graph of a demo composition.
    Graph(graph::GraphArgs),
    /// List explicit replacements in a demo composition.
    Overrides(overrides::OverridesArgs),
    /// Dry-run every provider and decorator without constructing anything.
    Validate(validate::ValidateArgs),
    /// Resolve a demo composition and print what it produces.
    Run(run::RunArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command
/// fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Graph(args) => graph::execute(args, config),
        Command::Overrides(args) => overrides::execute(args, config),
        Command::Validate(args) => validate::execute(args, config),
        Command::Run(args) => run::execute(args, config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SlotwireConfig> {
    let Some(path) = path else {
        return Ok(SlotwireConfig::default());
    };
    let config = SlotwireConfig::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use clap::CommandFactory;

    use super::*;
    use crate::demos::Demo;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_graph_with_module_and_format() {
        let cli = Cli::try_parse_from([
            "slotwire", "graph", "modules", "--module", "users", "--format", "json",
        ])
        .expect("should parse");
        let Command::Graph(args) = cli.command else {
            unreachable!("expected graph command");
        };
        assert_eq!(args.demo, Demo::Modules);
        assert_eq!(args.module.as_deref(), Some("users"));
        assert_eq!(args.format, graph::GraphFormat::Json);
    }

    #[test]
    fn rejects_unknown_demo() {
        assert!(Cli::try_parse_from(["slotwire", "validate", "nope"]).is_err());
    }

    #[test]
    fn missing_config_path_defaults() {
        let config = load_config(None).expect("should default");
        assert_eq!(config, SlotwireConfig::default());
    }

    #[test]
    fn loads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"graph": {"rankdir": "TB"}}"#)
            .expect("write config");
        let config = load_config(Some(file.path())).expect("should load");
        assert_eq!(config.graph.rankdir, "TB");
    }

    #[test]
    fn unreadable_config_names_path() {
        let err = load_config(Some(Path::new("/nonexistent/slotwire.json"))).unwrap_err();
        assert!(
            err.to_string().contains("/nonexistent/slotwire.json"),
            "got: {err}"
        );
    }
}
