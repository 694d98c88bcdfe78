//! DOT (Graphviz) projection of a [`Graph`].

use std::fmt::Write as _;

use slotwire_common::config::GraphConfig;
use slotwire_common::constants::{DEFAULT_RANKDIR, DOT_GRAPH_NAME, RANKDIRS};

use crate::dependency::Kind;
use crate::graph::{Graph, ProviderNode};

impl Graph {
    /// Renders the graph with default settings.
    #[must_use]
    pub fn to_dot(&self) -> String {
        self.render_dot(&GraphConfig::default())
    }

    /// Renders the graph as a DOT document.
    ///
    /// Decorators are dashed ellipses, replacements are bold boxes and
    /// missing placeholders are dashed diamonds. Optional requirements are
    /// drawn as dashed edges.
    #[must_use]
    pub fn render_dot(&self, config: &GraphConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {DOT_GRAPH_NAME} {{");
        let _ = writeln!(out, "  rankdir={};", rankdir(config));
        let _ = writeln!(out, "  node [fontname=\"{}\"];", escape(&config.font));

        for node in &self.providers {
            let (shape, style) = match node.kind {
                Kind::Decorate => ("ellipse", "dashed"),
                Kind::Replace => ("box", "bold"),
                Kind::Provide => ("box", "solid"),
            };
            let _ = writeln!(
                out,
                "  \"{}\" [shape={shape} style={style} label=\"{}\"];",
                escape(&node.id),
                escape(&node_label(node, config.show_locations)),
            );
        }

        for missing in &self.missing {
            let _ = writeln!(
                out,
                "  \"{}\" [shape=diamond style=dashed label=\"{}\"];",
                escape(&missing.id),
                escape(&missing.token.label()),
            );
        }

        for edge in &self.edges {
            let style = if edge.token.optional { "dashed" } else { "solid" };
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\" style={style}];",
                escape(&edge.from),
                escape(&edge.to),
                escape(&edge.token.label()),
            );
        }

        out.push_str("}\n");
        out
    }
}

/// The configured layout direction, or the default when it is not one
/// DOT accepts.
fn rankdir(config: &GraphConfig) -> &str {
    if RANKDIRS.contains(&config.rankdir.as_str()) {
        &config.rankdir
    } else {
        tracing::warn!(rankdir = %config.rankdir, "unsupported rankdir, using default");
        DEFAULT_RANKDIR
    }
}

/// Multi-line node label. Lines are joined with a literal `\n` for DOT.
fn node_label(node: &ProviderNode, show_locations: bool) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(node.key.clone());
    parts.extend(node.type_name.clone());
    parts.extend(node.constructor.clone());
    if let Some(name) = &node.name {
        parts.push(format!("name:{name}"));
    }
    if let Some(group) = &node.group {
        parts.push(format!("group:{group}"));
    }
    if let Some(module) = &node.module {
        parts.push(format!("module:{module}"));
    }
    if node.kind != Kind::Provide {
        parts.push(format!("kind:{}", node.kind));
    }
    if show_locations {
        if let (Some(file), Some(line)) = (&node.file, node.line) {
            parts.push(format!("{file}:{line}"));
        }
    }
    parts.join("\\n")
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::Constructor;
    use crate::dependency::Dependency;
    use crate::graph::build_graph;

    fn sample() -> Graph {
        build_graph(&[
            Dependency::new(Constructor::new(|| "base".to_string())).with_key("base"),
            Dependency::decorate(Constructor::new(|s: String| s + "!")).with_key("bang"),
            Dependency::new(Constructor::new(|n: u32, s: String| format!("{s}{n}"))).with_key("fmt"),
        ])
    }

    #[test]
    fn header_uses_config() {
        let dot = sample().render_dot(&GraphConfig {
            rankdir: "TB".into(),
            ..GraphConfig::default()
        });
        assert!(dot.starts_with("digraph DI {\n  rankdir=TB;\n  node [fontname=\"Helvetica\"];\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn unsupported_rankdir_falls_back_to_default() {
        let dot = sample().render_dot(&GraphConfig {
            rankdir: "LR; evil=\"x\"".into(),
            ..GraphConfig::default()
        });
        assert!(dot.contains("  rankdir=LR;\n"), "got: {dot}");
        assert!(!dot.contains("evil"), "got: {dot}");
    }

    #[test]
    fn shapes_follow_kind() {
        let dot = sample().to_dot();
        assert!(dot.contains("\"key:bang#1\" [shape=ellipse style=dashed"), "got: {dot}");
        assert!(dot.contains("\"key:base#0\" [shape=box style=solid"), "got: {dot}");
        assert!(
            dot.contains("\"missing:u32||\" [shape=diamond style=dashed label=\"u32\"]"),
            "got: {dot}"
        );
        assert!(dot.contains("\"key:fmt#2\" -> \"key:bang#1\" [label=\"String\" style=solid];"));
        assert!(dot.contains("\"key:fmt#2\" -> \"missing:u32||\""));
    }

    #[test]
    fn locations_can_be_hidden() {
        let graph = sample();
        let with = graph.to_dot();
        let without = graph.render_dot(&GraphConfig {
            show_locations: false,
            ..GraphConfig::default()
        });
        assert!(with.contains("dot.rs:"));
        assert!(!without.contains("dot.rs:"));
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
