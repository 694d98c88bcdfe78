//! Read-only views of a container: dependency graphs and overrides.
//!
//! None of these activate the container, and none of them fail: a
//! composition that does not resolve is still rendered, best effort.

use std::collections::BTreeMap;

use slotwire_common::constants::ROOT_SCOPE;
use slotwire_core::{Graph, OverrideInfo, build_graph, detect_overrides, graph_modules};

use crate::container::Container;

impl Container {
    /// Graph of what root consumers observe.
    #[must_use]
    pub fn graph(&self) -> Graph {
        self.graph_modules()
            .remove(ROOT_SCOPE)
            .unwrap_or_else(|| build_graph(&self.dependencies))
    }

    /// The root graph plus one graph per module, keyed by scope name.
    #[must_use]
    pub fn graph_modules(&self) -> BTreeMap<String, Graph> {
        graph_modules(&self.dependencies, &self.modules)
    }

    /// DOT rendering of [`Container::graph`], using the configured style.
    #[must_use]
    pub fn graph_dot(&self) -> String {
        self.graph().render_dot(&self.config.graph)
    }

    /// DOT rendering of every scope graph.
    #[must_use]
    pub fn graph_dot_modules(&self) -> BTreeMap<String, String> {
        self.graph_modules()
            .into_iter()
            .map(|(name, graph)| (name, graph.render_dot(&self.config.graph)))
            .collect()
    }

    /// Explicit replacements among the root declarations.
    #[must_use]
    pub fn overrides(&self) -> Vec<OverrideInfo> {
        detect_overrides(&self.dependencies)
    }
}
