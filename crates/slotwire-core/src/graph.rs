//! Graph builder: resolved declarations as a node/edge dependency graph.
//!
//! Building a graph never fails. When resolution itself fails, every entry
//! is surfaced on its own instead of only the winners, so a broken
//! composition can still be inspected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use slotwire_common::constants::ROOT_SCOPE;

use crate::compose::resolve_scopes;
use crate::dependency::{Dependency, Kind, Module};
use crate::overrides::describe_provider;
use crate::resolve::{Entry, ResolvedScope, resolve_entries};
use crate::slot::{self, Slot};

/// A required or provided slot as shown in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphToken {
    #[serde(skip)]
    slot: Slot,
    /// Type label.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Name qualifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Group of a collector slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Requirement resolves to absent when unbound.
    pub optional: bool,
}

impl GraphToken {
    fn new(slot: Slot, optional: bool) -> Self {
        Self {
            type_name: slot.ty.to_string(),
            name: slot.name.clone(),
            group: slot.group.clone(),
            slot,
            optional,
        }
    }

    /// The slot this token stands for.
    #[must_use]
    pub const fn slot(&self) -> &Slot {
        &self.slot
    }

    /// Short label, e.g. `String name:db optional`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut parts = vec![self.type_name.clone()];
        if let Some(name) = &self.name {
            parts.push(format!("name:{name}"));
        }
        if let Some(group) = &self.group {
            parts.push(format!("group:{group}"));
        }
        if self.optional {
            parts.push("optional".to_string());
        }
        parts.join(" ")
    }
}

/// One provider or decorator entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderNode {
    /// Unique node id.
    pub id: String,
    /// Diagnostic key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Result type label.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Name qualifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Group, explicit or implied by a runnable result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Binding kind as displayed.
    pub kind: Kind,
    /// Owning module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Constructor identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor: Option<String>,
    /// Source file of the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line of the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Slots this node fills.
    pub provides: Vec<GraphToken>,
    /// Slots this node consumes.
    pub requires: Vec<GraphToken>,
}

/// Placeholder for a required slot with no producer.
#[derive(Debug, Clone, Serialize)]
pub struct MissingNode {
    /// Node id, `missing:{type}|{name}|{group}`.
    pub id: String,
    /// The unresolved requirement.
    pub token: GraphToken,
}

/// Consumer to producer edge for one requirement.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderEdge {
    /// Consuming node.
    pub from: String,
    /// Producing node, or the missing placeholder.
    pub to: String,
    /// The requirement.
    pub token: GraphToken,
    /// No producer exists and `to` is a placeholder.
    pub missing: bool,
}

/// A dependency graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    /// Providers first, then decorators.
    pub providers: Vec<ProviderNode>,
    /// One placeholder per distinct unresolved slot.
    pub missing: Vec<MissingNode>,
    /// Edges in node and requirement order.
    pub edges: Vec<ProviderEdge>,
}

impl Graph {
    /// Node ids, sorted.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ProviderNode> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Edges leaving a node.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ProviderEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Projects the graph into a `petgraph` graph, placeholders included.
    ///
    /// Node weights are ids, edge weights are requirement labels.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<String, String> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();
        for id in self
            .providers
            .iter()
            .map(|p| p.id.as_str())
            .chain(self.missing.iter().map(|m| m.id.as_str()))
        {
            let _ = index.entry(id).or_insert_with(|| graph.add_node(id.to_string()));
        }
        for edge in &self.edges {
            let endpoints = (index.get(edge.from.as_str()), index.get(edge.to.as_str()));
            if let (Some(&from), Some(&to)) = endpoints {
                let _ = graph.add_edge(from, to, edge.token.label());
            }
        }
        graph
    }
}

/// Builds the graph of a flat declaration list.
///
/// Only winners and decorators are shown when the list resolves. Otherwise
/// every declaration is shown.
#[must_use]
pub fn build_graph(dependencies: &[Dependency]) -> Graph {
    let entries = Entry::enumerate(dependencies, None);
    match resolve_entries(&entries) {
        Ok(resolved) => build_from_entries(&resolved.providers, &resolved.decorators),
        Err(err) => {
            tracing::warn!(error = %err, "resolution failed, graph shows unresolved entries");
            let (providers, decorators) = split_entries(&entries);
            build_from_entries(&providers, &decorators)
        }
    }
}

/// Builds the root graph and one graph per module.
///
/// A module graph shows what the module's own consumers observe: the
/// global winners, the module's private providers displayed as
/// replacements, the global decorators and the module's decorators.
/// Global decorators never rewrite a slot the module binds privately.
#[must_use]
pub fn graph_modules(dependencies: &[Dependency], modules: &[Module]) -> BTreeMap<String, Graph> {
    let mut graphs = BTreeMap::new();
    let scopes = match resolve_scopes(dependencies, modules) {
        Ok(scopes) => scopes,
        Err(err) => {
            tracing::warn!(error = %err, "composition failed, graphing root declarations only");
            let _ = graphs.insert(ROOT_SCOPE.to_string(), build_graph(dependencies));
            return graphs;
        }
    };

    let global = &scopes.global;
    let _ = graphs.insert(
        ROOT_SCOPE.to_string(),
        build_from_entries(&global.providers, &global.decorators),
    );

    for (name, local) in &scopes.locals {
        let entries = module_graph_entries(global, local);
        let mut decorators: Vec<Entry> = global
            .decorators
            .iter()
            .filter(|entry| !shadowed_decorator(entry, &local.private_slots))
            .cloned()
            .collect();
        decorators.extend(local.decorators.iter().cloned());
        let private_slots = &local.private_slots;
        let applies = |entry: &Entry, slot: &Slot| {
            entry.module.is_some() || !private_slots.contains(slot)
        };
        let graph = match resolve_entries(&entries) {
            Ok(resolved) => build_scoped(&resolved.providers, &decorators, applies),
            Err(err) => {
                tracing::warn!(module = %name, error = %err, "module graph shows unresolved entries");
                let (providers, extra) = split_entries(&entries);
                decorators.extend(extra);
                build_scoped(&providers, &decorators, applies)
            }
        };
        let _ = graphs.insert(name.clone(), graph);
    }

    graphs
}

/// Global winners plus the module's private winners, relabeled as
/// replacements so they out-rank the global winners of the same slot.
fn module_graph_entries(global: &ResolvedScope, local: &ResolvedScope) -> Vec<Entry> {
    let privates: Vec<&Entry> = local
        .providers
        .iter()
        .filter(|e| e.dependency.is_private())
        .collect();

    let mut entries: Vec<Entry> = global
        .providers
        .iter()
        .filter(|entry| !shadowed(entry, &local.private_slots))
        .cloned()
        .collect();

    for entry in privates {
        let mut shown = entry.clone();
        let singular_only = slot::dependency_slots(&shown.dependency)
            .is_ok_and(|slots| slots.iter().all(|s| !s.is_collector()));
        if singular_only {
            shown.dependency.set_kind(Kind::Replace);
        }
        shown.dependency.clear_private();
        entries.push(shown);
    }
    entries
}

/// Whether every slot of a global provider is taken by a private winner.
fn shadowed(entry: &Entry, private_slots: &BTreeSet<Slot>) -> bool {
    slot::dependency_slots(&entry.dependency).is_ok_and(|slots| {
        !slots.is_empty() && slots.iter().all(|s| private_slots.contains(s))
    })
}

/// Whether every target of a global decorator is taken by a private
/// winner. Such a decorator never runs for the module's consumers.
fn shadowed_decorator(entry: &Entry, private_slots: &BTreeSet<Slot>) -> bool {
    slot::decorator_slots(&entry.dependency).is_ok_and(|slots| {
        !slots.is_empty() && slots.iter().all(|s| private_slots.contains(s))
    })
}

/// Separates providers from decorators without resolving anything.
fn split_entries(entries: &[Entry]) -> (Vec<Entry>, Vec<Entry>) {
    entries.iter().cloned().partition(|e| !e.is_decorator())
}

fn build_from_entries(providers: &[Entry], decorators: &[Entry]) -> Graph {
    build_scoped(providers, decorators, |_, _| true)
}

/// Builds a graph where `applies` decides whether a decorator joins the
/// chain of one of its target slots.
fn build_scoped(
    providers: &[Entry],
    decorators: &[Entry],
    applies: impl Fn(&Entry, &Slot) -> bool,
) -> Graph {
    let mut nodes = Vec::with_capacity(providers.len() + decorators.len());
    let mut base_by_slot: HashMap<Slot, Vec<String>> = HashMap::new();
    let mut chains: BTreeMap<Slot, Vec<String>> = BTreeMap::new();

    for entry in providers.iter().filter(|e| !e.is_decorator()) {
        let node = provider_node(entry, provide_tokens(&entry.dependency));
        for token in &node.provides {
            base_by_slot
                .entry(token.slot.clone())
                .or_default()
                .push(node.id.clone());
        }
        nodes.push(node);
    }

    for entry in decorators.iter().filter(|e| e.is_decorator()) {
        let targets = slot::decorator_slots(&entry.dependency).unwrap_or_default();
        let provides = targets.iter().cloned().map(|s| GraphToken::new(s, false)).collect();
        let node = provider_node(entry, provides);
        for target in targets.into_iter().filter(|t| applies(entry, t)) {
            chains.entry(target).or_default().push(node.id.clone());
        }
        nodes.push(node);
    }

    let index = DecorationIndex::thread(&base_by_slot, &chains);
    let (edges, missing) = build_edges(&nodes, &index);
    Graph {
        providers: nodes,
        missing,
        edges,
    }
}

/// Producer lookup with decorator chains threaded in.
struct DecorationIndex {
    /// Current producers of each slot after every decorator.
    current: HashMap<Slot, Vec<String>>,
    /// What each decorator consumes for the slot it rewrites.
    previous: HashMap<(String, Slot), Vec<String>>,
}

impl DecorationIndex {
    fn thread(base: &HashMap<Slot, Vec<String>>, chains: &BTreeMap<Slot, Vec<String>>) -> Self {
        let mut current = base.clone();
        let mut previous = HashMap::new();
        for (target, chain) in chains {
            if target.is_collector() || chain.is_empty() {
                continue;
            }
            let mut prev = base.get(target).cloned().unwrap_or_default();
            for decorator in chain {
                let _ = previous.insert((decorator.clone(), target.clone()), prev);
                prev = vec![decorator.clone()];
            }
            let _ = current.insert(target.clone(), prev);
        }
        Self { current, previous }
    }

    fn producers(&self, node: &ProviderNode, slot: &Slot) -> &[String] {
        if node.kind == Kind::Decorate {
            if let Some(prev) = self.previous.get(&(node.id.clone(), slot.clone())) {
                return prev;
            }
        }
        self.current.get(slot).map(Vec::as_slice).unwrap_or_default()
    }
}

fn build_edges(
    nodes: &[ProviderNode],
    index: &DecorationIndex,
) -> (Vec<ProviderEdge>, Vec<MissingNode>) {
    let mut edges = Vec::new();
    let mut missing = Vec::new();
    let mut seen_missing = HashSet::new();

    for node in nodes {
        for token in &node.requires {
            let producers = index.producers(node, &token.slot);
            if producers.is_empty() {
                let id = missing_id(token);
                if seen_missing.insert(id.clone()) {
                    missing.push(MissingNode {
                        id: id.clone(),
                        token: token.clone(),
                    });
                }
                edges.push(ProviderEdge {
                    from: node.id.clone(),
                    to: id,
                    token: token.clone(),
                    missing: true,
                });
                continue;
            }
            for producer in producers {
                edges.push(ProviderEdge {
                    from: node.id.clone(),
                    to: producer.clone(),
                    token: token.clone(),
                    missing: false,
                });
            }
        }
    }
    (edges, missing)
}

fn missing_id(token: &GraphToken) -> String {
    format!(
        "missing:{}|{}|{}",
        token.type_name,
        token.name.as_deref().unwrap_or_default(),
        token.group.as_deref().unwrap_or_default()
    )
}

fn provider_node(entry: &Entry, provides: Vec<GraphToken>) -> ProviderNode {
    let dep = &entry.dependency;
    let info = describe_provider(dep, entry.index);
    ProviderNode {
        id: node_id(entry, info.constructor.as_deref()),
        key: dep.key().map(str::to_string),
        type_name: info.type_name,
        name: info.name,
        group: info.group,
        kind: dep.kind(),
        module: entry.module.clone(),
        constructor: info.constructor,
        file: info.file,
        line: info.line,
        provides,
        requires: require_tokens(dep),
    }
}

/// Unique node id. Keys repeat across provide/replace pairs, so the index
/// is always part of the id, and so is the module for module entries.
fn node_id(entry: &Entry, constructor: Option<&str>) -> String {
    let scope = entry
        .module
        .as_deref()
        .map_or_else(String::new, |m| format!("@{m}"));
    let index = entry.index;
    match (entry.dependency.key(), constructor) {
        (Some(key), _) => format!("key:{key}{scope}#{index}"),
        (None, Some(ctor)) => format!("ctor:{ctor}{scope}#{index}"),
        (None, None) => format!("dep{scope}:{index}"),
    }
}

fn provide_tokens(dep: &Dependency) -> Vec<GraphToken> {
    let slots = slot::dependency_slots(dep).unwrap_or_else(|_| {
        let group = dep.effective_group();
        dep.exposed_types()
            .into_iter()
            .map(|ty| Slot::new(ty, dep.name(), group))
            .collect()
    });
    slots.into_iter().map(|s| GraphToken::new(s, false)).collect()
}

fn require_tokens(dep: &Dependency) -> Vec<GraphToken> {
    dep.constructor()
        .map(|ctor| {
            ctor.signature()
                .requirements()
                .map(|field| GraphToken::new(Slot::from_field(field), field.optional))
                .collect()
        })
        .unwrap_or_default()
}
