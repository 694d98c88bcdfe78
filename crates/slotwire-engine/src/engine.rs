//! Construction engine: scoped singletons, decorator chains and groups.
//!
//! Every provider is constructed at most once, inside the scope it was
//! installed from, and its outputs are shared by every consumer that can
//! see them. The value of a singular slot in a scope is the nearest
//! binding, decorated first by the decorators of the scope that owns the
//! binding and then by those of each scope below it.

use std::any::Any;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};

use slotwire_common::config::EngineConfig;
use slotwire_common::error::{Result, SlotwireError};
use slotwire_core::constructor::{Constructor, Consumer};
use slotwire_core::install::{Injector, Installation, OutputBinding, ScopeId};
use slotwire_core::signature::FieldDescriptor;
use slotwire_core::slot::Slot;
use slotwire_core::value::{AnyValue, Arguments, Fetched, Produced};

use crate::scope::{Binding, ROOT, ScopeTree, Step};

/// An installed provider or decorator and its outputs, once built.
struct Installed {
    installation: Installation,
    scope: usize,
    outputs: Option<Vec<Produced>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Provider(usize),
    Decorator(usize),
}

/// The reference injector.
///
/// Install a plan with [`slotwire_core::install`], then pull values out
/// with [`Engine::invoke`] or [`Engine::fetch`].
pub struct Engine {
    config: EngineConfig,
    scopes: ScopeTree,
    providers: Vec<Installed>,
    decorators: Vec<Installed>,
    visible: HashMap<(usize, Slot), AnyValue>,
    building: Vec<Node>,
}

impl Engine {
    /// Creates an empty engine with only the root scope.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            scopes: ScopeTree::new(),
            providers: Vec::new(),
            decorators: Vec::new(),
            visible: HashMap::new(),
            building: Vec::new(),
        }
    }

    /// Number of providers constructed so far.
    #[must_use]
    pub fn constructed(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| p.outputs.is_some())
            .count()
    }

    /// Resolves one requirement as seen from `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope is unknown, a required slot has no
    /// provider, or constructing it fails.
    pub fn fetch(&mut self, scope: &ScopeId, field: &FieldDescriptor) -> Result<Fetched> {
        let index = self.scopes.find(scope)?;
        self.fetch_in(index, field)
    }

    /// Calls `consumer` with its parameters resolved in `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter cannot be resolved, or if the
    /// consumer panics while panic recovery is enabled.
    pub fn invoke<C, Args>(&mut self, scope: &ScopeId, consumer: C) -> Result<C::Output>
    where
        C: Consumer<Args>,
    {
        let index = self.scopes.find(scope)?;
        let recover = self.config.recover_panics;
        let mut args = ScopeArgs {
            engine: self,
            scope: index,
        };
        if !recover {
            return consumer.consume(&mut args);
        }
        panic::catch_unwind(AssertUnwindSafe(move || consumer.consume(&mut args))).unwrap_or_else(
            |payload| {
                Err(SlotwireError::Panicked {
                    constructor: "invoke".to_string(),
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }

    /// Checks that `slot` would be satisfiable from `scope`, recursively,
    /// without constructing anything.
    ///
    /// Providers that were already constructed count as satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`SlotwireError::Missing`] for the first unsatisfiable
    /// requirement and [`SlotwireError::Cycle`] for a dependency cycle.
    pub fn check(&self, scope: &ScopeId, slot: &Slot) -> Result<()> {
        let index = self.scopes.find(scope)?;
        let mut visiting = Vec::new();
        self.check_slot(index, slot, false, "validate", &mut visiting)
    }

    fn fetch_in(&mut self, scope: usize, field: &FieldDescriptor) -> Result<Fetched> {
        let slot = Slot::from_field(field);
        if slot.is_collector() {
            return self.collect(scope, &slot).map(Fetched::Many);
        }
        match self.visible_value(scope, &slot)? {
            Some(value) => Ok(Fetched::One(value)),
            None if field.optional => Ok(Fetched::Absent),
            None => Err(SlotwireError::Missing {
                slot: slot.to_string(),
                consumer: self.consumer_label(),
            }),
        }
    }

    /// Every contribution to a collector, root scope first.
    fn collect(&mut self, scope: usize, slot: &Slot) -> Result<Vec<AnyValue>> {
        let mut values = Vec::new();
        for index in self.scopes.path(scope) {
            let bindings = self
                .scopes
                .get(index)
                .groups
                .get(slot)
                .cloned()
                .unwrap_or_default();
            for binding in bindings {
                let outputs = self.build_provider(binding.provider)?;
                match (binding.spread, outputs.get(binding.position)) {
                    (true, Some(Produced::Spread(items))) => {
                        for item in items {
                            values.push(cast(&binding, item, slot)?);
                        }
                    }
                    (false, Some(Produced::One(value))) => {
                        values.push(cast(&binding, value, slot)?);
                    }
                    _ => return Err(absent_output(slot)),
                }
            }
        }
        Ok(values)
    }

    /// Fully decorated value of a singular slot in a scope.
    fn visible_value(&mut self, scope: usize, slot: &Slot) -> Result<Option<AnyValue>> {
        let key = (scope, slot.clone());
        if let Some(value) = self.visible.get(&key) {
            return Ok(Some(value.clone()));
        }
        let stages = self.steps(scope, slot).len();
        let value = self.staged(scope, slot, stages)?;
        if let Some(value) = &value {
            let _ = self.visible.insert(key, value.clone());
        }
        Ok(value)
    }

    /// Value of a slot after the first `stage` decorators of `scope`.
    fn staged(&mut self, scope: usize, slot: &Slot, stage: usize) -> Result<Option<AnyValue>> {
        if stage == 0 {
            return self.undecorated(scope, slot);
        }
        let Some(step) = self.steps(scope, slot).get(stage - 1).copied() else {
            return self.undecorated(scope, slot);
        };
        let outputs = self.run_decorator(step.decorator)?;
        match outputs.get(step.position) {
            Some(Produced::One(value)) => Ok(Some(value.clone())),
            Some(Produced::Spread(_)) | None => Err(absent_output(slot)),
        }
    }

    /// Value entering the decorator chain of `scope`: the scope's own
    /// binding, or else the parent's fully decorated value.
    fn undecorated(&mut self, scope: usize, slot: &Slot) -> Result<Option<AnyValue>> {
        let own = self.scopes.get(scope).singles.get(slot).cloned();
        if let Some(binding) = own {
            let outputs = self.build_provider(binding.provider)?;
            return match outputs.get(binding.position) {
                Some(Produced::One(value)) => cast(&binding, value, slot).map(Some),
                Some(Produced::Spread(_)) | None => Err(absent_output(slot)),
            };
        }
        match self.scopes.get(scope).parent {
            Some(parent) => self.visible_value(parent, slot),
            None => Ok(None),
        }
    }

    fn steps(&self, scope: usize, slot: &Slot) -> Vec<Step> {
        self.scopes
            .get(scope)
            .decorators
            .get(slot)
            .cloned()
            .unwrap_or_default()
    }

    fn build_provider(&mut self, provider: usize) -> Result<Vec<Produced>> {
        if let Some(outputs) = &self.providers[provider].outputs {
            return Ok(outputs.clone());
        }
        let scope = self.providers[provider].scope;
        let constructor = self.providers[provider].installation.constructor()?.clone();
        let mut frame = self.enter(Node::Provider(provider))?;
        let recover = frame.config.recover_panics;
        let result = {
            let mut args = ScopeArgs {
                engine: &mut frame,
                scope,
            };
            call(recover, &constructor, &mut args)
        };
        drop(frame);
        let outputs = result?;
        tracing::debug!(
            constructor = %constructor.identity(),
            scope = %self.scopes.get(scope).id,
            "provider constructed"
        );
        self.providers[provider].outputs = Some(outputs.clone());
        Ok(outputs)
    }

    fn run_decorator(&mut self, decorator: usize) -> Result<Vec<Produced>> {
        if let Some(outputs) = &self.decorators[decorator].outputs {
            return Ok(outputs.clone());
        }
        let installed = &self.decorators[decorator];
        let scope = installed.scope;
        let targets = installed.installation.slots();
        let constructor = installed.installation.constructor()?.clone();
        let mut frame = self.enter(Node::Decorator(decorator))?;
        let recover = frame.config.recover_panics;
        let result = {
            let mut args = DecoratorArgs {
                engine: &mut frame,
                scope,
                decorator,
                targets,
            };
            call(recover, &constructor, &mut args)
        };
        drop(frame);
        let outputs = result?;
        tracing::debug!(
            constructor = %constructor.identity(),
            scope = %self.scopes.get(scope).id,
            "decorator applied"
        );
        self.decorators[decorator].outputs = Some(outputs.clone());
        Ok(outputs)
    }

    fn enter(&mut self, node: Node) -> Result<Frame<'_>> {
        if let Some(start) = self.building.iter().position(|n| *n == node) {
            let mut chain: Vec<String> = self.building[start..]
                .iter()
                .map(|n| self.label(*n))
                .collect();
            chain.push(self.label(node));
            return Err(SlotwireError::Cycle {
                path: chain.join(" -> "),
            });
        }
        self.building.push(node);
        Ok(Frame { engine: self })
    }

    fn installed(&self, node: Node) -> &Installed {
        match node {
            Node::Provider(index) => &self.providers[index],
            Node::Decorator(index) => &self.decorators[index],
        }
    }

    fn label(&self, node: Node) -> String {
        self.installed(node)
            .installation
            .constructor()
            .map_or_else(|_| "<no constructor>".to_string(), |c| c.identity().to_string())
    }

    fn consumer_label(&self) -> String {
        self.building
            .last()
            .map_or_else(|| "invoke".to_string(), |node| self.label(*node))
    }

    fn check_slot(
        &self,
        scope: usize,
        slot: &Slot,
        optional: bool,
        consumer: &str,
        visiting: &mut Vec<Node>,
    ) -> Result<()> {
        if slot.is_collector() {
            for index in self.scopes.path(scope) {
                if let Some(bindings) = self.scopes.get(index).groups.get(slot) {
                    for binding in bindings {
                        self.check_node(Node::Provider(binding.provider), visiting)?;
                    }
                }
            }
            return Ok(());
        }

        let Some((found, binding)) = self.scopes.lookup(scope, slot) else {
            if optional {
                return Ok(());
            }
            return Err(SlotwireError::Missing {
                slot: slot.to_string(),
                consumer: consumer.to_string(),
            });
        };
        self.check_node(Node::Provider(binding.provider), visiting)?;
        let below = self.scopes.path(scope).into_iter().skip_while(|&i| i != found);
        for index in below {
            for step in self.steps(index, slot) {
                self.check_node(Node::Decorator(step.decorator), visiting)?;
            }
        }
        Ok(())
    }

    fn check_node(&self, node: Node, visiting: &mut Vec<Node>) -> Result<()> {
        let installed = self.installed(node);
        if installed.outputs.is_some() {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|n| *n == node) {
            let mut chain: Vec<String> = visiting[start..].iter().map(|n| self.label(*n)).collect();
            chain.push(self.label(node));
            return Err(SlotwireError::Cycle {
                path: chain.join(" -> "),
            });
        }
        let constructor = installed.installation.constructor()?;
        let consumer = constructor.identity().to_string();
        let own = match node {
            Node::Decorator(_) => installed.installation.slots(),
            Node::Provider(_) => Vec::new(),
        };
        visiting.push(node);
        for field in constructor.signature().requirements() {
            let slot = Slot::from_field(field);
            if own.contains(&slot) {
                continue;
            }
            self.check_slot(installed.scope, &slot, field.optional, &consumer, visiting)?;
        }
        let _ = visiting.pop();
        Ok(())
    }
}

/// A node on the `building` stack. Popped on drop, including while a
/// constructor panic unwinds through it.
struct Frame<'a> {
    engine: &'a mut Engine,
}

impl Deref for Frame<'_> {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        self.engine
    }
}

impl DerefMut for Frame<'_> {
    fn deref_mut(&mut self) -> &mut Engine {
        self.engine
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let _ = self.engine.building.pop();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Injector for Engine {
    fn open_scope(&mut self, scope: &ScopeId) -> Result<()> {
        let _ = self.scopes.open(scope)?;
        tracing::debug!(scope = %scope, "scope opened");
        Ok(())
    }

    fn provide(&mut self, scope: &ScopeId, installation: &Installation) -> Result<()> {
        let home = self.scopes.find(scope)?;
        let target = if installation.options.export { ROOT } else { home };
        let provider = self.providers.len();
        let outputs = installation
            .bindings()
            .iter()
            .map(|output| (output.slot.clone(), binding(provider, output)))
            .collect();
        self.scopes.bind(target, outputs)?;
        self.providers.push(Installed {
            installation: installation.clone(),
            scope: home,
            outputs: None,
        });
        tracing::debug!(
            scope = %scope,
            index = installation.entry.index,
            export = installation.options.export,
            "provider installed"
        );
        Ok(())
    }

    fn decorate(&mut self, scope: &ScopeId, installation: &Installation) -> Result<()> {
        let index = self.scopes.find(scope)?;
        for output in installation.bindings() {
            if output.slot.is_collector() {
                return Err(SlotwireError::GroupMisuse {
                    slot: output.slot.to_string(),
                });
            }
            if self.scopes.lookup(index, &output.slot).is_none() {
                return Err(SlotwireError::DecorateWithoutBase {
                    slot: output.slot.to_string(),
                });
            }
        }
        let decorator = self.decorators.len();
        let target = self.scopes.get_mut(index);
        for output in installation.bindings() {
            target
                .decorators
                .entry(output.slot.clone())
                .or_default()
                .push(Step {
                    decorator,
                    position: output.position,
                });
        }
        self.decorators.push(Installed {
            installation: installation.clone(),
            scope: index,
            outputs: None,
        });
        tracing::debug!(scope = %scope, index = installation.entry.index, "decorator installed");
        Ok(())
    }
}

/// Arguments resolved in a scope.
struct ScopeArgs<'a> {
    engine: &'a mut Engine,
    scope: usize,
}

impl Arguments for ScopeArgs<'_> {
    fn fetch(&mut self, field: &FieldDescriptor) -> Result<Fetched> {
        self.engine.fetch_in(self.scope, field)
    }
}

/// Arguments of a decorator: its own targets resolve to the value just
/// before it in the chain, everything else resolves in its scope.
struct DecoratorArgs<'a> {
    engine: &'a mut Engine,
    scope: usize,
    decorator: usize,
    targets: Vec<Slot>,
}

impl Arguments for DecoratorArgs<'_> {
    fn fetch(&mut self, field: &FieldDescriptor) -> Result<Fetched> {
        let slot = Slot::from_field(field);
        if !self.targets.contains(&slot) {
            return self.engine.fetch_in(self.scope, field);
        }
        let stage = self
            .engine
            .steps(self.scope, &slot)
            .iter()
            .position(|s| s.decorator == self.decorator)
            .unwrap_or_default();
        match self.engine.staged(self.scope, &slot, stage)? {
            Some(value) => Ok(Fetched::One(value)),
            None if field.optional => Ok(Fetched::Absent),
            None => Err(SlotwireError::DecorateWithoutBase {
                slot: slot.to_string(),
            }),
        }
    }
}

fn binding(provider: usize, output: &OutputBinding) -> Binding {
    Binding {
        provider,
        position: output.position,
        cast: output.cast.clone(),
        spread: output.spread,
    }
}

fn cast(binding: &Binding, value: &AnyValue, slot: &Slot) -> Result<AnyValue> {
    match &binding.cast {
        None => Ok(value.clone()),
        Some(interface) => interface
            .apply(value)
            .ok_or_else(|| SlotwireError::TypeMismatch {
                slot: slot.to_string(),
                expected: interface.origin().to_string(),
            }),
    }
}

fn absent_output(slot: &Slot) -> SlotwireError {
    SlotwireError::TypeMismatch {
        slot: slot.to_string(),
        expected: "a declared output".to_string(),
    }
}

fn call(
    recover: bool,
    constructor: &Constructor,
    args: &mut dyn Arguments,
) -> Result<Vec<Produced>> {
    if !recover {
        return constructor.invoke(args);
    }
    panic::catch_unwind(AssertUnwindSafe(|| constructor.invoke(args))).unwrap_or_else(|payload| {
        Err(SlotwireError::Panicked {
            constructor: constructor.identity().to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
