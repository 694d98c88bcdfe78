//! Integration tests for the public container API.
//!
//! These tests use only what `slotwire-sdk` re-exports, the way an
//! application wires itself:
//! 1. Register declarations, modules and matchings on a builder
//! 2. Validate, then resolve values through the container
//! 3. Inspect graphs and override reports

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use slotwire_sdk::{
    Constructor, ContainerBuilder, ContainerState, Dependency, FieldDescriptor, FieldReader,
    FieldWriter, In, InRecord, Interface, Matching, Module, OutRecord, Runnable, SlotwireError,
    decorate, provide, replace,
};

// ── Fixtures ─────────────────────────────────────────────────────────

trait Greeter: Send + Sync {
    fn greet(&self, who: &str) -> String;
}

#[derive(Clone)]
struct English;

impl Greeter for English {
    fn greet(&self, who: &str) -> String {
        format!("hello {who}")
    }
}

struct Listeners {
    primary: String,
    extra: Vec<u16>,
}

impl OutRecord for Listeners {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::named::<String>("primary"),
            FieldDescriptor::grouped::<u16>("ports").flatten(),
        ]
    }

    fn into_fields(self, out: &mut FieldWriter) {
        out.value(self.primary);
        out.spread(self.extra);
    }
}

struct Ports {
    primary: String,
    ports: Vec<u16>,
}

impl InRecord for Ports {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::named::<String>("primary"),
            FieldDescriptor::grouped::<u16>("ports"),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> slotwire_sdk::Result<Self> {
        Ok(Self {
            primary: fields.value()?,
            ports: fields.group()?,
        })
    }
}

struct Primary(String);

impl InRecord for Primary {
    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::named::<String>("primary")]
    }

    fn from_fields(fields: &mut FieldReader) -> slotwire_sdk::Result<Self> {
        Ok(Self(fields.value()?))
    }
}

impl OutRecord for Primary {
    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::named::<String>("primary")]
    }

    fn into_fields(self, out: &mut FieldWriter) {
        out.value(self.0);
    }
}

// ── Registration ─────────────────────────────────────────────────────

#[test]
fn duplicate_provide_fails_at_build() {
    let err = ContainerBuilder::new()
        .dependency(provide(|| "a".to_string()))
        .dependency(provide(|| "b".to_string()))
        .build()
        .unwrap_err();
    assert!(matches!(err, SlotwireError::DuplicateProvider { .. }), "got: {err}");
}

#[test]
fn replace_overrides_provide() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| "prod".to_string()))
        .dependency(replace(|| "test".to_string()))
        .build()
        .expect("should build");
    assert_eq!(container.resolve::<String>().expect("resolve"), "test");
}

#[test]
fn provide_is_transactional() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| 1_u8))
        .build()
        .expect("should build");

    let err = container
        .provide([provide(|| 2_u16), provide(|| 3_u8)])
        .unwrap_err();
    assert!(matches!(err, SlotwireError::DuplicateProvider { .. }), "got: {err}");
    assert_eq!(container.dependencies().len(), 1);

    container.provide([provide(|| 2_u16)]).expect("should provide");
    assert_eq!(container.resolve::<u16>().expect("resolve"), 2);
}

#[test]
fn name_and_group_together_are_rejected() {
    let err = ContainerBuilder::new()
        .dependency(provide(|| 1_u8).with_name("one").with_group("nums"))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("name cannot be combined"), "got: {err}");
}

#[test]
fn runnable_with_group_is_rejected() {
    let err = ContainerBuilder::new()
        .dependency(provide(Runnable::new).with_group("workers"))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("runnable"), "got: {err}");
}

// ── Decorators ───────────────────────────────────────────────────────

#[test]
fn decorate_requires_a_base() {
    let err = ContainerBuilder::new()
        .dependency(decorate(|s: String| s + "!"))
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot decorate slot String: no provider");
}

#[test]
fn decorate_rewrites_the_value() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| "base".to_string()))
        .dependency(decorate(|s: String| s + "!"))
        .build()
        .expect("should build");
    assert_eq!(container.resolve::<String>().expect("resolve"), "base!");
}

#[test]
fn record_decorator_targets_named_slot() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| "db".to_string()).with_name("primary"))
        .dependency(provide(|| "plain".to_string()))
        .dependency(Dependency::decorate(Constructor::record(
            |primary: In<Primary>| Primary(primary.into_inner().0.to_uppercase()),
        )))
        .build()
        .expect("should build");
    let primary: String = container.resolve_named("primary").expect("named");
    assert_eq!(primary, "DB");
    assert_eq!(container.resolve::<String>().expect("plain"), "plain");
}

// ── Groups and records ───────────────────────────────────────────────

#[test]
fn group_collects_every_contribution() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| 1_i32).with_group("nums"))
        .dependency(provide(|| 2_i32).with_group("nums"))
        .build()
        .expect("should build");
    assert_eq!(container.group::<i32>("nums").expect("group"), vec![1, 2]);
    assert!(container.group::<i32>("other").expect("empty").is_empty());
}

#[test]
fn output_record_feeds_named_and_flattened_group() {
    let mut container = ContainerBuilder::new()
        .dependency(Dependency::new(Constructor::record(|| Listeners {
            primary: "api".into(),
            extra: vec![8080, 8081],
        })))
        .dependency(provide(|| 9090_u16).with_group("ports"))
        .build()
        .expect("should build");

    let summary = container
        .invoke(|ports: In<Ports>| {
            let ports = ports.into_inner();
            format!("{}:{:?}", ports.primary, ports.ports)
        })
        .expect("should invoke");
    assert_eq!(summary, "api:[8080, 8081, 9090]");
}

#[test]
fn runnables_are_collected_in_order() {
    let started = Arc::new(AtomicUsize::new(0));
    let first = Arc::clone(&started);
    let second = Arc::clone(&started);
    let mut container = ContainerBuilder::new()
        .dependency(provide(move || {
            let counter = Arc::clone(&first);
            Runnable::new().on_start(move || {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }))
        .dependency(provide(move || {
            let counter = Arc::clone(&second);
            Runnable::new().on_start(move || {
                let _ = counter.fetch_add(10, Ordering::SeqCst);
                Ok(())
            })
        }))
        .build()
        .expect("should build");

    let runnables = container.runnables().expect("runnables");
    assert_eq!(runnables.len(), 2);
    for runnable in &runnables {
        runnable.start().expect("should start");
    }
    assert_eq!(started.load(Ordering::SeqCst), 11);
}

// ── Modules and matchings ────────────────────────────────────────────

#[test]
fn private_provider_is_visible_only_in_its_module() {
    let mut container = ContainerBuilder::new()
        .module(Module::new(
            "users",
            vec![provide(|| "users-db".to_string()).private()],
        ))
        .build()
        .expect("should build");

    let inside = container.invoke_in("users", |db: String| db);
    assert_eq!(inside.expect("module should see private"), "users-db");

    let err = container.invoke(|db: String| db).unwrap_err();
    assert!(err.to_string().contains("missing dependency String"), "got: {err}");
}

#[test]
fn matchings_expose_interfaces() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| English))
        .matchings([Matching::new::<English>(vec![Interface::new::<
            English,
            Arc<dyn Greeter>,
        >(|english| {
            Arc::new(english) as Arc<dyn Greeter>
        })])])
        .build()
        .expect("should build");

    let greeting = container
        .invoke(|greeter: Arc<dyn Greeter>| greeter.greet("world"))
        .expect("should invoke");
    assert_eq!(greeting, "hello world");
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn provide_after_activation_fails_but_keeps_bindings() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| 4_u8))
        .build()
        .expect("should build");
    assert_eq!(container.resolve::<u8>().expect("resolve"), 4);
    assert_eq!(container.state(), ContainerState::Active);

    let err = container.provide([provide(|| 5_u16)]).unwrap_err();
    assert!(
        err.to_string().contains("cannot provide after container has been started"),
        "got: {err}"
    );
    assert_eq!(container.resolve::<u8>().expect("still usable"), 4);
}

#[test]
fn validate_reports_missing_without_activating() {
    let container = ContainerBuilder::new()
        .dependency(provide(|n: u32| n.to_string()))
        .build()
        .expect("should build");
    let err = container.validate().unwrap_err();
    assert!(err.to_string().contains("missing dependency u32"), "got: {err}");
    assert_eq!(container.state(), ContainerState::Assembling);
}

#[test]
fn validate_wraps_module_errors() {
    let container = ContainerBuilder::new()
        .module(Module::new(
            "users",
            vec![provide(|n: u32| n.to_string()).private()],
        ))
        .build()
        .expect("should build");
    let err = container.validate().unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("module users: missing dependency u32"), "got: {msg}");
}

#[test]
fn validate_never_constructs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let container = ContainerBuilder::new()
        .dependency(provide(move || {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            1_u8
        }))
        .dependency(provide(|n: u8| u16::from(n)))
        .build()
        .expect("should build");
    container.validate().expect("should validate");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ── Diagnostics ──────────────────────────────────────────────────────

#[test]
fn graph_serializes_to_json() {
    let container = ContainerBuilder::new()
        .dependency(provide(|| 1_u8).with_key("one"))
        .dependency(provide(|n: u8, port: u16| format!("{n}:{port}")).with_key("fmt"))
        .build()
        .expect("should build");

    let json = serde_json::to_value(container.graph()).expect("should serialize");
    assert_eq!(json["providers"].as_array().expect("providers").len(), 2);
    assert_eq!(json["providers"][0]["kind"], "provide");
    assert_eq!(json["missing"].as_array().expect("missing").len(), 1);
}

#[test]
fn graph_links_self_requirement_to_itself() {
    let container = ContainerBuilder::new()
        .dependency(provide(|s: String| s + "!").with_key("wrap"))
        .build()
        .expect("should build");
    let graph = container.graph();
    assert!(graph.missing.is_empty());
    let targets: Vec<_> = graph.edges_from("key:wrap#0").map(|e| e.to.as_str()).collect();
    assert_eq!(targets, vec!["key:wrap#0"]);
}

#[test]
fn module_graph_matches_engine_for_private_shadow() {
    let mut container = ContainerBuilder::new()
        .dependency(provide(|| "root".to_string()).with_key("root"))
        .dependency(decorate(|s: String| s + "!").with_key("bang"))
        .module(Module::new(
            "m",
            vec![
                provide(|| "mine".to_string()).private().with_key("mine"),
                provide(|s: String| s.len()).private().with_key("len"),
            ],
        ))
        .build()
        .expect("should build");

    let graphs = container.graph_modules();
    let module = &graphs["m"];
    let id_of = |key: &str| {
        module
            .providers
            .iter()
            .find(|n| n.key.as_deref() == Some(key))
            .map(|n| n.id.clone())
            .expect("node should exist")
    };
    let targets: Vec<_> = module.edges_from(&id_of("len")).map(|e| e.to.clone()).collect();
    assert_eq!(targets, vec![id_of("mine")]);
    assert!(module.providers.iter().all(|n| n.key.as_deref() != Some("bang")));

    let inside = container.invoke_in("m", |s: String, n: usize| format!("{s}:{n}"));
    assert_eq!(inside.expect("module value"), "mine:4");
    assert_eq!(container.resolve::<String>().expect("root value"), "root!");
}

#[test]
fn graph_dot_has_header() {
    let container = ContainerBuilder::new()
        .dependency(provide(|| 1_u8))
        .build()
        .expect("should build");
    let dot = container.graph_dot();
    assert!(dot.starts_with("digraph DI {"), "got: {dot}");
    assert!(dot.contains("rankdir=LR;"), "got: {dot}");
}

#[test]
fn overrides_are_reported() {
    let container = ContainerBuilder::new()
        .dependency(provide(|| "prod".to_string()).with_key("cfg"))
        .dependency(replace(|| "test".to_string()).with_key("cfg-test"))
        .build()
        .expect("should build");
    let overrides = container.overrides();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].previous.index, 0);
    assert_eq!(overrides[0].next.index, 1);
}
