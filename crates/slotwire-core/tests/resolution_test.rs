//! Integration tests for declaration resolution, composition and graphs.
//!
//! These tests drive the public API the way a container does:
//! 1. Declare providers, replacements and decorators
//! 2. Resolve and compose root and module scopes
//! 3. Derive install plans, override reports and graphs

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use slotwire_common::error::SlotwireError;
use slotwire_common::types::TypeKey;
use slotwire_core::signature::FieldDescriptor;
use slotwire_core::value::{FieldReader, FieldWriter};
use slotwire_core::{
    Constructor, Dependency, In, InRecord, InstallPlan, Interface, Kind, Matching, Module,
    OutRecord, ScopeId, Slot, build_graph, compose, decorate, detect_overrides, graph_modules,
    provide, replace,
};

// ── Fixtures ─────────────────────────────────────────────────────────

trait Repository: Send + Sync {
    fn table(&self) -> &str;
}

#[derive(Clone)]
struct Postgres;

impl Repository for Postgres {
    fn table(&self) -> &str {
        "users"
    }
}

struct Endpoints {
    primary: String,
    replicas: Vec<String>,
}

impl OutRecord for Endpoints {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::named::<String>("primary"),
            FieldDescriptor::grouped::<String>("replicas").flatten(),
        ]
    }

    fn into_fields(self, out: &mut FieldWriter) {
        out.value(self.primary);
        out.spread(self.replicas);
    }
}

struct Pool {
    primary: String,
    replicas: Vec<String>,
}

impl InRecord for Pool {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::named::<String>("primary"),
            FieldDescriptor::grouped::<String>("replicas"),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> slotwire_common::error::Result<Self> {
        Ok(Self {
            primary: fields.value()?,
            replicas: fields.group()?,
        })
    }
}

fn endpoints() -> Dependency {
    Dependency::new(Constructor::record(|| Endpoints {
        primary: "pg-0".into(),
        replicas: vec!["pg-1".into(), "pg-2".into()],
    }))
}

fn string_slot() -> Slot {
    Slot::of::<String>()
}

// ── Resolution ───────────────────────────────────────────────────────

#[test]
fn duplicate_unqualified_providers_name_the_slot() {
    let err = compose(&[provide(|| "a".to_string()), provide(|| "b".to_string())], &[])
        .unwrap_err();
    assert!(matches!(err, SlotwireError::DuplicateProvider { .. }));
    assert_eq!(err.to_string(), "duplicate provider for slot String");
}

#[test]
fn provide_and_replace_never_conflict() {
    let composition = compose(
        &[
            replace(|| "replacement".to_string()).with_key("cfg"),
            provide(|| "default".to_string()).with_key("cfg"),
        ],
        &[],
    )
    .expect("should compose");
    let winner = composition.global.winner(&string_slot()).expect("winner");
    assert_eq!(winner.index, 0);
}

#[test]
fn named_slots_are_independent() {
    let composition = compose(
        &[
            provide(|| "a".to_string()).with_name("a"),
            provide(|| "b".to_string()).with_name("b"),
            provide(|| "plain".to_string()),
        ],
        &[],
    )
    .expect("named slots should not conflict");
    assert_eq!(composition.global.slots.len(), 3);
}

#[test]
fn group_contributions_never_conflict() {
    let composition = compose(
        &[
            provide(|| 1_i32).with_group("nums"),
            provide(|| 2_i32).with_group("nums"),
            replace(|| 3_i32),
        ],
        &[],
    )
    .expect("groups should not conflict");
    let group = Slot::new(TypeKey::of::<i32>(), None, Some("nums"));
    assert_eq!(composition.global.groups[&group].len(), 2);
}

#[test]
fn output_record_fills_named_and_group_slots() {
    let composition = compose(&[endpoints()], &[]).expect("should compose");
    let primary = Slot::new(TypeKey::of::<String>(), Some("primary"), None);
    let replicas = Slot::new(TypeKey::of::<String>(), None, Some("replicas"));
    assert!(composition.global.provides(&primary));
    assert!(composition.global.provides(&replicas));

    let plan = InstallPlan::from_composition(&composition).expect("plan");
    let bindings = plan.scopes[0].providers[0].bindings();
    assert!(bindings[1].spread);
}

#[test]
fn matching_exposes_interface_instead_of_concrete_type() {
    let matching = Matching::new::<Postgres>(vec![Interface::new::<Postgres, Arc<dyn Repository>>(
        |pg| Arc::new(pg) as Arc<dyn Repository>,
    )]);
    let mut dep = provide(|| Postgres);
    assert!(dep.apply_matching(&matching));

    let composition = compose(&[dep], &[]).expect("should compose");
    assert!(composition.global.provides(&Slot::of::<Arc<dyn Repository>>()));
    assert!(!composition.global.provides(&Slot::of::<Postgres>()));
}

#[test]
fn fallible_constructor_with_error_channel_is_valid() {
    let dep = Dependency::new(Constructor::fallible(|| -> Result<u16, std::io::Error> {
        Ok(8080)
    }));
    assert!(dep.error().is_none());
    assert!(compose(&[dep], &[]).is_ok());
}

// ── Modules ──────────────────────────────────────────────────────────

#[test]
fn private_provider_is_invisible_outside_its_module() {
    let modules = [
        Module::new("users", vec![provide(|| "secret".to_string()).private()]),
        Module::new("billing", Vec::new()),
    ];
    let composition = compose(&[], &modules).expect("should compose");

    assert!(composition.global.winner(&string_slot()).is_none());
    assert!(composition.module("users").expect("users").view.contains_key(&string_slot()));
    assert!(!composition.module("billing").expect("billing").view.contains_key(&string_slot()));
}

#[test]
fn export_shadow_keeps_private_value_local() {
    let modules = [Module::new(
        "users",
        vec![
            provide(|| "exported".to_string()).with_key("exported"),
            provide(|| "private".to_string()).with_key("private").private(),
        ],
    )];
    let composition = compose(&[], &modules).expect("should compose");

    let global = composition.global.winner(&string_slot()).expect("global winner");
    assert_eq!(global.index, 0);
    let users = composition.module("users").expect("users");
    assert_eq!(users.view[&string_slot()].index, 1);

    let plan = InstallPlan::from_composition(&composition).expect("plan");
    let scope = plan.scope(&ScopeId::Module("users".into())).expect("users scope");
    let exports: Vec<bool> = scope.providers.iter().map(|i| i.options.export).collect();
    assert_eq!(exports, vec![true, false]);
}

#[test]
fn module_replace_outranks_root_provide() {
    let modules = [Module::new("overrides", vec![replace(|| "module".to_string())])];
    let composition =
        compose(&[provide(|| "root".to_string())], &modules).expect("should compose");
    let winner = composition.global.winner(&string_slot()).expect("winner");
    assert_eq!(winner.module.as_deref(), Some("overrides"));
}

#[test]
fn two_replacements_at_the_same_level_fail() {
    let modules = [Module::new("overrides", vec![replace(|| "module".to_string())])];
    let err = compose(&[replace(|| "root".to_string())], &modules).unwrap_err();
    assert!(matches!(err, SlotwireError::DuplicateReplace { .. }), "got: {err}");
}

#[test]
fn module_decorator_without_base_names_module() {
    let modules = [Module::new("users", vec![decorate(|n: u64| n + 1)])];
    let err = compose(&[], &modules).unwrap_err();
    assert_eq!(err.to_string(), "module users: cannot decorate slot u64: no provider");
}

// ── Decorators ───────────────────────────────────────────────────────

#[test]
fn decorator_without_base_fails() {
    let err = compose(&[decorate(|s: String| s + "!")], &[]).unwrap_err();
    assert!(matches!(err, SlotwireError::DecorateWithoutBase { .. }));
}

#[test]
fn decorator_with_group_output_is_rejected() {
    struct Tagged {
        tags: Vec<String>,
    }
    impl OutRecord for Tagged {
        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::grouped::<String>("tags").flatten()]
        }
        fn into_fields(self, out: &mut FieldWriter) {
            out.spread(self.tags);
        }
    }

    let dep = Dependency::decorate(Constructor::record(|| Tagged { tags: Vec::new() }));
    let err = compose(&[provide(|| "x".to_string()), dep], &[]).unwrap_err();
    assert!(err.to_string().contains("group outputs"), "got: {err}");
}

// ── Overrides ────────────────────────────────────────────────────────

#[test]
fn overrides_report_previous_and_next() {
    let overrides = detect_overrides(&[
        provide(|| "a".to_string()).with_key("cfg"),
        provide(|| 1_u8),
        replace(|| "b".to_string()).with_key("cfg-test"),
    ]);
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].key, "String");
    assert_eq!(overrides[0].previous.index, 0);
    assert_eq!(overrides[0].next.index, 2);
}

// ── Graphs ───────────────────────────────────────────────────────────

#[test]
fn graph_is_total_for_broken_inputs() {
    let graph = build_graph(&[
        Dependency::from_parts(Kind::Provide, None),
        provide(|| "a".to_string()),
        provide(|| "b".to_string()),
        Dependency::new(Constructor::new(|pool: In<Pool>| pool.primary.len())),
    ]);
    assert_eq!(graph.providers.len(), 4);
    assert!(graph.edges.iter().any(|e| e.missing));
    assert!(!graph.to_dot().is_empty());
}

#[test]
fn graph_links_record_consumers_to_record_producer() {
    let graph = build_graph(&[
        endpoints().with_key("endpoints"),
        Dependency::new(Constructor::new(|pool: In<Pool>| {
            pool.replicas.len() + pool.primary.len()
        }))
        .with_key("pool"),
    ]);
    assert!(graph.missing.is_empty());
    let targets: Vec<_> = graph.edges_from("key:pool#1").map(|e| e.to.as_str()).collect();
    assert_eq!(targets, vec!["key:endpoints#0", "key:endpoints#0"]);
}

#[test]
fn module_graphs_cover_root_and_every_module() {
    let modules = [
        Module::new("users", vec![provide(|| 1_u8).private()]),
        Module::new("billing", vec![provide(|| 2_u16)]),
    ];
    let graphs = graph_modules(&[provide(|| "root".to_string())], &modules);
    let names: Vec<_> = graphs.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["billing", "root", "users"]);
    assert_eq!(graphs["root"].providers.len(), 2);
    assert_eq!(graphs["users"].providers.len(), 3);
}
