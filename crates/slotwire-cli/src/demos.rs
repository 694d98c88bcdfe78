//! Bundled demo compositions.
//!
//! Each demo assembles a small container that exercises one part of the
//! resolution model:
//! - `basic`: a named provider consumed through an input record
//! - `records`: output records, flattened groups, interface matching and
//!   an explicit replacement
//! - `modules`: a private module provider behind an exported one

use std::sync::Arc;

use clap::ValueEnum;
use slotwire_sdk::{
    Constructor, Container, ContainerBuilder, Dependency, FieldDescriptor, FieldReader,
    FieldWriter, In, InRecord, Interface, Matching, Module, OutRecord, Result, SlotwireConfig,
    provide, replace,
};

/// A bundled demo composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Named provider consumed through an input record.
    Basic,
    /// Output records, groups, matchings and a replacement.
    Records,
    /// Private module values behind an exported provider.
    Modules,
}

impl Demo {
    /// Demo name as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Records => "records",
            Self::Modules => "modules",
        }
    }

    /// Assembles the demo container.
    ///
    /// # Errors
    ///
    /// Returns an error if the declarations fail to resolve.
    pub fn container(self, config: SlotwireConfig) -> Result<Container> {
        let builder = ContainerBuilder::new().config(config);
        let container = match self {
            Self::Basic => basic(builder),
            Self::Records => records(builder),
            Self::Modules => modules(builder),
        }?;
        tracing::info!(demo = self.name(), "demo assembled");
        Ok(container)
    }

    /// Resolves what the demo produces and renders it as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be resolved.
    pub fn run(self, container: &mut Container) -> Result<String> {
        match self {
            Self::Basic => container.resolve::<String>(),
            Self::Records => container.invoke(|report: In<Report>| report.into_inner().render()),
            Self::Modules => {
                let length = container.invoke(|length: usize| length)?;
                let hidden = container.invoke(|secret: String| secret).is_err();
                let visibility = if hidden { "hidden" } else { "visible" };
                Ok(format!("{length} (secret {visibility} from root)"))
            }
        }
    }
}

// ── basic ────────────────────────────────────────────────────────────

struct Target(String);

impl InRecord for Target {
    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::named::<String>("target")]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self> {
        Ok(Self(fields.value()?))
    }
}

fn basic(builder: ContainerBuilder) -> Result<Container> {
    builder
        .dependency(
            provide(|| "world".to_string())
                .with_name("target")
                .with_key("target"),
        )
        .dependency(
            provide(|target: In<Target>| format!("hello {}", target.into_inner().0))
                .with_key("greeting"),
        )
        .build()
}

// ── records ──────────────────────────────────────────────────────────

trait Source: Send + Sync {
    fn read(&self) -> String;
}

#[derive(Clone)]
struct Buffer(String);

impl Source for Buffer {
    fn read(&self) -> String {
        self.0.clone()
    }
}

struct Listing {
    named: String,
    items: Vec<String>,
}

impl OutRecord for Listing {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::named::<String>("named"),
            FieldDescriptor::grouped::<String>("items").flatten(),
        ]
    }

    fn into_fields(self, out: &mut FieldWriter) {
        out.value(self.named);
        out.spread(self.items);
    }
}

struct Report {
    source: Arc<dyn Source>,
    env: String,
    named: String,
    items: Vec<String>,
}

impl Report {
    fn render(mut self) -> String {
        self.items.sort();
        format!(
            "[{}] {} {}:{}",
            self.env,
            self.source.read(),
            self.named,
            self.items.join(",")
        )
    }
}

impl InRecord for Report {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::value::<Arc<dyn Source>>(),
            FieldDescriptor::named::<String>("env"),
            FieldDescriptor::named::<String>("named"),
            FieldDescriptor::grouped::<String>("items"),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            source: fields.value()?,
            env: fields.value()?,
            named: fields.value()?,
            items: fields.group()?,
        })
    }
}

fn records(builder: ContainerBuilder) -> Result<Container> {
    let source = Interface::new::<Buffer, Arc<dyn Source>>(|buffer| {
        Arc::new(buffer) as Arc<dyn Source>
    });
    builder
        .matchings([Matching::new::<Buffer>(vec![source])])
        .dependency(provide(|| Buffer("ok".into())).with_key("buffer"))
        .dependency(
            Dependency::new(Constructor::record(|| Listing {
                named: "hello".into(),
                items: vec!["b".into(), "a".into()],
            }))
            .with_key("listing"),
        )
        .dependency(provide(|| "c".to_string()).with_group("items").with_key("extra-item"))
        .dependency(provide(|| "staging".to_string()).with_name("env").with_key("env"))
        .dependency(replace(|| "demo".to_string()).with_name("env").with_key("env-demo"))
        .build()
}

// ── modules ──────────────────────────────────────────────────────────

fn modules(builder: ContainerBuilder) -> Result<Container> {
    builder
        .module(Module::new(
            "users",
            vec![
                provide(|| "secret".to_string()).private().with_key("secret"),
                provide(|secret: String| secret.len()).with_key("secret-length"),
            ],
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(demo: Demo) -> String {
        let mut container = demo
            .container(SlotwireConfig::default())
            .expect("demo should assemble");
        container.validate().expect("demo should validate");
        demo.run(&mut container).expect("demo should run")
    }

    #[test]
    fn basic_greets_named_target() {
        assert_eq!(run(Demo::Basic), "hello world");
    }

    #[test]
    fn records_merge_record_and_group_contributions() {
        assert_eq!(run(Demo::Records), "[demo] ok hello:a,b,c");
    }

    #[test]
    fn modules_hide_private_secret() {
        assert_eq!(run(Demo::Modules), "6 (secret hidden from root)");
    }

    #[test]
    fn records_report_one_override() {
        let container = Demo::Records
            .container(SlotwireConfig::default())
            .expect("should assemble");
        let overrides = container.overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].next.name.as_deref(), Some("env"));
    }

    #[test]
    fn modules_graph_shows_private_provider_only_in_module() {
        let container = Demo::Modules
            .container(SlotwireConfig::default())
            .expect("should assemble");
        let graphs = container.graph_modules();
        assert_eq!(graphs["root"].providers.len(), 1);
        assert_eq!(graphs["users"].providers.len(), 2);
    }
}
