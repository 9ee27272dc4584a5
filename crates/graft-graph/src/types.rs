//! Module graph data model.

use graft_analyzer::{AnalyzerValue, InjectSite, ModuleDefinition};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Instantiation lifetime of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Singleton,
    Request,
    Transient,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Request => "request",
            Self::Transient => "transient",
        }
    }

    /// Parse a declared scope. `request-context` is an alias of `request`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "singleton" => Some(Self::Singleton),
            "transient" => Some(Self::Transient),
            "request" | "request-context" => Some(Self::Request),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which modules besides the owner may resolve a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "modules", rename_all = "lowercase")]
pub enum Visibility {
    Module,
    All,
    /// Sorted, deduplicated module names.
    Allowlist(Vec<String>),
}

impl Visibility {
    pub fn allows(&self, owner: &str, consumer: &str) -> bool {
        owner == consumer
            || match self {
                Self::Module => false,
                Self::All => true,
                Self::Allowlist(names) => names.binary_search_by(|n| n.as_str().cmp(consumer)).is_ok(),
            }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => f.write_str("module"),
            Self::All => f.write_str("all"),
            Self::Allowlist(names) => write!(f, "allowlist [{}]", names.join(", ")),
        }
    }
}

/// Where generated code imports a symbol from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRef {
    /// Absolute file path or bare package specifier.
    pub source: String,
    /// Exported name; `None` when the binding is not exported.
    pub export_name: Option<String>,
}

/// How a constructor argument is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorParam {
    /// `@Inject(token)` or the parameter's type name; `None` for primitives
    /// and untyped parameters, which are passed `undefined`.
    pub token: Option<String>,
    pub optional: bool,
    pub kind: DependencyKind,
}

/// A constructible class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTarget {
    pub name: String,
    /// Declaring file when the class was analyzed.
    pub file: Option<PathBuf>,
    pub import: ImportRef,
    /// Effective constructor, inherited from the nearest ancestor declaring
    /// one when the class has none.
    pub params: Vec<ConstructorParam>,
    /// `inject()` calls in the class body (field initializers, methods).
    pub inject_sites: Vec<InjectSite>,
}

impl ClassTarget {
    /// Constructor and `inject()` dependencies, sorted and deduplicated.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let params = self.params.iter().filter_map(|param| {
            param.token.as_ref().map(|token| Dependency {
                token: token.clone(),
                kind: param.kind,
                optional: param.optional,
            })
        });
        let sites = self.inject_sites.iter().filter_map(|site| {
            site.token.as_ref().map(|token| Dependency {
                token: token.clone(),
                kind: DependencyKind::InjectSite,
                optional: false,
            })
        });
        params.chain(sites).collect::<BTreeSet<_>>().into_iter().collect()
    }
}

/// `useFactory` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryProvider {
    /// A `FactoryCapture`, or a reference to a function defined elsewhere.
    pub factory: AnalyzerValue,
    /// `inject: [...]` tokens, passed positionally.
    pub inject: Vec<String>,
    /// File the factory was written in.
    pub file: PathBuf,
}

/// Resolution strategy of a provider; selected in the order
/// value, class, alias, factory, bare class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProviderStrategy {
    Value { value: AnalyzerValue, file: PathBuf },
    UseClass { classes: Vec<ClassTarget> },
    Existing { token: String },
    Factory(FactoryProvider),
    Constructor { class: ClassTarget },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    /// `@Inject(token)` on a constructor parameter
    InjectDecorator,
    /// Constructor parameter type reference
    ParamType,
    /// `useFactory` inject list or an `inject()` inside the factory
    FactoryInject,
    /// `useExisting` target
    Existing,
    /// `inject()` call inside a class body
    InjectSite,
}

/// Edge from a provider to the token it needs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub token: String,
    pub kind: DependencyKind,
    pub optional: bool,
}

/// A provider registered in a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRef {
    pub token: String,
    pub strategy: ProviderStrategy,
    pub visibility: Visibility,
    pub scope: Scope,
    /// File that declares the provider (class file or definition file).
    pub file: PathBuf,
    /// Declared in `providers[]` rather than only by decorator.
    pub explicit: bool,
    /// Record as written in `providers[]`, when explicit.
    pub record: Option<AnalyzerValue>,
}

impl ProviderRef {
    /// Dependencies sorted and deduplicated.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = BTreeSet::new();
        match &self.strategy {
            ProviderStrategy::Value { .. } => {}
            ProviderStrategy::UseClass { classes } => {
                for class in classes {
                    deps.extend(class.dependencies());
                }
            }
            ProviderStrategy::Constructor { class } => deps.extend(class.dependencies()),
            ProviderStrategy::Existing { token } => {
                deps.insert(Dependency {
                    token: token.clone(),
                    kind: DependencyKind::Existing,
                    optional: false,
                });
            }
            ProviderStrategy::Factory(factory) => {
                let nested = match &factory.factory {
                    AnalyzerValue::FactoryCapture(capture) => capture
                        .inject_sites
                        .iter()
                        .filter_map(|s| s.site.token.clone())
                        .collect(),
                    _ => Vec::new(),
                };
                for token in factory.inject.iter().cloned().chain(nested) {
                    deps.insert(Dependency {
                        token,
                        kind: DependencyKind::FactoryInject,
                        optional: false,
                    });
                }
            }
        }
        deps.into_iter().collect()
    }

    /// Constructible classes behind this provider.
    pub fn classes(&self) -> Vec<&ClassTarget> {
        match &self.strategy {
            ProviderStrategy::UseClass { classes } => classes.iter().collect(),
            ProviderStrategy::Constructor { class } => vec![class],
            _ => Vec::new(),
        }
    }
}

/// `inject()` call recorded against the module that owns its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDependency {
    pub file: PathBuf,
    pub token: String,
    pub enclosing_class: Option<String>,
}

/// One module: a marker file plus every file it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNode {
    /// Marker file path; the module's identity.
    pub id: PathBuf,
    pub name: String,
    pub root_dir: PathBuf,
    /// Owned files, sorted.
    pub files: Vec<PathBuf>,
    pub providers: BTreeMap<String, ProviderRef>,
    /// Controller class name -> class target.
    pub controllers: BTreeMap<String, ClassTarget>,
    /// `...spread` entries of `providers[]`, resolved only at runtime.
    pub dynamic_providers: Vec<AnalyzerValue>,
    pub raw_dependencies: Vec<RawDependency>,
    pub definition: ModuleDefinition,
}

impl ModuleNode {
    /// `<Module>::<token>`, the DI node id used in generated output.
    pub fn node_id(&self, token: &str) -> String {
        node_id(&self.name, token)
    }
}

pub fn node_id(module: &str, token: &str) -> String {
    format!("{module}::{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_aliases() {
        assert_eq!(Scope::parse("request-context"), Some(Scope::Request));
        assert_eq!(Scope::parse("transient"), Some(Scope::Transient));
        assert_eq!(Scope::parse("session"), None);
    }

    #[test]
    fn test_visibility_allows() {
        let allow = Visibility::Allowlist(vec!["billing".into(), "orders".into()]);
        assert!(allow.allows("users", "orders"));
        assert!(!allow.allows("users", "admin"));
        assert!(allow.allows("users", "users"));
        assert!(!Visibility::Module.allows("users", "orders"));
        assert!(Visibility::All.allows("users", "orders"));
    }
}
