//! Per-file analysis results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::value::AnalyzerValue;

/// Byte range in the analyzed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
}

impl SourceSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl From<oxc_span::Span> for SourceSpan {
    fn from(span: oxc_span::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

/// Everything statically known about one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub classes: Vec<ClassMetadata>,
    /// Names of interfaces declared in this file.
    pub interfaces: Vec<String>,
    pub imports: Vec<ImportEdge>,
    pub re_exports: Vec<ReExport>,
    /// Exported name -> local binding name.
    pub exports: BTreeMap<String, String>,
    /// Top-level `const` initializers by local name.
    pub locals: BTreeMap<String, AnalyzerValue>,
    pub module_definitions: Vec<ModuleDefinitionSite>,
    pub inject_sites: Vec<InjectSite>,
}

impl FileAnalysis {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            classes: Vec::new(),
            interfaces: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            exports: BTreeMap::new(),
            locals: BTreeMap::new(),
            module_definitions: Vec::new(),
            inject_sites: Vec::new(),
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Import edge and binding that introduced `local`, if any.
    pub fn import_of(&self, local: &str) -> Option<(&ImportEdge, &ImportBinding)> {
        self.imports.iter().find_map(|edge| {
            edge.bindings
                .iter()
                .find(|b| b.local == local)
                .map(|b| (edge, b))
        })
    }

    /// Local binding name behind an exported name.
    pub fn local_for_export(&self, exported: &str) -> Option<&str> {
        self.exports.get(exported).map(String::as_str)
    }

    /// Every resolved dependency path, relative imports and re-exports only.
    pub fn local_dependencies(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .filter(|i| i.is_relative)
            .map(|i| i.resolved.as_str())
            .chain(
                self.re_exports
                    .iter()
                    .filter(|r| r.is_relative)
                    .map(|r| r.resolved.as_str()),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEdge {
    pub source: String,
    pub resolved: String,
    pub is_relative: bool,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

impl ImportedName {
    /// Exported name on the source module; `None` for namespace imports.
    pub fn export_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Default => Some("default"),
            Self::Namespace => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReExport {
    pub source: String,
    pub resolved: String,
    pub is_relative: bool,
    pub kind: ReExportKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReExportKind {
    /// `export * from '...'`
    Wildcard,
    /// `export * as ns from '...'`
    Namespace { exported: String },
    /// `export { imported as exported } from '...'`
    Named { imported: String, exported: String },
}

/// How an `inject()` argument was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectKind {
    /// `inject(Token)`
    Token,
    /// `inject(() => Token)`
    Thunk,
    /// Anything not reducible to an identifier.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectSite {
    pub kind: InjectKind,
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub span: SourceSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_class: Option<String>,
}

impl InjectSite {
    pub fn is_valid(&self) -> bool {
        self.kind != InjectKind::Invalid && self.token.is_some()
    }
}

/// A `defineModule(...)` call or top-level `module` binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinitionSite {
    /// Local binding holding the definition; `None` for `export default` or
    /// an unbound call.
    pub local: Option<String>,
    /// Every exported alias of `local`, sorted.
    pub exported_as: Vec<String>,
    /// Canonical export name (lexicographically smallest alias).
    pub export_name: Option<String>,
    pub definition: ModuleDefinition,
    pub span: SourceSpan,
}

impl ModuleDefinitionSite {
    pub fn is_exported(&self) -> bool {
        self.export_name.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    pub name: Option<String>,
    pub name_declared: bool,
    pub providers: Vec<AnalyzerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapters: Option<AnalyzerValue>,
    /// Whole argument as written.
    pub raw: AnalyzerValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetadata {
    pub name: String,
    pub span: SourceSpan,
    pub is_abstract: bool,
    pub heritage: Heritage,
    pub decorators: Vec<DecoratorMetadata>,
    /// `None` when the class declares no constructor.
    pub constructor: Option<Vec<ParameterMetadata>>,
    pub methods: Vec<MethodMetadata>,
    pub properties: Vec<PropertyMetadata>,
    pub configure: ConfigureMetadata,
}

impl ClassMetadata {
    pub fn decorator(&self, name: &str) -> Option<&DecoratorMetadata> {
        self.decorators.iter().find(|d| d.name == name)
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorator(name).is_some()
    }

    pub fn constructor_params(&self) -> &[ParameterMetadata] {
        self.constructor.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heritage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<HeritageClause>,
    pub implements: Vec<HeritageClause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeritageClause {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub type_arguments: Vec<TypeArgument>,
}

impl HeritageClause {
    /// `Partial`, `Pick`, `Omit` or `Required` wrapping another type.
    pub fn is_mapped_helper(&self) -> bool {
        matches!(self.name.as_str(), "Partial" | "Pick" | "Omit" | "Required")
            && !self.type_arguments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeArgument {
    Reference {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        import_source: Option<String>,
        type_arguments: Vec<TypeArgument>,
    },
    Literal { value: String },
    Union { members: Vec<TypeArgument> },
    Other { text: String },
}

impl TypeArgument {
    /// String literal members of a literal or union of literals.
    pub fn literal_keys(&self) -> Vec<String> {
        match self {
            Self::Literal { value } => vec![value.clone()],
            Self::Union { members } => members.iter().flat_map(|m| m.literal_keys()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Type annotation reduced to a token-able name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    /// Identifier of a type reference, e.g. `UserRepository`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    /// Annotation as written.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorMetadata {
    /// Imported name when the decorator was imported under an alias.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub is_call: bool,
    pub args: Vec<AnalyzerValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    pub decorators: Vec<DecoratorMetadata>,
    pub optional: bool,
    /// Declared as a parameter property (`private readonly repo: Repo`).
    pub is_property: bool,
}

impl ParameterMetadata {
    pub fn decorator(&self, name: &str) -> Option<&DecoratorMetadata> {
        self.decorators.iter().find(|d| d.name == name)
    }

    /// DI token: `@Inject(token)` first, then the type reference name.
    pub fn token(&self) -> Option<&str> {
        if let Some(inject) = self.decorator("Inject") {
            return inject.args.first().and_then(|a| a.token_name());
        }
        self.type_ref.as_ref().and_then(|t| t.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    pub name: String,
    pub computed: bool,
    pub is_static: bool,
    pub decorators: Vec<DecoratorMetadata>,
    pub params: Vec<ParameterMetadata>,
}

impl MethodMetadata {
    pub fn decorator(&self, name: &str) -> Option<&DecoratorMetadata> {
        self.decorators.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetadata {
    pub name: String,
    pub is_static: bool,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    pub decorators: Vec<DecoratorMetadata>,
}

/// Middleware and error-filter registrations found in `configure()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureMetadata {
    pub middlewares: Vec<MiddlewareRegistration>,
    pub error_filters: Vec<MiddlewareRef>,
}

impl ConfigureMetadata {
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty() && self.error_filters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareRegistration {
    pub lifecycle: String,
    pub refs: Vec<MiddlewareRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<AnalyzerValue>,
}
